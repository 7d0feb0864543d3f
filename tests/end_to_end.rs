use std::fs;

use chrono::NaiveDate;
use matchviz::charts::ChartRenderer;
use matchviz::diagram::{DiagramRenderer, box_size, route_all};
use matchviz::fonts::TextMeasure;
use matchviz::output::{ER_DIAGRAM, MATCH_RATE_CHART, MONTHLY_TREND_CHART, OutputTargets};
use matchviz::schema::{AnchorSide, Cardinality, Entity, Field, Point, Relationship, Schema};
use matchviz::stats::{SnapshotFile, StatsSource, Summary, YearMonth, summarize};
use matchviz::theme::Theme;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Font-independent measurement so layouts do not depend on the host.
struct Monospace;

impl TextMeasure for Monospace {
    fn measure_text(&mut self, text: &str, font_size: f32, _: bool, _: bool) -> (f32, f32) {
        (text.chars().count() as f32 * font_size * 0.6, font_size * 1.2)
    }
}

fn generated_at() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 30)
        .unwrap()
        .and_hms_opt(18, 0, 0)
        .unwrap()
}

fn entity(name: &str, fields: &[&str], x: f32, y: f32) -> Entity {
    Entity {
        name: name.to_string(),
        fields: fields.iter().map(|f| Field::parse(f).unwrap()).collect(),
        position: Point::new(x, y),
        color: "#FFFFFF".to_string(),
        description: String::new(),
    }
}

#[test]
fn users_to_matches_connector_starts_on_users_right_edge() {
    let schema = Schema::new(
        vec![
            entity("users", &["id (PK)", "email (UNIQUE)", "name"], 0.0, 0.0),
            entity("matches", &["id (PK)", "user_id (FK)"], 5.0, 0.0),
        ],
        vec![Relationship::new(
            "users",
            AnchorSide::Right,
            "matches",
            AnchorSide::Left,
            Cardinality::OneToMany,
        )],
    );
    schema.validate().unwrap();

    let routes = route_all(&schema).unwrap();
    assert_eq!(routes[0].start().x, box_size(&schema.entities[0]).width);

    let theme = Theme::default();
    let mut measure = Monospace;
    let canvas = DiagramRenderer::new(&theme, &mut measure)
        .render(&schema, generated_at())
        .unwrap();
    let png = canvas.to_png(1.0).unwrap();
    assert!(png.starts_with(PNG_SIGNATURE));
}

#[test]
fn builtin_diagram_is_written_to_both_destinations() {
    let dir = tempfile::tempdir().unwrap();
    let schema = Schema::builtin().unwrap();
    let theme = Theme::default();
    let mut measure = Monospace;

    let png = DiagramRenderer::new(&theme, &mut measure)
        .render(&schema, generated_at())
        .unwrap()
        .to_png(1.0)
        .unwrap();
    let [assets, public] = OutputTargets::under_root(dir.path())
        .write_image(ER_DIAGRAM, &png)
        .unwrap();

    assert!(assets.ends_with("app/assets/images/er_diagram.png"));
    assert!(public.ends_with("public/er_diagram.png"));
    let a = fs::read(&assets).unwrap();
    let b = fs::read(&public).unwrap();
    assert!(a.starts_with(PNG_SIGNATURE));
    assert_eq!(a, b);
}

#[test]
fn stats_run_writes_charts_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("snapshot.json");
    fs::write(
        &snapshot_path,
        r#"{
            "total_users": 8,
            "matched_users": 3,
            "total_matches": 4,
            "active_deals": 2,
            "completed_deals": 1,
            "monthly_matches": [{"month": "2024-03", "count": 5}]
        }"#,
    )
    .unwrap();

    let snapshot = SnapshotFile::new(&snapshot_path).fetch().unwrap();
    let stats = summarize(
        snapshot.counts,
        &snapshot.monthly,
        "2024-06".parse::<YearMonth>().unwrap(),
    );
    assert_eq!(stats.monthly.len(), 6);

    let theme = Theme::from_builtin("slate").unwrap();
    let mut measure = Monospace;
    let mut charts = ChartRenderer::new(&theme, &mut measure);
    let pie = charts.render_proportion(&stats).to_png(1.0).unwrap();
    let trend = charts.render_trend(&stats).to_png(1.0).unwrap();

    let targets = OutputTargets::under_root(dir.path());
    targets.write_image(MATCH_RATE_CHART, &pie).unwrap();
    targets.write_image(MONTHLY_TREND_CHART, &trend).unwrap();
    let summary_path = targets
        .write_summary(&Summary::new(&stats, generated_at()))
        .unwrap();

    for name in [MATCH_RATE_CHART, MONTHLY_TREND_CHART] {
        for path in targets.image_paths(name) {
            assert!(fs::read(&path).unwrap().starts_with(PNG_SIGNATURE));
        }
    }

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(summary_path).unwrap()).unwrap();
    assert_eq!(json["total_users"], 8);
    assert_eq!(json["match_rate"], 37.5);
    assert_eq!(json["total_matches"], 4);
    assert_eq!(json["success_rate"], 33.3);
    assert_eq!(json["generated_at"], "2024-06-30T18:00:00");
}
