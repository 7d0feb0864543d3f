//! Places and draws a compiled schema.
//!
//! Rendering runs in two passes. [`DiagramRenderer::layout`] routes every
//! relationship, measures labels and footer blocks, and fixes the viewport;
//! [`DiagramRenderer::render`] then paints in a fixed order: background,
//! title block, entities, connectors, legend, overview, timestamp.

use chrono::NaiveDateTime;
use tracing::info;

use super::geometry::{BoxBounds, ROW_HEIGHT};
use super::router::{Route, connector_stroke, route_all};
use crate::canvas::{Canvas, Paint, TextAnchor, TextStyle, VAlign, Viewport};
use crate::error::RouteError;
use crate::fonts::TextMeasure;
use crate::schema::{Cardinality, Entity, FieldTag, Point, Schema};
use crate::theme::{Palette, StrokeStyle, Theme};

pub const MARGIN: f32 = 0.5;
pub const TITLE_BAND: f32 = 1.2;

const BOX_PAD: f32 = 0.03;
const BOX_STROKE: f32 = 1.5;
const NAME_DROP: f32 = 0.15;
const DESCRIPTION_DROP: f32 = 0.35;
const SEPARATOR_DROP: f32 = 0.5;
const SEPARATOR_INSET: f32 = 0.1;
const FIELD_DROP: f32 = 0.75;
const FIELD_INSET: f32 = 0.1;

const TITLE_DROP: f32 = 0.35;
const SUBTITLE_DROP: f32 = 0.75;

/// Label background padding, in multiples of the label font size.
const LABEL_PAD: f32 = 0.2;
const LABEL_OPACITY: f32 = 0.9;

const FOOTER_GAP: f32 = 0.4;
const BLOCK_PAD: f32 = 0.15;
const BLOCK_SPACING: f32 = 0.5;
const LEGEND_ROW: f32 = 0.25;
const SWATCH: f32 = 0.15;
const SWATCH_GAP: f32 = 0.1;
const OVERVIEW_OPACITY: f32 = 0.8;
const TIMESTAMP_GAP: f32 = 0.2;

const LEGEND_TITLE: &str = "Legend";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A rectangular block anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Block {
    pub fn lower_left(&self) -> Point {
        Point::new(self.left, self.top - self.height)
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top - self.height
    }
}

/// Background box of a connector label, centered on the route's label anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelBox {
    pub center: Point,
    pub width: f32,
    pub height: f32,
}

impl LabelBox {
    pub fn lower_left(&self) -> Point {
        self.center.offset(-self.width / 2.0, -self.height / 2.0)
    }

    pub fn upper_right(&self) -> Point {
        self.center.offset(self.width / 2.0, self.height / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramLayout {
    pub viewport: Viewport,
    /// One per relationship, in declaration order.
    pub routes: Vec<Route>,
    pub labels: Vec<LabelBox>,
    pub title_at: Point,
    pub subtitle_at: Point,
    pub legend: Block,
    pub overview: Option<Block>,
    pub timestamp_at: Point,
}

#[derive(Debug, Clone, Copy)]
struct Extent {
    min: Point,
    max: Point,
}

impl Extent {
    fn empty() -> Self {
        Self {
            min: Point::new(f32::INFINITY, f32::INFINITY),
            max: Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    fn include(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    fn or_origin(self) -> Self {
        if self.min.x > self.max.x {
            Self {
                min: Point::default(),
                max: Point::default(),
            }
        } else {
            self
        }
    }
}

enum Swatch<'t> {
    Fill(&'t str),
    Line(&'t StrokeStyle),
}

fn legend_entries(theme: &Theme) -> [(Swatch<'_>, &'static str); 5] {
    let palette = &theme.palette;
    [
        (Swatch::Fill(&palette.primary_key), "Primary key (PK)"),
        (Swatch::Fill(&palette.foreign_key), "Foreign key (FK)"),
        (Swatch::Fill(&palette.unique), "Unique constraint"),
        (
            Swatch::Line(connector_stroke(theme, Cardinality::OneToOne)),
            "1:1 relationship",
        ),
        (
            Swatch::Line(connector_stroke(theme, Cardinality::OneToMany)),
            "1:N relationship",
        ),
    ]
}

fn tag_color(palette: &Palette, tag: FieldTag) -> &str {
    match tag {
        FieldTag::PrimaryKey => &palette.primary_key,
        FieldTag::ForeignKey => &palette.foreign_key,
        FieldTag::Unique => &palette.unique,
    }
}

pub struct DiagramRenderer<'a, T: TextMeasure> {
    theme: &'a Theme,
    measure: &'a mut T,
}

impl<'a, T: TextMeasure> DiagramRenderer<'a, T> {
    pub fn new(theme: &'a Theme, measure: &'a mut T) -> Self {
        Self { theme, measure }
    }

    /// Measured extent of a text block, in canvas units.
    fn text_units(&mut self, text: &str, size_pt: f32, bold: bool) -> (f32, f32) {
        self.measure.measure_units(text, size_pt, bold, self.theme.unit_px)
    }

    fn label_box(&mut self, route: &Route, text: &str) -> LabelBox {
        let size = self.theme.typography.label_size;
        let (w, h) = self.text_units(text, size, true);
        let pad = LABEL_PAD * size / 72.0;
        LabelBox {
            center: route.label_anchor,
            width: w + 2.0 * pad,
            height: h + 2.0 * pad,
        }
    }

    fn legend_size(&mut self) -> (f32, f32) {
        let typo = &self.theme.typography;
        let (title_size, body_size) = (typo.legend_title_size, typo.body_size);
        let (title_w, title_h) = self.text_units(LEGEND_TITLE, title_size, true);
        let theme = self.theme;
        let entries = legend_entries(theme);
        let mut widest: f32 = 0.0;
        for (_, text) in &entries {
            widest = widest.max(self.text_units(text, body_size, false).0);
        }
        let width = title_w.max(SWATCH + SWATCH_GAP + widest) + 2.0 * BLOCK_PAD;
        let height = title_h + entries.len() as f32 * LEGEND_ROW + 2.0 * BLOCK_PAD;
        (width, height)
    }

    pub fn layout(&mut self, schema: &Schema) -> Result<DiagramLayout, RouteError> {
        let routes = route_all(schema)?;

        let mut extent = Extent::empty();
        for entity in &schema.entities {
            let b = BoxBounds::of(entity);
            extent.include(Point::new(b.x - BOX_PAD, b.y - BOX_PAD));
            extent.include(Point::new(b.right() + BOX_PAD, b.top() + BOX_PAD));
        }

        let mut labels = Vec::with_capacity(routes.len());
        for (rel, route) in schema.relationships.iter().zip(&routes) {
            for p in &route.points {
                extent.include(*p);
            }
            let label = self.label_box(route, &rel.label);
            extent.include(label.lower_left());
            extent.include(label.upper_right());
            labels.push(label);
        }
        let extent = extent.or_origin();

        let typo = &self.theme.typography;
        let (title_size, subtitle_size) = (typo.title_size, typo.subtitle_size);
        let (body_size, label_size) = (typo.body_size, typo.label_size);

        let (legend_w, legend_h) = self.legend_size();
        let overview_size = match schema.overview.as_deref() {
            Some(text) if !text.trim().is_empty() => {
                let (w, h) = self.text_units(text, body_size, false);
                Some((w + 2.0 * BLOCK_PAD, h + 2.0 * BLOCK_PAD))
            }
            _ => None,
        };
        let (_, stamp_h) = self.text_units("Generated: 0000-00-00 00:00:00", label_size, false);
        let title_w = self
            .text_units(&schema.title, title_size, true)
            .0
            .max(self.text_units(&schema.subtitle, subtitle_size, false).0);

        let footer_w = match overview_size {
            Some((w, _)) => w + BLOCK_SPACING + legend_w,
            None => legend_w,
        };
        let mut left = extent.min.x;
        let mut right = extent.max.x.max(left + footer_w);
        if title_w > right - left {
            let extra = (title_w - (right - left)) / 2.0;
            left -= extra;
            right += extra;
        }

        let footer_top = extent.min.y - FOOTER_GAP;
        let overview_h = overview_size.map_or(0.0, |(_, h)| h);
        let footer_bottom = footer_top - legend_h.max(overview_h) - TIMESTAMP_GAP - stamp_h;
        let top = extent.max.y + TITLE_BAND;
        let center_x = (left + right) / 2.0;

        let viewport = Viewport::new(
            Point::new(left - MARGIN, footer_bottom - MARGIN),
            Point::new(right + MARGIN, top + MARGIN),
            self.theme.unit_px,
        );

        Ok(DiagramLayout {
            viewport,
            routes,
            labels,
            title_at: Point::new(center_x, top - TITLE_DROP),
            subtitle_at: Point::new(center_x, top - SUBTITLE_DROP),
            legend: Block {
                left: right - legend_w,
                top: footer_top,
                width: legend_w,
                height: legend_h,
            },
            overview: overview_size.map(|(width, height)| Block {
                left,
                top: footer_top,
                width,
                height,
            }),
            timestamp_at: Point::new(right, footer_bottom),
        })
    }

    pub fn render(
        &mut self,
        schema: &Schema,
        generated_at: NaiveDateTime,
    ) -> Result<Canvas, RouteError> {
        let layout = self.layout(schema)?;
        let theme = self.theme;
        let palette = &theme.palette;
        let typo = &theme.typography;

        let mut canvas = Canvas::new(layout.viewport, &palette.background, &typo.font_family);

        if !schema.title.is_empty() {
            canvas.text(
                layout.title_at,
                &schema.title,
                &TextStyle::new(typo.title_size, &palette.text).bold(),
            );
        }
        if !schema.subtitle.is_empty() {
            canvas.text(
                layout.subtitle_at,
                &schema.subtitle,
                &TextStyle::new(typo.subtitle_size, &palette.muted_text),
            );
        }

        for entity in &schema.entities {
            draw_entity(&mut canvas, theme, entity);
        }

        for ((rel, route), label) in schema
            .relationships
            .iter()
            .zip(&layout.routes)
            .zip(&layout.labels)
        {
            let stroke = connector_stroke(theme, rel.cardinality);
            canvas.polyline(&route.points, Paint::stroke(&stroke.color, stroke.width));
            canvas.rect(
                label.lower_left(),
                label.width,
                label.height,
                LABEL_PAD * typo.label_size / 72.0,
                Paint::fill(&palette.label_background)
                    .with_stroke(&palette.label_border, 1.0)
                    .with_opacity(LABEL_OPACITY),
            );
            canvas.text(
                label.center,
                &rel.label,
                &TextStyle::new(typo.label_size, &palette.text).bold(),
            );
        }

        draw_legend(&mut canvas, theme, &layout.legend);

        if let (Some(block), Some(text)) = (layout.overview, schema.overview.as_deref()) {
            canvas.rect(
                block.lower_left(),
                block.width,
                block.height,
                BLOCK_PAD,
                Paint::fill(&palette.panel_background).with_opacity(OVERVIEW_OPACITY),
            );
            canvas.text(
                Point::new(block.left + BLOCK_PAD, block.top - BLOCK_PAD),
                text,
                &TextStyle::new(typo.body_size, &palette.text)
                    .anchor(TextAnchor::Start)
                    .valign(VAlign::Top),
            );
        }

        canvas.text(
            layout.timestamp_at,
            &format!("Generated: {}", generated_at.format(TIMESTAMP_FORMAT)),
            &TextStyle::new(typo.label_size, &palette.muted_text)
                .anchor(TextAnchor::End)
                .valign(VAlign::Bottom),
        );

        info!(
            entities = schema.entities.len(),
            relationships = schema.relationships.len(),
            width = layout.viewport.width_px(),
            height = layout.viewport.height_px(),
            "rendered ER diagram"
        );
        Ok(canvas)
    }
}

fn draw_entity(canvas: &mut Canvas, theme: &Theme, entity: &Entity) {
    let palette = &theme.palette;
    let typo = &theme.typography;
    let b = BoxBounds::of(entity);
    let center_x = b.x + b.width / 2.0;
    let top = b.top();

    canvas.rect(
        Point::new(b.x - BOX_PAD, b.y - BOX_PAD),
        b.width + 2.0 * BOX_PAD,
        b.height + 2.0 * BOX_PAD,
        BOX_PAD,
        Paint::fill(&entity.color).with_stroke(&palette.entity_border, BOX_STROKE),
    );

    canvas.text(
        Point::new(center_x, top - NAME_DROP),
        &entity.name.to_uppercase(),
        &TextStyle::new(typo.entity_name_size, &palette.text).bold(),
    );

    if !entity.description.is_empty() {
        canvas.text(
            Point::new(center_x, top - DESCRIPTION_DROP),
            &format!("({})", entity.description),
            &TextStyle::new(typo.body_size, &palette.muted_text).italic(),
        );
    }

    canvas.polyline(
        &[
            Point::new(b.x + SEPARATOR_INSET, top - SEPARATOR_DROP),
            Point::new(b.right() - SEPARATOR_INSET, top - SEPARATOR_DROP),
        ],
        Paint::stroke(&palette.entity_border, 1.0),
    );

    for (i, field) in entity.fields.iter().enumerate() {
        let at = Point::new(b.x + FIELD_INSET, top - FIELD_DROP - i as f32 * ROW_HEIGHT);
        let style = match field.tag {
            Some(tag) => TextStyle::new(typo.body_size, tag_color(palette, tag)).bold(),
            None => TextStyle::new(typo.body_size, &palette.text),
        };
        canvas.text(at, &field.label, &style.anchor(TextAnchor::Start));
    }
}

/// Center line of legend row `i`; rows stack down from under the title.
fn legend_row_y(block: &Block, rows: usize, i: usize) -> f32 {
    block.bottom() + BLOCK_PAD + LEGEND_ROW * ((rows - i) as f32 - 0.5)
}

fn draw_legend(canvas: &mut Canvas, theme: &Theme, block: &Block) {
    let palette = &theme.palette;
    let typo = &theme.typography;

    canvas.rect(
        block.lower_left(),
        block.width,
        block.height,
        BLOCK_PAD / 2.0,
        Paint::fill(&palette.background).with_stroke(&palette.label_border, 1.0),
    );
    canvas.text(
        Point::new(block.left + block.width / 2.0, block.top - BLOCK_PAD),
        LEGEND_TITLE,
        &TextStyle::new(typo.legend_title_size, &palette.text)
            .bold()
            .valign(VAlign::Top),
    );

    let entries = legend_entries(theme);
    for (i, (swatch, text)) in entries.iter().enumerate() {
        let y = legend_row_y(block, entries.len(), i);
        let x = block.left + BLOCK_PAD;
        match swatch {
            Swatch::Fill(color) => canvas.rect(
                Point::new(x, y - SWATCH / 2.0),
                SWATCH,
                SWATCH,
                0.0,
                Paint::fill(color),
            ),
            Swatch::Line(stroke) => canvas.polyline(
                &[Point::new(x, y), Point::new(x + SWATCH, y)],
                Paint::stroke(&stroke.color, stroke.width),
            ),
        }
        canvas.text(
            Point::new(x + SWATCH + SWATCH_GAP, y),
            text,
            &TextStyle::new(typo.body_size, &palette.text).anchor(TextAnchor::Start),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::geometry::box_size;
    use crate::fonts::FixedAdvance;
    use crate::schema::{AnchorSide, Field, Relationship};
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 30, 5)
            .unwrap()
    }

    fn entity(name: &str, fields: &[&str], x: f32, y: f32, color: &str) -> Entity {
        Entity {
            name: name.to_string(),
            fields: fields.iter().map(|f| Field::parse(f).unwrap()).collect(),
            position: Point::new(x, y),
            color: color.to_string(),
            description: "Test table".to_string(),
        }
    }

    fn users_matches() -> Schema {
        let mut schema = Schema::new(
            vec![
                entity("users", &["id (PK)", "email (UNIQUE)", "name"], 0.0, 0.0, "#E3F2FD"),
                entity("matches", &["id (PK)", "user_id (FK)"], 5.0, 0.0, "#F3E5F5"),
            ],
            vec![Relationship::new(
                "users",
                AnchorSide::Right,
                "matches",
                AnchorSide::Left,
                Cardinality::OneToMany,
            )],
        );
        schema.title = "Test".to_string();
        schema.subtitle = "Entity Relationship Diagram".to_string();
        schema
    }

    fn position_of(canvas: &Canvas, needle: &str) -> usize {
        canvas
            .elements()
            .iter()
            .position(|el| el.contains(needle))
            .unwrap_or_else(|| panic!("no element containing {needle}"))
    }

    #[test]
    fn renders_connector_from_users_right_edge() {
        let schema = users_matches();
        let theme = Theme::default();
        let mut measure = FixedAdvance;
        let mut renderer = DiagramRenderer::new(&theme, &mut measure);

        let layout = renderer.layout(&schema).unwrap();
        assert_eq!(layout.routes[0].start().x, box_size(&schema.entities[0]).width);

        let canvas = renderer.render(&schema, at()).unwrap();
        assert!(canvas.to_svg().contains("USERS"));
    }

    #[test]
    fn viewport_covers_boxes_routes_and_labels() {
        let schema = users_matches();
        let theme = Theme::default();
        let mut measure = FixedAdvance;
        let layout = DiagramRenderer::new(&theme, &mut measure)
            .layout(&schema)
            .unwrap();
        let vp = layout.viewport;

        for e in &schema.entities {
            let b = BoxBounds::of(e);
            assert!(vp.contains(Point::new(b.x, b.y)));
            assert!(vp.contains(Point::new(b.right(), b.top())));
        }
        for label in &layout.labels {
            assert!(vp.contains(label.lower_left()));
            assert!(vp.contains(label.upper_right()));
        }
        assert!(vp.contains(layout.legend.lower_left()));
        assert!(vp.max_y - layout.title_at.y >= MARGIN);
        assert!(layout.timestamp_at.y - vp.min_y >= MARGIN - 1e-4);
    }

    #[test]
    fn footer_sits_below_the_lowest_entity() {
        let mut schema = users_matches();
        schema.overview = Some("Overview\nsecond line".to_string());
        let theme = Theme::default();
        let mut measure = FixedAdvance;
        let layout = DiagramRenderer::new(&theme, &mut measure)
            .layout(&schema)
            .unwrap();

        let overview = layout.overview.unwrap();
        assert!(overview.top < 0.0);
        assert!(layout.legend.top < 0.0);
        assert!(overview.right() <= layout.legend.left);
        assert!(layout.timestamp_at.y < overview.bottom());
    }

    #[test]
    fn entities_are_painted_before_connectors_and_legend() {
        let schema = users_matches();
        let theme = Theme::default();
        let mut measure = FixedAdvance;
        let canvas = DiagramRenderer::new(&theme, &mut measure)
            .render(&schema, at())
            .unwrap();

        let users_box = position_of(&canvas, r##"fill="#E3F2FD""##);
        let matches_box = position_of(&canvas, r##"fill="#F3E5F5""##);
        let connector = position_of(&canvas, r##"stroke="#666666" stroke-width="2.00""##);
        let label = position_of(&canvas, ">1:N</tspan>");
        let legend = position_of(&canvas, ">Legend</tspan>");
        let stamp = position_of(&canvas, "Generated: 2024-06-01 12:30:05");

        assert!(users_box < matches_box);
        assert!(matches_box < connector);
        assert!(connector < label);
        assert!(label < legend);
        assert!(legend < stamp);
        assert_eq!(stamp, canvas.elements().len() - 1);
    }

    #[test]
    fn tagged_fields_use_their_accent_colors() {
        let schema = users_matches();
        let theme = Theme::default();
        let mut measure = FixedAdvance;
        let svg = DiagramRenderer::new(&theme, &mut measure)
            .render(&schema, at())
            .unwrap()
            .to_svg();

        let pk = svg.lines().find(|l| l.contains(">id (PK)<")).unwrap();
        assert!(pk.contains(&theme.palette.primary_key));
        assert!(pk.contains(r#"font-weight="bold""#));
        let fk = svg.lines().find(|l| l.contains(">user_id (FK)<")).unwrap();
        assert!(fk.contains(&theme.palette.foreign_key));
        let plain = svg.lines().find(|l| l.contains(">name<")).unwrap();
        assert!(!plain.contains("font-weight"));
    }

    #[test]
    fn one_to_one_connector_uses_accent_stroke() {
        let mut schema = users_matches();
        schema.relationships[0] = Relationship::new(
            "users",
            AnchorSide::Right,
            "matches",
            AnchorSide::Left,
            Cardinality::OneToOne,
        );
        let theme = Theme::default();
        let mut measure = FixedAdvance;
        let canvas = DiagramRenderer::new(&theme, &mut measure)
            .render(&schema, at())
            .unwrap();
        let path = position_of(&canvas, "<path");
        let connector = canvas.elements()[path..]
            .iter()
            .find(|el| el.contains("#E91E63"))
            .unwrap();
        assert!(connector.starts_with("<path"));
    }

    #[test]
    fn dangling_relationship_fails_before_drawing() {
        let mut schema = users_matches();
        schema.relationships.push(Relationship::new(
            "users",
            AnchorSide::Right,
            "deals",
            AnchorSide::Left,
            Cardinality::OneToMany,
        ));
        let theme = Theme::default();
        let mut measure = FixedAdvance;
        let err = DiagramRenderer::new(&theme, &mut measure)
            .render(&schema, at())
            .unwrap_err();
        assert!(matches!(err, RouteError::DanglingRelationship { missing, .. } if missing == "deals"));
    }

    #[test]
    fn legend_rows_fill_the_legend_block() {
        let theme = Theme::default();
        let mut measure = FixedAdvance;
        let layout = DiagramRenderer::new(&theme, &mut measure)
            .layout(&users_matches())
            .unwrap();
        let block = layout.legend;
        let rows = legend_entries(&theme).len();

        let lowest = legend_row_y(&block, rows, rows - 1);
        assert!((lowest - LEGEND_ROW / 2.0 - (block.bottom() + BLOCK_PAD)).abs() < 1e-5);
        let highest = legend_row_y(&block, rows, 0);
        assert!(highest + LEGEND_ROW / 2.0 <= block.top - BLOCK_PAD + 1e-5);
        assert!((highest - lowest - (rows - 1) as f32 * LEGEND_ROW).abs() < 1e-5);
    }

    #[test]
    fn empty_schema_still_renders_footer() {
        let theme = Theme::default();
        let mut measure = FixedAdvance;
        let canvas = DiagramRenderer::new(&theme, &mut measure)
            .render(&Schema::default(), at())
            .unwrap();
        assert!(canvas.viewport().width_px() > 0.0);
        assert!(canvas.to_svg().contains("Legend"));
    }

    #[test]
    fn builtin_schema_renders() {
        let schema = Schema::builtin().unwrap();
        let theme = Theme::default();
        let mut measure = FixedAdvance;
        let canvas = DiagramRenderer::new(&theme, &mut measure)
            .render(&schema, at())
            .unwrap();
        let svg = canvas.to_svg();
        for name in ["USERS", "MATCHES", "CHAT_ROOMS", "MESSAGES", "DEALS"] {
            assert!(svg.contains(name), "missing {name}");
        }
    }
}
