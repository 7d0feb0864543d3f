use tracing::info;

use super::ChartRenderer;
use crate::canvas::{Canvas, Paint, TextAnchor, TextStyle, VAlign, Viewport};
use crate::fonts::TextMeasure;
use crate::schema::Point;
use crate::stats::Stats;

pub const MATCHED_LABEL: &str = "Matched";
pub const UNMATCHED_LABEL: &str = "Unmatched";
pub const NO_USERS_LABEL: &str = "no users";

const WIDTH: f32 = 8.0;
const HEIGHT: f32 = 6.0;
const CENTER: Point = Point::new(4.0, 2.9);
const RADIUS: f32 = 1.8;
const TITLE_Y: f32 = 5.45;

/// Degrees, counter-clockwise from the positive x axis.
const START_ANGLE: f32 = 90.0;
/// Outward shift of the matched slice, as a fraction of the radius.
const EXPLODE: f32 = 0.1;
const SHADOW_OFFSET: f32 = 0.04;
const SHADOW_OPACITY: f32 = 0.25;
const PERCENT_RADIUS: f32 = 0.6;
const NAME_RADIUS: f32 = 1.1;

const INFO_ORIGIN: Point = Point::new(0.15, 0.15);
const INFO_PAD: f32 = 0.12;
const INFO_OPACITY: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SliceKind {
    Matched,
    Unmatched,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slice {
    kind: SliceKind,
    fraction: f32,
    start: f32,
    end: f32,
    explode: f32,
}

impl Slice {
    fn mid_angle(&self) -> f32 {
        (self.start + self.end) / 2.0
    }

    /// Point at `radius` along the slice's bisector, from its (possibly shifted) apex.
    fn along(&self, radius: f32) -> Point {
        let rad = self.mid_angle().to_radians();
        let reach = self.explode * RADIUS + radius;
        CENTER.offset(reach * rad.cos(), reach * rad.sin())
    }

    fn apex(&self) -> Point {
        self.along(0.0)
    }

    fn label(&self) -> &'static str {
        match self.kind {
            SliceKind::Matched => MATCHED_LABEL,
            SliceKind::Unmatched => UNMATCHED_LABEL,
        }
    }
}

/// Non-empty slices, matched first, laid out counter-clockwise from 90 degrees.
fn slices(matched: u64, unmatched: u64) -> Vec<Slice> {
    let total = matched + unmatched;
    if total == 0 {
        return Vec::new();
    }

    let mut start = START_ANGLE;
    [
        (SliceKind::Matched, matched, EXPLODE),
        (SliceKind::Unmatched, unmatched, 0.0),
    ]
    .into_iter()
    .filter(|(_, value, _)| *value > 0)
    .map(|(kind, value, explode)| {
        let fraction = value as f32 / total as f32;
        let slice = Slice {
            kind,
            fraction,
            start,
            end: start + fraction * 360.0,
            explode,
        };
        start = slice.end;
        slice
    })
    .collect()
}

fn info_text(stats: &Stats) -> String {
    format!(
        "Match rate: {:.1}%\nTotal matches: {}\nActive deals: {}\nCompleted deals: {}\nSuccess rate: {:.1}%",
        stats.match_rate,
        stats.counts.total_matches,
        stats.counts.active_deals,
        stats.counts.completed_deals,
        stats.success_rate,
    )
}

impl<T: TextMeasure> ChartRenderer<'_, T> {
    /// Matched versus unmatched users, with an info box of the derived rates.
    pub fn render_proportion(&mut self, stats: &Stats) -> Canvas {
        let theme = self.theme;
        let palette = &theme.palette;
        let typo = &theme.typography;

        let viewport = Viewport::new(Point::new(0.0, 0.0), Point::new(WIDTH, HEIGHT), theme.unit_px);
        let mut canvas = Canvas::new(viewport, &palette.background, &typo.font_family);

        canvas.text(
            Point::new(WIDTH / 2.0, TITLE_Y),
            &format!(
                "User match rate\n(total users: {})",
                stats.counts.total_users
            ),
            &TextStyle::new(typo.chart_title_size, &palette.text).bold(),
        );

        let matched = stats.counts.matched_users.min(stats.counts.total_users);
        let slices = slices(matched, stats.unmatched_users);

        if slices.is_empty() {
            canvas.circle(
                CENTER,
                RADIUS,
                Paint::fill(&palette.unmatched).with_stroke(&palette.muted_text, 1.0),
            );
            canvas.text(
                CENTER,
                NO_USERS_LABEL,
                &TextStyle::new(typo.axis_label_size, &palette.muted_text).italic(),
            );
        } else {
            for slice in &slices {
                canvas.wedge(
                    slice.apex().offset(SHADOW_OFFSET, -SHADOW_OFFSET),
                    RADIUS,
                    slice.start,
                    slice.end,
                    Paint::fill(&palette.text).with_opacity(SHADOW_OPACITY),
                );
            }
            for slice in &slices {
                let fill = match slice.kind {
                    SliceKind::Matched => &palette.matched,
                    SliceKind::Unmatched => &palette.unmatched,
                };
                canvas.wedge(slice.apex(), RADIUS, slice.start, slice.end, Paint::fill(fill));
            }
            for slice in &slices {
                canvas.text(
                    slice.along(RADIUS * PERCENT_RADIUS),
                    &format!("{:.1}%", slice.fraction * 100.0),
                    &TextStyle::new(typo.axis_label_size, &palette.background).bold(),
                );

                let cos = slice.mid_angle().to_radians().cos();
                let anchor = if cos > 0.1 {
                    TextAnchor::Start
                } else if cos < -0.1 {
                    TextAnchor::End
                } else {
                    TextAnchor::Middle
                };
                canvas.text(
                    slice.along(RADIUS * NAME_RADIUS),
                    slice.label(),
                    &TextStyle::new(typo.axis_label_size, &palette.text).anchor(anchor),
                );
            }
        }

        let text = info_text(stats);
        let (w, h) = self.text_units(&text, typo.body_size, false);
        canvas.rect(
            INFO_ORIGIN,
            w + 2.0 * INFO_PAD,
            h + 2.0 * INFO_PAD,
            INFO_PAD,
            Paint::fill(&palette.panel_background).with_opacity(INFO_OPACITY),
        );
        canvas.text(
            Point::new(INFO_ORIGIN.x + INFO_PAD, INFO_ORIGIN.y + INFO_PAD + h),
            &text,
            &TextStyle::new(typo.body_size, &palette.text)
                .anchor(TextAnchor::Start)
                .valign(VAlign::Top),
        );

        info!(
            total_users = stats.counts.total_users,
            match_rate = stats.match_rate,
            "rendered match rate chart"
        );
        canvas
    }
}
