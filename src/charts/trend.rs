use tracing::info;

use super::ChartRenderer;
use crate::canvas::{Canvas, Paint, TextAnchor, TextStyle, VAlign, Viewport};
use crate::fonts::TextMeasure;
use crate::schema::Point;
use crate::stats::Stats;

const WIDTH: f32 = 10.0;
const HEIGHT: f32 = 6.0;
const PLOT_LEFT: f32 = 1.0;
const PLOT_RIGHT: f32 = 9.6;
const PLOT_BOTTOM: f32 = 1.5;
const PLOT_TOP: f32 = 5.0;
const TITLE_Y: f32 = 5.5;

const BAR_FILL: f32 = 0.8;
const BAR_OPACITY: f32 = 0.7;
const GRID_OPACITY: f32 = 0.3;
const TICK_GAP: f32 = 0.1;
const VALUE_GAP: f32 = 0.03;
const TICK_ROTATION: f32 = 45.0;

const TITLE: &str = "Monthly matches";
const X_LABEL: &str = "Month";
const Y_LABEL: &str = "Matches";

/// Top of the value axis and the gridline step.
///
/// The top is always above `max` so value labels fit over the tallest bar.
fn value_axis(max: u64) -> (u64, u64) {
    let target = (max.max(1) as f64 * 1.1 / 5.0).max(1.0);
    let magnitude = 10f64.powf(target.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= target)
        .unwrap_or(10.0 * magnitude);
    let step = step.round().max(1.0) as u64;
    ((max / step).saturating_add(1).saturating_mul(step), step)
}

impl<T: TextMeasure> ChartRenderer<'_, T> {
    /// One bar per month of the gap-filled series.
    pub fn render_trend(&mut self, stats: &Stats) -> Canvas {
        let theme = self.theme;
        let palette = &theme.palette;
        let typo = &theme.typography;

        let viewport = Viewport::new(Point::new(0.0, 0.0), Point::new(WIDTH, HEIGHT), theme.unit_px);
        let mut canvas = Canvas::new(viewport, &palette.background, &typo.font_family);

        canvas.text(
            Point::new(WIDTH / 2.0, TITLE_Y),
            TITLE,
            &TextStyle::new(typo.chart_title_size, &palette.text).bold(),
        );

        let plot_w = PLOT_RIGHT - PLOT_LEFT;
        let plot_h = PLOT_TOP - PLOT_BOTTOM;
        let max = stats.monthly.iter().map(|m| m.count).max().unwrap_or(0);
        let (top, step) = value_axis(max);
        let value_y = |v: u64| PLOT_BOTTOM + v as f32 / top as f32 * plot_h;

        for v in (0..=top).step_by(step as usize) {
            let y = value_y(v);
            canvas.polyline(
                &[Point::new(PLOT_LEFT, y), Point::new(PLOT_RIGHT, y)],
                Paint::stroke(&palette.grid, 0.8).with_opacity(GRID_OPACITY),
            );
            canvas.text(
                Point::new(PLOT_LEFT - TICK_GAP, y),
                &v.to_string(),
                &TextStyle::new(typo.body_size, &palette.text).anchor(TextAnchor::End),
            );
        }

        let slot = plot_w / stats.monthly.len().max(1) as f32;
        let bar_w = slot * BAR_FILL;
        for (i, entry) in stats.monthly.iter().enumerate() {
            let center_x = PLOT_LEFT + slot * (i as f32 + 0.5);
            if entry.count > 0 {
                let bar_top = value_y(entry.count);
                canvas.rect(
                    Point::new(center_x - bar_w / 2.0, PLOT_BOTTOM),
                    bar_w,
                    bar_top - PLOT_BOTTOM,
                    0.0,
                    Paint::fill(&palette.bar).with_opacity(BAR_OPACITY),
                );
                canvas.text(
                    Point::new(center_x, bar_top + VALUE_GAP),
                    &entry.count.to_string(),
                    &TextStyle::new(typo.body_size, &palette.text)
                        .bold()
                        .valign(VAlign::Bottom),
                );
            }
            canvas.text(
                Point::new(center_x, PLOT_BOTTOM - TICK_GAP),
                &entry.month.to_string(),
                &TextStyle::new(typo.body_size, &palette.text)
                    .anchor(TextAnchor::End)
                    .rotated(TICK_ROTATION),
            );
        }

        canvas.rect(
            Point::new(PLOT_LEFT, PLOT_BOTTOM),
            plot_w,
            plot_h,
            0.0,
            Paint::stroke(&palette.text, 0.8),
        );

        canvas.text(
            Point::new(PLOT_LEFT + plot_w / 2.0, 0.3),
            X_LABEL,
            &TextStyle::new(typo.axis_label_size, &palette.text),
        );
        canvas.text(
            Point::new(0.35, PLOT_BOTTOM + plot_h / 2.0),
            Y_LABEL,
            &TextStyle::new(typo.axis_label_size, &palette.text).rotated(90.0),
        );

        info!(months = stats.monthly.len(), max, "rendered monthly trend chart");
        canvas
    }
}
