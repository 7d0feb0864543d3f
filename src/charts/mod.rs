//! Reporting charts drawn from [`Stats`](crate::stats::Stats).

mod pie;
mod trend;

use crate::fonts::TextMeasure;
use crate::theme::Theme;

pub use pie::{MATCHED_LABEL, NO_USERS_LABEL, UNMATCHED_LABEL};

/// Draws the proportion and trend charts.
pub struct ChartRenderer<'a, T: TextMeasure> {
    theme: &'a Theme,
    measure: &'a mut T,
}

impl<'a, T: TextMeasure> ChartRenderer<'a, T> {
    pub fn new(theme: &'a Theme, measure: &'a mut T) -> Self {
        Self { theme, measure }
    }

    fn text_units(&mut self, text: &str, size_pt: f32, bold: bool) -> (f32, f32) {
        self.measure.measure_units(text, size_pt, bold, self.theme.unit_px)
    }
}
