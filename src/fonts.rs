use std::collections::HashMap;

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Style, Weight};

/// Line height as a multiple of the font size.
pub const LINE_SPACING: f32 = 1.2;

#[derive(Hash, PartialEq, Eq, Clone)]
struct MeasureKey {
    text: String,
    font_size_bits: u32,
    is_bold: bool,
    is_italic: bool,
}

/// Measures rendered text extents in pixels.
pub trait TextMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, is_bold: bool, is_italic: bool)
    -> (f32, f32);

    /// Widest line and total height of a `\n`-separated block.
    fn measure_block(&mut self, text: &str, font_size: f32, is_bold: bool) -> (f32, f32) {
        let mut width: f32 = 0.0;
        let mut lines = 0;
        for line in text.lines() {
            lines += 1;
            width = width.max(self.measure_text(line, font_size, is_bold, false).0);
        }
        let lines = lines.max(1);
        (width, lines as f32 * font_size * LINE_SPACING)
    }

    /// [`measure_block`](Self::measure_block) for a size in points, returned in
    /// canvas units of `unit_px` pixels.
    fn measure_units(&mut self, text: &str, size_pt: f32, is_bold: bool, unit_px: f32) -> (f32, f32) {
        let (w, h) = self.measure_block(text, size_pt * unit_px / 72.0, is_bold);
        (w / unit_px, h / unit_px)
    }
}

pub struct CosmicTextMeasure {
    font_system: FontSystem,
    cache: HashMap<MeasureKey, (f32, f32)>,
}

impl CosmicTextMeasure {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            cache: HashMap::new(),
        }
    }
}

impl Default for CosmicTextMeasure {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for CosmicTextMeasure {
    fn measure_text(
        &mut self,
        text: &str,
        font_size: f32,
        is_bold: bool,
        is_italic: bool,
    ) -> (f32, f32) {
        let key = MeasureKey {
            text: text.to_string(),
            font_size_bits: font_size.to_bits(),
            is_bold,
            is_italic,
        };

        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let mut buffer = Buffer::new(
            &mut self.font_system,
            Metrics {
                font_size,
                line_height: font_size * LINE_SPACING,
            },
        );
        buffer.set_size(&mut self.font_system, None, None);

        let attrs = Attrs::new()
            .family(Family::SansSerif)
            .weight(if is_bold { Weight::BOLD } else { Weight::NORMAL })
            .style(if is_italic { Style::Italic } else { Style::Normal });

        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);

        let mut total_width: f32 = 0.0;
        let mut total_height: f32 = 0.0;
        for run in buffer.layout_runs() {
            total_width = total_width.max(run.line_w);
            total_height += run.line_height;
        }

        let measured = (total_width, total_height);
        self.cache.insert(key, measured);
        measured
    }
}

/// Fixed-advance estimate, for tests that must not depend on installed fonts.
#[cfg(test)]
pub(crate) struct FixedAdvance;

#[cfg(test)]
impl TextMeasure for FixedAdvance {
    fn measure_text(&mut self, text: &str, font_size: f32, is_bold: bool, _: bool) -> (f32, f32) {
        let advance = if is_bold { 0.65 } else { 0.6 };
        (
            text.chars().count() as f32 * font_size * advance,
            font_size * LINE_SPACING,
        )
    }
}
