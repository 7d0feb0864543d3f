//! Drawing surface shared by the diagram and chart renderers.
//!
//! A [`Canvas`] records drawing calls as SVG elements in canvas units (y up),
//! converting to pixels (y down) through its [`Viewport`]. Elements are kept in
//! call order, so later calls paint over earlier ones. The finished scene is
//! rasterized with resvg.

use std::fmt::Write;
use std::path::Path;

use resvg::usvg;
use tiny_skia::{Pixmap, Transform};
use tracing::debug;

use crate::error::RenderError;
use crate::fonts::LINE_SPACING;
use crate::schema::Point;

const POINTS_PER_INCH: f32 = 72.0;

/// Maps a rectangle of canvas units onto a pixel grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub unit_px: f32,
}

impl Viewport {
    pub fn new(min: Point, max: Point, unit_px: f32) -> Self {
        Self {
            min_x: min.x,
            min_y: min.y,
            max_x: max.x,
            max_y: max.y,
            unit_px,
        }
    }

    pub fn width_px(&self) -> f32 {
        (self.max_x - self.min_x) * self.unit_px
    }

    pub fn height_px(&self) -> f32 {
        (self.max_y - self.min_y) * self.unit_px
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn to_px(&self, p: Point) -> (f32, f32) {
        (
            (p.x - self.min_x) * self.unit_px,
            (self.max_y - p.y) * self.unit_px,
        )
    }

    /// A length in canvas units, in pixels.
    pub fn len_px(&self, units: f32) -> f32 {
        units * self.unit_px
    }

    /// A size in points, in pixels. One canvas unit is one inch.
    pub fn pt_px(&self, points: f32) -> f32 {
        points * self.unit_px / POINTS_PER_INCH
    }

    /// A size in points, in canvas units.
    pub fn pt_units(&self, points: f32) -> f32 {
        points / POINTS_PER_INCH
    }
}

/// Fill and stroke of a shape. Stroke widths are in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint<'a> {
    pub fill: Option<&'a str>,
    pub stroke: Option<&'a str>,
    pub stroke_pt: f32,
    pub opacity: f32,
}

impl<'a> Paint<'a> {
    pub fn fill(color: &'a str) -> Self {
        Self {
            fill: Some(color),
            stroke: None,
            stroke_pt: 0.0,
            opacity: 1.0,
        }
    }

    pub fn stroke(color: &'a str, width_pt: f32) -> Self {
        Self {
            fill: None,
            stroke: Some(color),
            stroke_pt: width_pt,
            opacity: 1.0,
        }
    }

    pub fn with_stroke(mut self, color: &'a str, width_pt: f32) -> Self {
        self.stroke = Some(color);
        self.stroke_pt = width_pt;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    fn attrs(&self, viewport: &Viewport) -> String {
        let mut out = format!(r#"fill="{}""#, self.fill.unwrap_or("none"));
        if let Some(stroke) = self.stroke {
            let _ = write!(
                out,
                r#" stroke="{}" stroke-width="{:.2}" stroke-linejoin="round""#,
                stroke,
                viewport.pt_px(self.stroke_pt)
            );
        }
        if self.opacity < 1.0 {
            let _ = write!(out, r#" opacity="{:.2}""#, self.opacity);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle<'a> {
    pub size_pt: f32,
    pub color: &'a str,
    pub bold: bool,
    pub italic: bool,
    pub anchor: TextAnchor,
    pub valign: VAlign,
    /// Counter-clockwise rotation around the anchor point, in degrees.
    pub rotation: f32,
}

impl<'a> TextStyle<'a> {
    pub fn new(size_pt: f32, color: &'a str) -> Self {
        Self {
            size_pt,
            color,
            bold: false,
            italic: false,
            anchor: TextAnchor::Middle,
            valign: VAlign::Center,
            rotation: 0.0,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn anchor(mut self, anchor: TextAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn valign(mut self, valign: VAlign) -> Self {
        self.valign = valign;
        self
    }

    pub fn rotated(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Canvas {
    viewport: Viewport,
    font_family: String,
    elements: Vec<String>,
}

impl Canvas {
    pub fn new(viewport: Viewport, background: &str, font_family: &str) -> Self {
        let mut canvas = Self {
            viewport,
            font_family: font_family.to_string(),
            elements: Vec::new(),
        };
        canvas.elements.push(format!(
            r#"<rect x="0" y="0" width="{:.2}" height="{:.2}" fill="{}"/>"#,
            viewport.width_px(),
            viewport.height_px(),
            background
        ));
        canvas
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Recorded elements in paint order, background first.
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Axis-aligned rectangle with `origin` as its lower-left corner.
    pub fn rect(&mut self, origin: Point, width: f32, height: f32, radius: f32, paint: Paint<'_>) {
        let vp = self.viewport;
        let (x, y) = vp.to_px(Point::new(origin.x, origin.y + height));
        let r = vp.len_px(radius);
        self.elements.push(format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" ry="{:.2}" {}/>"#,
            x,
            y,
            vp.len_px(width),
            vp.len_px(height),
            r,
            r,
            paint.attrs(&vp)
        ));
    }

    pub fn polyline(&mut self, points: &[Point], paint: Paint<'_>) {
        if points.len() < 2 {
            return;
        }
        let d = self.path_data(points);
        let vp = self.viewport;
        self.elements
            .push(format!(r#"<path d="{}" {}/>"#, d, paint.attrs(&vp)));
    }

    pub fn polygon(&mut self, points: &[Point], paint: Paint<'_>) {
        if points.len() < 3 {
            return;
        }
        let mut d = self.path_data(points);
        d.push_str(" Z");
        let vp = self.viewport;
        self.elements
            .push(format!(r#"<path d="{}" {}/>"#, d, paint.attrs(&vp)));
    }

    pub fn circle(&mut self, center: Point, radius: f32, paint: Paint<'_>) {
        let vp = self.viewport;
        let (cx, cy) = vp.to_px(center);
        self.elements.push(format!(
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" {}/>"#,
            cx,
            cy,
            vp.len_px(radius),
            paint.attrs(&vp)
        ));
    }

    /// Pie wedge from `start_deg` counter-clockwise to `end_deg`.
    pub fn wedge(&mut self, center: Point, radius: f32, start_deg: f32, end_deg: f32, paint: Paint<'_>) {
        let sweep = end_deg - start_deg;
        if sweep >= 359.99 {
            self.circle(center, radius, paint);
            return;
        }
        if sweep <= 0.0 {
            return;
        }
        let vp = self.viewport;
        let at = |deg: f32| {
            let rad = deg.to_radians();
            vp.to_px(Point::new(center.x + radius * rad.cos(), center.y + radius * rad.sin()))
        };
        let (cx, cy) = vp.to_px(center);
        let (sx, sy) = at(start_deg);
        let (ex, ey) = at(end_deg);
        let r = vp.len_px(radius);
        let large_arc = if sweep > 180.0 { 1 } else { 0 };
        // Counter-clockwise in y-up is sweep-flag 0 once y is flipped.
        self.elements.push(format!(
            r#"<path d="M {cx:.2} {cy:.2} L {sx:.2} {sy:.2} A {r:.2} {r:.2} 0 {large_arc} 0 {ex:.2} {ey:.2} Z" {}/>"#,
            paint.attrs(&vp)
        ));
    }

    /// Draw `text` at `at`; `\n` starts a new line.
    pub fn text(&mut self, at: Point, text: &str, style: &TextStyle<'_>) {
        let vp = self.viewport;
        let (x, y) = vp.to_px(at);
        let size = vp.pt_px(style.size_pt);
        let line_height = size * LINE_SPACING;
        let lines: Vec<&str> = text.split('\n').collect();
        let block = (lines.len() - 1) as f32 * line_height;

        // Baseline of the first line, placing a glyph's visual center at size/3 above it.
        let first_baseline = match style.valign {
            VAlign::Top => y + line_height / 2.0 + size / 3.0,
            VAlign::Center => y - block / 2.0 + size / 3.0,
            VAlign::Bottom => y - line_height / 2.0 - block + size / 3.0,
        };

        let anchor = match style.anchor {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        };

        let mut el = format!(
            r#"<text x="{x:.2}" y="{first_baseline:.2}" font-family="{}" font-size="{size:.2}" fill="{}" text-anchor="{anchor}""#,
            escape_text(&self.font_family),
            style.color
        );
        if style.bold {
            el.push_str(r#" font-weight="bold""#);
        }
        if style.italic {
            el.push_str(r#" font-style="italic""#);
        }
        if style.rotation != 0.0 {
            let _ = write!(el, r#" transform="rotate({:.2} {x:.2} {y:.2})""#, -style.rotation);
        }
        el.push('>');
        // An empty tspan does not advance, so blank lines fold into the next dy.
        let mut dy = 0.0;
        for (idx, line) in lines.iter().enumerate() {
            if idx > 0 {
                dy += line_height;
            }
            if line.trim().is_empty() {
                continue;
            }
            let _ = write!(
                el,
                r#"<tspan x="{x:.2}" dy="{dy:.2}">{}</tspan>"#,
                escape_text(line)
            );
            dy = 0.0;
        }
        el.push_str("</text>");
        self.elements.push(el);
    }

    pub fn to_svg(&self) -> String {
        let w = self.viewport.width_px();
        let h = self.viewport.height_px();
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.2} {h:.2}">"#
        );
        svg.push('\n');
        for el in &self.elements {
            svg.push_str(el);
            svg.push('\n');
        }
        svg.push_str("</svg>\n");
        svg
    }

    /// Rasterize and PNG-encode the scene; `scale` multiplies the pixel size.
    pub fn to_png(&self, scale: f32) -> Result<Vec<u8>, RenderError> {
        svg_to_png(&self.to_svg(), scale)
    }

    fn path_data(&self, points: &[Point]) -> String {
        let mut d = String::new();
        for (idx, p) in points.iter().enumerate() {
            let (x, y) = self.viewport.to_px(*p);
            let cmd = if idx == 0 { "M" } else { " L" };
            let _ = write!(d, "{cmd} {x:.2} {y:.2}");
        }
        d
    }
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // Not representable in XML 1.0.
            c if c.is_control() && c != '\t' => {}
            c => escaped.push(c),
        }
    }
    escaped
}

fn svg_to_png(svg: &str, scale: f32) -> Result<Vec<u8>, RenderError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(RenderError::Scale(scale));
    }

    let mut opts = usvg::Options::default();
    {
        let fontdb = opts.fontdb_mut();
        fontdb.load_system_fonts();

        let local_fonts = Path::new("fonts");
        if local_fonts.is_dir() {
            fontdb.load_fonts_dir(local_fonts);
        }

        configure_font_fallbacks(fontdb);
    }

    let tree = usvg::Tree::from_str(svg, &opts).map_err(|e| RenderError::Scene(e.to_string()))?;

    let width = (tree.size().width() * scale).ceil() as u32;
    let height = (tree.size().height() * scale).ceil() as u32;
    let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Pixmap { width, height })?;

    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
    debug!(width, height, "rasterized scene");

    pixmap
        .encode_png()
        .map_err(|e| RenderError::Encode(e.to_string()))
}

/// Point the generic sans/serif/monospace families at fonts that exist.
fn configure_font_fallbacks(fontdb: &mut usvg::fontdb::Database) {
    let mut sans_family: Option<String> = None;
    let mut first_family: Option<String> = None;

    for face in fontdb.faces() {
        for (family, _) in &face.families {
            if first_family.is_none() {
                first_family = Some(family.clone());
            }
            if sans_family.is_none() && family.to_ascii_lowercase().contains("sans") {
                sans_family = Some(family.clone());
            }
        }
    }

    if let Some(family) = sans_family.or(first_family) {
        fontdb.set_sans_serif_family(family.as_str());
        fontdb.set_serif_family(family.as_str());
        fontdb.set_monospace_family(family.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_canvas() -> Canvas {
        Canvas::new(
            Viewport::new(Point::new(0.0, 0.0), Point::new(4.0, 2.0), 100.0),
            "#FFFFFF",
            "sans-serif",
        )
    }

    #[test]
    fn viewport_flips_y_axis() {
        let vp = Viewport::new(Point::new(-1.0, 0.0), Point::new(3.0, 2.0), 50.0);
        assert_eq!(vp.to_px(Point::new(-1.0, 2.0)), (0.0, 0.0));
        assert_eq!(vp.to_px(Point::new(3.0, 0.0)), (200.0, 100.0));
        assert_eq!(vp.width_px(), 200.0);
        assert_eq!(vp.pt_px(72.0), 50.0);
    }

    #[test]
    fn canvas_starts_with_background() {
        let canvas = unit_canvas();
        assert_eq!(canvas.elements().len(), 1);
        assert!(canvas.elements()[0].contains(r##"fill="#FFFFFF""##));
    }

    #[test]
    fn rect_uses_upper_left_pixel_corner() {
        let mut canvas = unit_canvas();
        canvas.rect(Point::new(1.0, 0.5), 2.0, 1.0, 0.0, Paint::fill("#E3F2FD"));
        let el = &canvas.elements()[1];
        assert!(el.contains(r#"x="100.00" y="50.00" width="200.00" height="100.00""#));
    }

    #[test]
    fn multiline_text_becomes_tspans() {
        let mut canvas = unit_canvas();
        canvas.text(
            Point::new(2.0, 1.0),
            "1:N\n(sender)",
            &TextStyle::new(8.0, "#000000").bold(),
        );
        let el = canvas.elements().last().unwrap();
        assert_eq!(el.matches("<tspan").count(), 2);
        assert!(el.contains(r#"font-weight="bold""#));
        assert!(el.contains("(sender)"));
    }

    #[test]
    fn blank_lines_keep_their_height() {
        let mut canvas = unit_canvas();
        let style = TextStyle::new(9.0, "#000000");
        canvas.text(Point::new(2.0, 1.0), "first\n\nthird", &style);
        let el = canvas.elements().last().unwrap();

        let line_height = canvas.viewport.pt_px(9.0) * LINE_SPACING;
        assert_eq!(el.matches("<tspan").count(), 2);
        assert!(el.contains(&format!(
            r#"dy="{:.2}">third</tspan>"#,
            2.0 * line_height
        )));
    }

    #[test]
    fn text_is_escaped() {
        let mut canvas = unit_canvas();
        canvas.text(Point::new(0.0, 0.0), "a<b & \"c\"\u{7}", &TextStyle::new(9.0, "#000"));
        let el = canvas.elements().last().unwrap();
        assert!(el.contains("a&lt;b &amp; &quot;c&quot;</tspan>"));
    }

    #[test]
    fn degenerate_polyline_is_skipped() {
        let mut canvas = unit_canvas();
        canvas.polyline(&[Point::new(0.0, 0.0)], Paint::stroke("#666666", 1.5));
        assert_eq!(canvas.elements().len(), 1);
    }

    #[test]
    fn full_wedge_becomes_circle() {
        let mut canvas = unit_canvas();
        canvas.wedge(Point::new(2.0, 1.0), 0.5, 90.0, 450.0, Paint::fill("#4CAF50"));
        assert!(canvas.elements()[1].starts_with("<circle"));
    }

    #[test]
    fn svg_document_wraps_elements_in_order() {
        let mut canvas = unit_canvas();
        canvas.polyline(
            &[Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
            Paint::stroke("#666666", 1.5),
        );
        let svg = canvas.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.find("<rect").unwrap() < svg.find("<path").unwrap());
        assert!(svg.contains("M 0.00 200.00 L 100.00 100.00"));
    }

    #[test]
    fn rejects_non_positive_scale() {
        assert!(matches!(unit_canvas().to_png(0.0), Err(RenderError::Scale(_))));
    }
}
