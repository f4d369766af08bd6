//! Streaming SVG canvas.
//!
//! Shapes are serialized as they are drawn. A clip region opens a `<g>` that
//! stays open until [`Canvas::end_clip`]; [`Canvas::finish`] closes whatever
//! is still open.
//!
//! Text width uses a fixed average glyph advance, so layout never needs a
//! font file.

use std::fmt::Write;

use crate::color::Color;
use crate::primitives::{Anchor, Baseline, Font, Paint, Stroke};

const GLYPH_ADVANCE: f64 = 0.55;
const BOLD_ADVANCE: f64 = 0.6;
const FONT_FAMILY: &str = "Helvetica, Arial, sans-serif";

/// SVG canvas in points, origin at the top-left corner.
pub struct Canvas {
    /// Width (pt)
    pub width: f64,
    /// Height (pt)
    pub height: f64,
    defs: String,
    body: String,
    clip_depth: usize,
    n_clips: usize,
}

impl Canvas {
    /// Blank canvas.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            defs: String::new(),
            body: String::with_capacity(16 * 1024),
            clip_depth: 0,
            n_clips: 0,
        }
    }

    /// Axis-aligned rectangle; negative extents grow left or up.
    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, paint: &Paint) {
        let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
        let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
        let _ = write!(
            self.body,
            r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}"{}/>"#,
            paint_attrs(paint)
        );
        self.body.push('\n');
    }

    /// Straight segment.
    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: Stroke) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}"{}/>"#,
            stroke_attrs(stroke)
        );
    }

    /// Open polyline; fewer than two points draws nothing.
    pub fn polyline(&mut self, points: &[(f64, f64)], stroke: Stroke) {
        if points.len() < 2 {
            return;
        }
        let coords: Vec<String> = points.iter().map(|(x, y)| format!("{x:.2},{y:.2}")).collect();
        let _ = writeln!(
            self.body,
            r#"<polyline points="{}" fill="none"{}/>"#,
            coords.join(" "),
            stroke_attrs(stroke)
        );
    }

    /// Filled circle of radius `r`.
    pub fn dot(&mut self, cx: f64, cy: f64, r: f64, color: Color) {
        let _ = writeln!(
            self.body,
            r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="{color}"/>"#
        );
    }

    /// Horizontal text run.
    pub fn text(&mut self, x: f64, y: f64, content: &str, font: &Font) {
        self.text_run(x, y, content, font, None);
    }

    /// Text reading bottom to top, anchored at `(x, y)`.
    pub fn text_vertical(&mut self, x: f64, y: f64, content: &str, font: &Font) {
        self.text_run(x, y, content, font, Some(-90.0));
    }

    fn text_run(&mut self, x: f64, y: f64, content: &str, font: &Font, rotate: Option<f64>) {
        let anchor = match font.anchor {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        };
        let baseline = match font.baseline {
            Baseline::Alphabetic => "auto",
            Baseline::Middle => "central",
            Baseline::Top => "hanging",
        };
        let _ = write!(
            self.body,
            r#"<text x="{x:.2}" y="{y:.2}" font-family="{FONT_FAMILY}" font-size="{:.1}" fill="{}" text-anchor="{anchor}" dominant-baseline="{baseline}""#,
            font.size, font.color
        );
        if font.bold {
            self.body.push_str(r#" font-weight="bold""#);
        }
        if font.italic {
            self.body.push_str(r#" font-style="italic""#);
        }
        if let Some(angle) = rotate {
            let _ = write!(self.body, r#" transform="rotate({angle:.1},{x:.2},{y:.2})""#);
        }
        self.body.push('>');
        push_escaped(&mut self.body, content);
        self.body.push_str("</text>\n");
    }

    /// Clip everything drawn until the matching [`Canvas::end_clip`] to a rectangle.
    pub fn begin_clip(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let id = format!("clip{}", self.n_clips);
        self.n_clips += 1;
        let _ = writeln!(
            self.defs,
            r#"<clipPath id="{id}"><rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}"/></clipPath>"#
        );
        let _ = writeln!(self.body, r#"<g clip-path="url(#{id})">"#);
        self.clip_depth += 1;
    }

    /// Close the innermost clip region. No-op when none is open.
    pub fn end_clip(&mut self) {
        if self.clip_depth > 0 {
            self.body.push_str("</g>\n");
            self.clip_depth -= 1;
        }
    }

    /// Approximate advance width of `content` (pt).
    pub fn text_width(&self, content: &str, font: &Font) -> f64 {
        let advance = if font.bold { BOLD_ADVANCE } else { GLYPH_ADVANCE };
        content.chars().count() as f64 * advance * font.size
    }

    /// The complete SVG document on a white background.
    pub fn finish(mut self) -> String {
        while self.clip_depth > 0 {
            self.end_clip();
        }
        let (w, h) = (self.width, self.height);
        let mut out = String::with_capacity(self.body.len() + self.defs.len() + 256);
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
        );
        if !self.defs.is_empty() {
            let _ = write!(out, "<defs>\n{}</defs>\n", self.defs);
        }
        let _ = writeln!(out, r#"<rect width="{w}" height="{h}" fill="white"/>"#);
        out.push_str(&self.body);
        out.push_str("</svg>\n");
        out
    }
}

fn paint_attrs(paint: &Paint) -> String {
    let mut attrs = match paint.fill {
        Some(c) => format!(r#" fill="{c}""#),
        None => r#" fill="none""#.to_string(),
    };
    if let Some(stroke) = paint.outline {
        attrs.push_str(&stroke_attrs(stroke));
    }
    attrs
}

fn stroke_attrs(stroke: Stroke) -> String {
    format!(r#" stroke="{}" stroke-width="{:.2}""#, stroke.color, stroke.width)
}

fn push_escaped(out: &mut String, content: &str) {
    for ch in content.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_document() {
        let svg = Canvas::new(100.0, 50.0).finish();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"viewBox="0 0 100 50""#));
        assert!(!svg.contains("<defs>"));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn rect_extents_are_normalized() {
        let mut c = Canvas::new(200.0, 100.0);
        c.rect(60.0, 50.0, -50.0, -30.0, &Paint::fill(Color::hex("#ff0000")));
        assert!(c.finish().contains(
            r##"<rect x="10.00" y="20.00" width="50.00" height="30.00" fill="#ff0000"/>"##
        ));
    }

    #[test]
    fn clip_region_wraps_only_its_shapes() {
        let mut c = Canvas::new(100.0, 100.0);
        c.begin_clip(0.0, 0.0, 50.0, 50.0);
        c.dot(10.0, 10.0, 2.0, Color::rgb(0, 0, 0));
        c.end_clip();
        c.line(0.0, 0.0, 1.0, 1.0, Stroke::default());
        let svg = c.finish();
        assert!(svg.contains(r#"<clipPath id="clip0">"#));
        let open = svg.find("url(#clip0)").unwrap();
        let dot = svg.find("<circle").unwrap();
        let close = svg.find("</g>").unwrap();
        let line = svg.find("<line").unwrap();
        assert!(open < dot && dot < close && close < line);
    }

    #[test]
    fn unclosed_clip_is_closed_on_finish() {
        let mut c = Canvas::new(10.0, 10.0);
        c.begin_clip(0.0, 0.0, 5.0, 5.0);
        let svg = c.finish();
        assert_eq!(svg.matches("<g ").count(), svg.matches("</g>").count());
    }

    #[test]
    fn text_is_escaped() {
        let mut c = Canvas::new(100.0, 100.0);
        c.text(1.0, 1.0, "t#bar{t} & <jets>", &Font::default());
        assert!(c.finish().contains(">t#bar{t} &amp; &lt;jets&gt;</text>"));
    }

    #[test]
    fn bold_text_is_wider() {
        let c = Canvas::new(10.0, 10.0);
        let regular = c.text_width("Data", &Font::new(10.0));
        let bold = c.text_width("Data", &Font::new(10.0).bold());
        assert!(regular > 0.0 && bold > regular);
    }
}
