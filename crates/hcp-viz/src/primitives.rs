//! Paint, stroke and font settings for the canvas.

use crate::color::Color;

const BLACK: Color = Color::rgb(0, 0, 0);

/// Line color and width (pt).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    /// Line color
    pub color: Color,
    /// Line width (pt)
    pub width: f64,
}

impl Stroke {
    /// Stroke of `width` points.
    pub const fn new(color: Color, width: f64) -> Self {
        Self { color, width }
    }
}

impl Default for Stroke {
    fn default() -> Self {
        Self::new(BLACK, 1.0)
    }
}

/// How a closed shape is painted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Paint {
    /// Interior color; `None` leaves the shape hollow
    pub fill: Option<Color>,
    /// Border
    pub outline: Option<Stroke>,
}

impl Paint {
    /// Solid fill without a border.
    pub fn fill(color: Color) -> Self {
        Self { fill: Some(color), outline: None }
    }

    /// Add a border.
    pub fn with_outline(mut self, color: Color, width: f64) -> Self {
        self.outline = Some(Stroke::new(color, width));
        self
    }
}

/// Horizontal alignment of a text run relative to its anchor point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Anchor {
    /// Text starts at the point
    #[default]
    Start,
    /// Centered on the point
    Middle,
    /// Text ends at the point
    End,
}

/// Vertical alignment of a text run relative to its anchor point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Baseline {
    /// The point is on the alphabetic baseline
    #[default]
    Alphabetic,
    /// Vertically centered
    Middle,
    /// The point is at the top of the glyphs
    Top,
}

/// Font and placement of a text run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    /// Size (pt)
    pub size: f64,
    /// Text color
    pub color: Color,
    /// Bold weight
    pub bold: bool,
    /// Italic slant
    pub italic: bool,
    /// Horizontal alignment
    pub anchor: Anchor,
    /// Vertical alignment
    pub baseline: Baseline,
}

impl Font {
    /// Regular black font of `size` points, anchored at the start of the baseline.
    pub fn new(size: f64) -> Self {
        Self {
            size,
            color: BLACK,
            bold: false,
            italic: false,
            anchor: Anchor::Start,
            baseline: Baseline::Alphabetic,
        }
    }

    #[allow(missing_docs)]
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    #[allow(missing_docs)]
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    #[allow(missing_docs)]
    pub fn colored(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Set both alignments.
    pub fn aligned(mut self, anchor: Anchor, baseline: Baseline) -> Self {
        self.anchor = anchor;
        self.baseline = baseline;
        self
    }
}

impl Default for Font {
    fn default() -> Self {
        Self::new(10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose() {
        let f = Font::new(12.0).bold().aligned(Anchor::End, Baseline::Top);
        assert!(f.bold && !f.italic);
        assert_eq!(f.anchor, Anchor::End);
        assert_eq!(f.baseline, Baseline::Top);

        let p = Paint::fill(Color::rgb(1, 2, 3)).with_outline(BLACK, 0.5);
        assert_eq!(p.outline, Some(Stroke::new(BLACK, 0.5)));
    }
}
