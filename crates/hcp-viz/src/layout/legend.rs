//! Plot legend.

use crate::canvas::Canvas;
use crate::color::Color;
use crate::layout::area::PlotArea;
use crate::primitives::{Anchor, Baseline, Font, Paint, Stroke};

/// One legend row.
#[derive(Debug, Clone)]
pub struct LegendEntry {
    /// Text
    pub label: String,
    /// Swatch color
    pub color: Color,
    /// Swatch shape
    pub kind: LegendKind,
}

/// Swatch shape of a legend row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendKind {
    /// Filled box (stacked process)
    Box,
    /// Dot with a vertical bar (data)
    Point,
}

const SWATCH_WIDTH: f64 = 16.0;
const PADDING: f64 = 6.0;

/// Draw `entries` top to bottom in the upper right corner of `area`.
pub fn draw_legend(canvas: &mut Canvas, area: &PlotArea, entries: &[LegendEntry], font_size: f64) {
    if entries.is_empty() {
        return;
    }
    let font = Font::new(font_size * 0.9).aligned(Anchor::Start, Baseline::Middle);
    let row = font_size + 4.0;
    let half = (font_size - 1.0) / 2.0;

    let text_width =
        entries.iter().map(|e| canvas.text_width(&e.label, &font)).fold(0.0_f64, f64::max);
    let box_width = 3.0 * PADDING + SWATCH_WIDTH + text_width;
    let x0 = area.right() - 5.0 - box_width + PADDING;
    let mut cy = area.top + 5.0 + PADDING + row / 2.0;

    for entry in entries {
        match entry.kind {
            LegendKind::Box => {
                let paint = Paint::fill(entry.color).with_outline(entry.color.darken(0.3), 0.5);
                canvas.rect(x0, cy - half, SWATCH_WIDTH, 2.0 * half, &paint);
            }
            LegendKind::Point => {
                let cx = x0 + SWATCH_WIDTH / 2.0;
                canvas.line(cx, cy - half, cx, cy + half, Stroke::new(entry.color, 1.0));
                canvas.dot(cx, cy, 2.5, entry.color);
            }
        }
        canvas.text(x0 + SWATCH_WIDTH + PADDING, cy, &entry.label, &font);
        cy += row;
    }
}
