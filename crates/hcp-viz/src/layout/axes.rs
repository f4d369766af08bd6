//! Data axes: tick placement, data-to-pixel mapping and the plot frame.

use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::VizConfig;
use crate::layout::area::PlotArea;
use crate::primitives::{Anchor, Baseline, Font, Stroke};

const LOG_FLOOR: f64 = 1e-20;

/// A labelled major tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Position in data coordinates
    pub value: f64,
    /// Label text
    pub label: String,
}

/// A linear or logarithmic axis with its ticks.
#[derive(Debug, Clone)]
pub struct Axis {
    /// Lower limit
    pub min: f64,
    /// Upper limit
    pub max: f64,
    /// Logarithmic scale
    pub log: bool,
    /// Title
    pub label: String,
    /// Major ticks
    pub ticks: Vec<Tick>,
    /// Unlabelled minor tick positions
    pub minor: Vec<f64>,
}

impl Axis {
    fn bare(min: f64, max: f64, log: bool) -> Self {
        Self { min, max, log, label: String::new(), ticks: Vec::new(), minor: Vec::new() }
    }

    /// Linear axis whose limits are widened to round numbers.
    pub fn rounded(lo: f64, hi: f64, n_ticks: usize) -> Self {
        let step = tick_step(lo, hi, n_ticks);
        let (lo, hi) = if step > 0.0 {
            ((lo / step).floor() * step, (hi / step).ceil() * step)
        } else {
            (lo - 1.0, lo + 1.0)
        };
        Self::bare(lo, hi, false).with_linear_ticks(if step > 0.0 { step } else { 0.5 })
    }

    /// Linear axis on exactly `[lo, hi]` (a bin range), ticks at round numbers inside.
    pub fn exact(lo: f64, hi: f64, n_ticks: usize) -> Self {
        let step = tick_step(lo, hi, n_ticks);
        Self::bare(lo, hi, false).with_linear_ticks(if step > 0.0 { step } else { 1.0 })
    }

    /// Logarithmic axis covering whole decades around `[lo, hi]`.
    pub fn decades(lo: f64, hi: f64) -> Self {
        let first = lo.max(LOG_FLOOR).log10().floor() as i32;
        let last = (hi.max(LOG_FLOOR).log10().ceil() as i32).max(first + 1);
        let mut axis = Self::bare(10f64.powi(first), 10f64.powi(last), true);
        for e in first..=last {
            let decade = 10f64.powi(e);
            axis.ticks.push(Tick { value: decade, label: format!("10{}", superscript(e)) });
            if e < last {
                axis.minor.extend((2..=9).map(|m| m as f64 * decade));
            }
        }
        axis
    }

    fn with_linear_ticks(mut self, step: f64) -> Self {
        let slack = step * 1e-6;
        let first = (self.min / step).ceil() as i64;
        let last = ((self.max + slack) / step).floor() as i64;
        for k in first..=last {
            let value = k as f64 * step;
            self.ticks.push(Tick { value, label: tick_label(value, step) });
        }
        let sub = step / 5.0;
        let first = (self.min / sub).ceil() as i64;
        let last = ((self.max + slack) / sub).floor() as i64;
        self.minor.extend((first..=last).filter(|k| k % 5 != 0).map(|k| k as f64 * sub));
        self
    }

    /// Set the title.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Fraction of the axis length at `value`; log axes clamp at a tiny floor.
    pub fn fraction(&self, value: f64) -> f64 {
        if self.log {
            let l = |v: f64| v.max(LOG_FLOOR).log10();
            (l(value) - l(self.min)) / (l(self.max) - l(self.min))
        } else {
            (value - self.min) / (self.max - self.min)
        }
    }

    /// Pixel position of `value` between `from` (at `min`) and `to` (at `max`).
    pub fn to_pixel(&self, value: f64, from: f64, to: f64) -> f64 {
        from + self.fraction(value) * (to - from)
    }
}

/// Round step giving roughly `n_ticks` ticks over `[lo, hi]`; zero for an empty range.
fn tick_step(lo: f64, hi: f64, n_ticks: usize) -> f64 {
    let span = hi - lo;
    if !span.is_finite() || span.abs() < 1e-15 {
        return 0.0;
    }
    let raw = span / n_ticks.saturating_sub(1).max(1) as f64;
    let magnitude = 10f64.powf(raw.abs().log10().floor());
    let mantissa = match raw / magnitude {
        m if m <= 1.5 => 1.0,
        m if m <= 3.5 => 2.0,
        m if m <= 7.5 => 5.0,
        _ => 10.0,
    };
    mantissa * magnitude
}

fn tick_label(value: f64, step: f64) -> String {
    let digits = if step >= 1.0 { 0 } else { -step.log10().floor() as usize };
    // avoid "-0"
    let value = if value.abs() < step * 0.01 { 0.0 } else { value };
    format!("{value:.digits$}")
}

fn superscript(n: i32) -> String {
    const DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];
    n.to_string()
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => DIGITS[d as usize],
            None => '⁻',
        })
        .collect()
}

/// Frame, ticks, tick labels and axis titles around `area`.
pub fn draw_axes(canvas: &mut Canvas, area: &PlotArea, x: &Axis, y: &Axis, config: &VizConfig) {
    let ink = Color::rgb(0, 0, 0);
    let frame = Stroke::new(ink, 0.8);
    let major = Stroke::new(ink, 0.6);
    let minor = Stroke::new(ink, 0.4);
    let style = &config.axes;

    let (left, right, top, bottom) = (area.left, area.right(), area.top, area.bottom());
    canvas.line(left, top, right, top, frame);
    canvas.line(right, top, right, bottom, frame);
    canvas.line(right, bottom, left, bottom, frame);
    canvas.line(left, bottom, left, top, frame);

    // positive lengths point into the frame
    let inward = if style.tick_direction == "out" { -1.0 } else { 1.0 };
    let (major_len, minor_len) = (style.tick_length * inward, style.minor_tick_length * inward);
    let gap = if inward < 0.0 { style.tick_length } else { 0.0 };

    let inside = |p: f64, a: f64, b: f64| p >= a - 0.5 && p <= b + 0.5;

    let x_font = Font::new(config.font.tick_size).aligned(Anchor::Middle, Baseline::Top);
    for tick in &x.ticks {
        let px = x.to_pixel(tick.value, left, right);
        if !inside(px, left, right) {
            continue;
        }
        canvas.line(px, bottom, px, bottom - major_len, major);
        if style.show_top_ticks {
            canvas.line(px, top, px, top + major_len, major);
        }
        canvas.text(px, bottom + gap + 3.0, &tick.label, &x_font);
    }
    for px in x.minor.iter().map(|&v| x.to_pixel(v, left, right)) {
        if inside(px, left, right) {
            canvas.line(px, bottom, px, bottom - minor_len, minor);
            if style.show_top_ticks {
                canvas.line(px, top, px, top + minor_len, minor);
            }
        }
    }

    let y_font = Font::new(config.font.tick_size).aligned(Anchor::End, Baseline::Middle);
    let mut label_width = 0.0_f64;
    for tick in &y.ticks {
        let py = y.to_pixel(tick.value, bottom, top);
        if !inside(py, top, bottom) {
            continue;
        }
        canvas.line(left, py, left + major_len, py, major);
        if style.show_right_ticks {
            canvas.line(right, py, right - major_len, py, major);
        }
        canvas.text(left - gap - 4.0, py, &tick.label, &y_font);
        label_width = label_width.max(canvas.text_width(&tick.label, &y_font));
    }
    for py in y.minor.iter().map(|&v| y.to_pixel(v, bottom, top)) {
        if inside(py, top, bottom) {
            canvas.line(left, py, left + minor_len, py, minor);
            if style.show_right_ticks {
                canvas.line(right, py, right - minor_len, py, minor);
            }
        }
    }

    // titles flush with the far end of each axis
    let title = Font::new(config.font.label_size);
    if !x.label.is_empty() {
        let ty = bottom + gap + config.font.tick_size + 10.0;
        canvas.text(right, ty, &x.label, &title.aligned(Anchor::End, Baseline::Top));
    }
    if !y.label.is_empty() {
        let tx = left - gap - label_width - 10.0;
        canvas.text_vertical(tx, top, &y.label, &title.aligned(Anchor::End, Baseline::Alphabetic));
    }
}
