//! Stacked per-process histogram plot.
//!
//! Simulated processes are stacked in artifact order (first at the bottom),
//! the data-driven estimate on top, data drawn as markers with error bars.

use crate::artifact::{ProcessSeries, ProcessStackArtifact};
use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::VizConfig;
use crate::layout::{Axis, LegendEntry, LegendKind, PlotArea, draw_axes, draw_legend};
use crate::primitives::{Anchor, Baseline, Font, Paint, Stroke};
use crate::{Result, VizError};

/// Render an artifact to an SVG document.
pub fn render_svg(artifact: &ProcessStackArtifact, config: &VizConfig) -> Result<String> {
    let n_bins = artifact.n_bins();
    let edges = &artifact.bin_edges;
    for s in artifact.series.iter().chain(artifact.estimate.iter()) {
        if s.y.len() != n_bins {
            return Err(VizError::Artifact(format!(
                "series '{}' has {} bins, expected {n_bins}",
                s.name,
                s.y.len()
            )));
        }
    }

    let mut canvas = Canvas::new(config.figure.width, config.figure.height);

    let palette = config.palette_colors();
    let mut next_palette = 0usize;
    let mut pick_color = |s: &ProcessSeries| -> Color {
        if let Some(c) = config.process_colors.get(&s.name) {
            return *c;
        }
        if let Some(c) = s.color.as_deref().and_then(Color::parse) {
            return c;
        }
        let c = palette[next_palette % palette.len()];
        next_palette += 1;
        c
    };

    let mut layers: Vec<(&ProcessSeries, Color)> =
        artifact.simulated().map(|s| (s, pick_color(s))).collect();
    if config.stack.show_estimate
        && let Some(est) = &artifact.estimate
    {
        layers.push((est, config.colors.estimate));
    }

    // y range
    let stack_top: Vec<f64> = {
        let mut acc = vec![0.0; n_bins];
        for (s, _) in &layers {
            for (a, v) in acc.iter_mut().zip(&s.y) {
                *a += v.max(0.0);
            }
        }
        acc
    };
    let data_top = artifact
        .data
        .iter()
        .flat_map(|d| d.y.iter().zip(&d.yerr_hi).map(|(y, e)| y + e))
        .filter(|v| v.is_finite());
    let y_peak = stack_top.iter().copied().chain(data_top).fold(0.0_f64, f64::max);

    let y_axis = if config.stack.log_y {
        let positive_min = layers
            .iter()
            .flat_map(|(s, _)| s.y.iter())
            .chain(artifact.data.iter().flat_map(|d| d.y.iter()))
            .copied()
            .filter(|v| *v > 0.0)
            .fold(f64::INFINITY, f64::min);
        let lo = if positive_min.is_finite() { positive_min * 0.5 } else { 0.1 };
        let hi = y_peak.max(lo * 10.0) * config.stack.y_headroom.powi(3);
        Axis::decades(lo, hi)
    } else {
        Axis::rounded(0.0, (y_peak * config.stack.y_headroom).max(1.0), 6)
    };
    let y_axis = y_axis.with_label(config.stack.y_label.clone());
    let x_axis = Axis::exact(edges[0], edges[n_bins], 6)
        .with_label(artifact.variable.axis_label());

    // margins
    let tick_font = Font::new(config.font.tick_size);
    let widest_tick = y_axis
        .ticks
        .iter()
        .map(|t| canvas.text_width(&t.label, &tick_font))
        .fold(0.0_f64, f64::max);
    let left = widest_tick + config.font.label_size + 24.0;
    let top =
        if config.experiment.name.is_empty() { 14.0 } else { config.font.label_size * 1.3 + 16.0 };
    let bottom = config.font.tick_size + config.font.label_size + 26.0;
    let area = PlotArea::from_margins(canvas.width, canvas.height, left, top, 18.0, bottom);

    draw_header(&mut canvas, &area, config);

    let px = |x: f64| x_axis.to_pixel(x, area.left, area.right());
    let py = |y: f64| {
        let y = if y_axis.log { y.max(y_axis.min) } else { y };
        y_axis.to_pixel(y, area.bottom(), area.top)
    };

    canvas.begin_clip(area.left, area.top, area.width, area.height);

    let mut base = vec![0.0_f64; n_bins];
    for (series, color) in &layers {
        let paint = Paint::fill(*color).with_outline(color.darken(0.3), 0.4);
        for bi in 0..n_bins {
            let v = series.y[bi].max(0.0);
            if v <= 0.0 {
                continue;
            }
            let (x0, x1) = (px(edges[bi]), px(edges[bi + 1]));
            let (y0, y1) = (py(base[bi]), py(base[bi] + v));
            canvas.rect(x0, y1, x1 - x0, y0 - y1, &paint);
            base[bi] += v;
        }
    }

    // outline of the full stack
    if !layers.is_empty() {
        let mut outline = Vec::with_capacity(2 * n_bins + 2);
        outline.push((px(edges[0]), py(0.0)));
        for bi in 0..n_bins {
            outline.push((px(edges[bi]), py(base[bi])));
            outline.push((px(edges[bi + 1]), py(base[bi])));
        }
        outline.push((px(edges[n_bins]), py(0.0)));
        canvas.polyline(&outline, Stroke::new(config.colors.outline, 0.8));
    }

    if let Some(data) = &artifact.data {
        let bar = Stroke::new(config.colors.data, 1.0);
        for bi in 0..n_bins {
            let y = data.y[bi];
            if !y.is_finite() || (y_axis.log && y <= 0.0) {
                continue;
            }
            let x = px(0.5 * (edges[bi] + edges[bi + 1]));
            let lo = (y - data.yerr_lo[bi]).max(0.0);
            let hi = y + data.yerr_hi[bi];
            canvas.line(x, py(lo), x, py(hi), bar);
            canvas.dot(x, py(y), 2.5, config.colors.data);
        }
    }

    canvas.end_clip();
    draw_axes(&mut canvas, &area, &x_axis, &y_axis, config);

    let cat_font = Font::new(config.font.size).bold().aligned(Anchor::Start, Baseline::Top);
    canvas.text(area.left + 8.0, area.top + 8.0, &artifact.category.label, &cat_font);

    let mut entries = Vec::new();
    if artifact.data.is_some() {
        let label = artifact
            .series
            .iter()
            .find(|s| s.is_data)
            .map(|s| s.label.clone())
            .unwrap_or_else(|| "Data".to_string());
        entries.push(LegendEntry {
            label,
            color: config.colors.data,
            kind: LegendKind::Point,
        });
    }
    for (series, color) in layers.iter().rev() {
        let label = if artifact.estimate.as_ref().is_some_and(|e| std::ptr::eq(e, *series)) {
            config.stack.estimate_label.clone()
        } else {
            series.label.clone()
        };
        entries.push(LegendEntry { label, color: *color, kind: LegendKind::Box });
    }
    draw_legend(&mut canvas, &area, &entries, config.font.size);

    log::debug!(
        "rendered stack for {}/{}: {} layers, {} bins",
        artifact.category.name,
        artifact.variable.name,
        layers.len(),
        n_bins
    );
    Ok(canvas.finish())
}

/// **CMS** *Private work* on the left, energy and luminosity on the right.
fn draw_header(canvas: &mut Canvas, area: &PlotArea, config: &VizConfig) {
    let exp = &config.experiment;
    if exp.name.is_empty() {
        return;
    }
    let size = config.font.label_size * 1.3;
    let y = area.top - 6.0;

    let name_font = Font::new(size).bold();
    canvas.text(area.left, y, &exp.name, &name_font);
    if !exp.status.is_empty() {
        let offset = canvas.text_width(&exp.name, &name_font) + 5.0;
        canvas.text(area.left + offset, y, &exp.status, &Font::new(size * 0.8).italic());
    }

    let mut info = Vec::new();
    if exp.lumi_fb_inv > 0.0 {
        info.push(format!("{} fb\u{207B}\u{00B9}", exp.lumi_fb_inv));
    }
    if exp.sqrt_s_tev > 0.0 {
        info.push(format!("({} TeV)", exp.sqrt_s_tev));
    }
    if !info.is_empty() {
        let font = Font::new(config.font.tick_size)
            .colored(Color::rgb(60, 60, 60))
            .aligned(Anchor::End, Baseline::Alphabetic);
        canvas.text(area.right(), y, &info.join(" "), &font);
    }
}
