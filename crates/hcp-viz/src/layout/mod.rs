//! Plot layout: data axes, plot area and legend.

pub mod area;
pub mod axes;
pub mod legend;

pub use area::PlotArea;
pub use axes::{Axis, Tick, draw_axes};
pub use legend::{LegendEntry, LegendKind, draw_legend};
