//! # hcp-hist
//!
//! Multi-axis histograms for the analysis: integer-category axes for
//! `process`, `category` and `shift`, plus binned variable axes with
//! underflow/overflow bins. Values and variances share one flow-inclusive
//! row-major storage.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod axis;
pub mod filler;
pub mod histogram;
pub mod io;

pub use axis::Axis;
pub use filler::{CATEGORY_AXIS, PROCESS_AXIS, SHIFT_AXIS, event_weights, fill_variable_histogram};
pub use histogram::{Coord, Histogram};
pub use io::{read_histogram, write_histogram};
