//! # hcp-selection
//!
//! Event selection for higgscp: composable [`Selector`] steps applied in
//! order by a [`SelectorChain`], producing a [`SelectionResult`] whose
//! `main["event"]` mask is the AND of all step masks, and updating a
//! [`SelectionStats`] accumulator.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pipeline;
pub mod result;
pub mod stats;
pub mod step;
pub mod steps;

pub use pipeline::{SelectionOutput, SelectorChain, default_selector};
pub use result::{EVENT_MASK, SelectionResult, StepMask};
pub use stats::{SelectionStats, StatGroup, WeightSpec, increment_stats};
pub use step::{SelectionContext, Selector, StepOutcome};
