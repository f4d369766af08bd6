//! # hcp-events
//!
//! Columnar event batches and the expression engine used by selections,
//! category definitions and variables.
//!
//! An [`EventBatch`] holds named columns. Scalar columns carry one value per
//! event; jagged columns (`Jet.pt`, `Muon.eta`, ...) carry a list per event.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod column;
pub mod error;
pub mod expr;

pub use batch::EventBatch;
pub use column::{Column, JaggedCol};
pub use error::{EventsError, Result};
pub use expr::{ColumnRef, CompiledExpr, ExprValues};
