//! # hcp-core
//!
//! Core types for higgscp: the error type and the physics configuration
//! object model (processes, categories, datasets, shifts, variables,
//! triggers) shared by the selection and estimation crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod category;
pub mod config;
pub mod error;
pub mod process;
pub mod variable;

pub use category::Category;
pub use config::{AnalysisConfig, Dataset, Shift, Trigger};
pub use error::{Error, Result};
pub use process::Process;
pub use variable::{Binning, EMPTY_FLOAT, Variable, default_variables};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
