//! # hcp-viz
//!
//! Numbers-first plot artifacts for per-process histogram stacks and a
//! dependency-light SVG renderer for them.
//!
//! An artifact is plain serializable data (bin edges, per-process yields,
//! data points with Poisson error bars, provenance). Rendering is a separate
//! step driven by a [`VizConfig`], usually loaded from YAML.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod canvas;
pub mod color;
pub mod config;
pub mod layout;
pub mod primitives;
pub mod stack;

pub use artifact::{
    ArtifactMeta, CategoryInfo, DataPoints, ProcessSeries, ProcessStackArtifact, SCHEMA_VERSION,
    VariableInfo, data_errors, garwood_68_interval,
};
pub use color::Color;
pub use config::{VizConfig, resolve_config};
pub use stack::render_svg;

use thiserror::Error;

/// Errors raised while building or rendering plot artifacts.
#[derive(Debug, Error)]
pub enum VizError {
    /// Artifact content is inconsistent
    #[error("invalid artifact: {0}")]
    Artifact(String),
    /// Visualization config could not be parsed
    #[error("config error: {0}")]
    Config(String),
    /// Numerical failure (quantiles, clock)
    #[error("computation error: {0}")]
    Computation(String),
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, VizError>;

impl From<VizError> for hcp_core::Error {
    fn from(e: VizError) -> Self {
        match e {
            VizError::Artifact(msg) => hcp_core::Error::Validation(msg),
            VizError::Config(msg) => hcp_core::Error::Validation(msg),
            VizError::Computation(msg) => hcp_core::Error::Computation(msg),
            VizError::Json(e) => hcp_core::Error::Json(e),
            VizError::Io(e) => hcp_core::Error::Io(e),
        }
    }
}
