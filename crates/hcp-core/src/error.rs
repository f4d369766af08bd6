//! Error types for higgscp

use thiserror::Error;

/// higgscp error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// A named config object could not be resolved
    #[error("unknown {kind}: '{name}'")]
    NotFound {
        /// Object kind ("process", "category", ...)
        kind: &'static str,
        /// Requested name
        name: String,
    },

    /// Expression compilation or evaluation error
    #[error("Expression error: {0}")]
    Expression(String),

    /// Histogram shape, axis or storage error
    #[error("Histogram error: {0}")]
    Histogram(String),

    /// Failure inside a selection step
    #[error("Selection error in step '{step}': {message}")]
    Selection {
        /// Step name
        step: String,
        /// Underlying message
        message: String,
    },

    /// No histograms were accumulated for any requested process
    #[error("{0}")]
    NoHistograms(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
