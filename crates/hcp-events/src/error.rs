//! Error type for event batches and expressions.

use thiserror::Error;

/// Errors raised while building, reading or evaluating event batches.
#[derive(Error, Debug)]
pub enum EventsError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A referenced column does not exist in the batch
    #[error("missing column: '{0}'")]
    MissingColumn(String),

    /// Expression compilation or evaluation error
    #[error("expression error: {0}")]
    Expression(String),

    /// Inconsistent column lengths or offsets
    #[error("shape error: {0}")]
    Shape(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EventsError>;

impl From<EventsError> for hcp_core::Error {
    fn from(e: EventsError) -> Self {
        match e {
            EventsError::Io(e) => hcp_core::Error::Io(e),
            EventsError::Json(e) => hcp_core::Error::Json(e),
            EventsError::MissingColumn(name) => hcp_core::Error::NotFound { kind: "column", name },
            EventsError::Expression(msg) => hcp_core::Error::Expression(msg),
            EventsError::Shape(msg) => hcp_core::Error::Validation(msg),
        }
    }
}
