//! Requested systematic shifts.

use serde::{Deserialize, Serialize};

use hcp_core::{AnalysisConfig, Result, Shift};

/// Shift variants to extract from the input histograms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShiftRequest {
    /// One global shift.
    Single(String),
    /// Several shifts, each kept as its own bin of the `shift` axis.
    Many(Vec<String>),
}

impl Default for ShiftRequest {
    fn default() -> Self {
        ShiftRequest::Single("nominal".to_string())
    }
}

impl ShiftRequest {
    /// Requested names.
    pub fn names(&self) -> Vec<&str> {
        match self {
            ShiftRequest::Single(name) => vec![name.as_str()],
            ShiftRequest::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Resolve the names against the config.
    pub fn resolve<'a>(&self, config: &'a AnalysisConfig) -> Result<Vec<&'a Shift>> {
        self.names().into_iter().map(|n| config.get_shift(n)).collect()
    }
}
