//! Cutflow feature columns.

use hcp_core::{EMPTY_FLOAT, Result};
use hcp_events::EventBatch;

use crate::step::{SelectionContext, Selector, StepOutcome};

/// Writes `cutflow.n_jet` and `cutflow.jet1_pt` (leading jet pt, or
/// [`EMPTY_FLOAT`] for events without jets).
#[derive(Debug, Clone, Copy, Default)]
pub struct CutflowFeatures;

impl Selector for CutflowFeatures {
    fn name(&self) -> &str {
        "cutflow_features"
    }

    fn uses(&self) -> Vec<String> {
        vec!["Jet.pt".to_string()]
    }

    fn produces(&self) -> Vec<String> {
        vec!["cutflow.n_jet".to_string(), "cutflow.jet1_pt".to_string()]
    }

    fn call(&self, events: &mut EventBatch, _ctx: &SelectionContext<'_>) -> Result<StepOutcome> {
        let jets = events.jagged("Jet.pt")?;
        let n_jet: Vec<f64> = jets.counts().into_iter().map(|c| c as f64).collect();
        let jet1_pt: Vec<f64> = (0..events.len()).map(|i| jets.get(i, 0, EMPTY_FLOAT)).collect();
        events.insert("cutflow.n_jet", n_jet)?;
        events.insert("cutflow.jet1_pt", jet1_pt)?;
        Ok(StepOutcome::none())
    }
}
