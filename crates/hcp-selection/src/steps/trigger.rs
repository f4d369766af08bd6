//! Trigger selection: OR of the configured trigger paths.

use hcp_core::Result;
use hcp_events::EventBatch;

use crate::step::{SelectionContext, Selector, StepOutcome};

/// Name of the step mask contributed by [`TriggerSelection`].
pub const TRIGGER_STEP: &str = "trigger";

/// Accepts events firing any configured trigger.
///
/// Data-only triggers are ignored for simulation. Each evaluated trigger is
/// also recorded as an auxiliary column `trigger_<name>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerSelection;

impl Selector for TriggerSelection {
    fn name(&self) -> &str {
        "trigger_selection"
    }

    fn uses(&self) -> Vec<String> {
        vec!["HLT.*".to_string()]
    }

    fn produces(&self) -> Vec<String> {
        Vec::new()
    }

    fn call(&self, events: &mut EventBatch, ctx: &SelectionContext<'_>) -> Result<StepOutcome> {
        let triggers: Vec<_> = ctx
            .config
            .triggers
            .iter()
            .filter(|t| ctx.is_data() || !t.data_only)
            .collect();
        if triggers.is_empty() {
            return Ok(StepOutcome::mask(TRIGGER_STEP, vec![true; events.len()]));
        }

        let mut any = vec![false; events.len()];
        let mut aux = Vec::with_capacity(triggers.len());
        for t in triggers {
            let fired = events.flag(&t.column)?;
            for (a, &f) in any.iter_mut().zip(&fired) {
                *a |= f;
            }
            log::debug!(
                "trigger '{}': {} of {} events",
                t.name,
                fired.iter().filter(|f| **f).count(),
                events.len()
            );
            aux.push((
                format!("trigger_{}", t.name),
                fired.into_iter().map(|f| if f { 1.0 } else { 0.0 }).collect(),
            ));
        }

        let mut out = StepOutcome::mask(TRIGGER_STEP, any);
        for (name, values) in aux {
            out = out.with_aux(name, values);
        }
        Ok(out)
    }
}
