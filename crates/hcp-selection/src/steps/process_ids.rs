//! Process id tagging.

use hcp_core::{Error, Process, Result};
use hcp_events::{CompiledExpr, EventBatch};

use crate::step::{SelectionContext, Selector, StepOutcome};

/// Writes `process_id`: the id of the leaf process each event belongs to.
///
/// A dataset declaring a single leaf process tags every event with its id.
/// Otherwise the leaves of the declared processes are tried in order and the
/// first whose selection holds wins; a leaf without selection always matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessIds;

impl Selector for ProcessIds {
    fn name(&self) -> &str {
        "process_ids"
    }

    fn uses(&self) -> Vec<String> {
        Vec::new()
    }

    fn produces(&self) -> Vec<String> {
        vec!["process_id".to_string()]
    }

    fn call(&self, events: &mut EventBatch, ctx: &SelectionContext<'_>) -> Result<StepOutcome> {
        let declared = ctx.config.dataset_processes(ctx.dataset)?;
        let leaves: Vec<&Process> = declared.iter().flat_map(|p| p.leaf_processes()).collect();

        let ids = match leaves.as_slice() {
            [] => {
                return Err(Error::Validation(format!(
                    "dataset '{}' declares no process",
                    ctx.dataset.name
                )));
            }
            [only] => vec![only.id as f64; events.len()],
            _ => assign_by_selection(events, &leaves, &ctx.dataset.name)?,
        };
        events.insert("process_id", ids)?;
        Ok(StepOutcome::none())
    }
}

fn assign_by_selection(events: &EventBatch, leaves: &[&Process], dataset: &str) -> Result<Vec<f64>> {
    let mut ids: Vec<Option<i64>> = vec![None; events.len()];
    for leaf in leaves {
        let matched = match &leaf.selection {
            Some(sel) => CompiledExpr::compile(sel)?.eval_mask(events)?,
            None => vec![true; events.len()],
        };
        for (id, m) in ids.iter_mut().zip(matched) {
            if id.is_none() && m {
                *id = Some(leaf.id);
            }
        }
    }

    ids.into_iter()
        .enumerate()
        .map(|(i, id)| {
            id.map(|id| id as f64).ok_or_else(|| {
                Error::Computation(format!(
                    "dataset '{dataset}': event {i} matches none of the processes [{}]",
                    leaves.iter().map(|p| p.name.as_str()).collect::<Vec<_>>().join(", ")
                ))
            })
        })
        .collect()
}
