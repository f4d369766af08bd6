//! Ordered selector chains and the default event selection.

use rayon::prelude::*;

use hcp_core::{Error, Result};
use hcp_events::EventBatch;

use crate::result::SelectionResult;
use crate::stats::{SelectionStats, StatGroup, WeightSpec, increment_stats};
use crate::step::{SelectionContext, Selector};
use crate::steps::{AttachBehavior, CategoryIds, CutflowFeatures, ProcessIds, TriggerSelection};

/// Selected events and their selection result.
#[derive(Debug, Clone)]
pub struct SelectionOutput {
    /// Events with the columns produced by the steps.
    pub events: EventBatch,
    /// Step masks, `main["event"]` and auxiliary columns.
    pub result: SelectionResult,
}

/// An ordered list of selection steps.
#[derive(Default)]
pub struct SelectorChain {
    steps: Vec<Box<dyn Selector>>,
}

impl std::fmt::Debug for SelectorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.steps.iter().map(|s| s.name())).finish()
    }
}

/// The default selection: behavior, triggers, process ids, category ids,
/// cutflow features.
pub fn default_selector() -> SelectorChain {
    SelectorChain::new()
        .with(AttachBehavior)
        .with(TriggerSelection)
        .with(ProcessIds)
        .with(CategoryIds)
        .with(CutflowFeatures)
}

fn step_error(step: &str, e: Error) -> Error {
    match e {
        Error::Selection { .. } => e,
        other => Error::Selection { step: step.to_string(), message: other.to_string() },
    }
}

fn ordered_union(lists: impl Iterator<Item = Vec<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in lists.flatten() {
        if !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

impl SelectorChain {
    /// Empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn with(mut self, step: impl Selector + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Append a boxed step.
    pub fn push(&mut self, step: Box<dyn Selector>) {
        self.steps.push(step);
    }

    /// Remove a step by name. Returns `true` if it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.steps.len();
        self.steps.retain(|s| s.name() != name);
        self.steps.len() != before
    }

    /// Step names in order.
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Columns read by any step, in order of first use.
    pub fn uses(&self) -> Vec<String> {
        ordered_union(self.steps.iter().map(|s| s.uses()))
    }

    /// Columns written by any step, in order of first production.
    pub fn produces(&self) -> Vec<String> {
        ordered_union(self.steps.iter().map(|s| s.produces()))
    }

    /// Run every step on `events`, combine the masks into `main["event"]`
    /// and update `stats`. A failing step aborts the batch.
    pub fn run(
        &self,
        mut events: EventBatch,
        ctx: &SelectionContext<'_>,
        stats: &mut SelectionStats,
    ) -> Result<SelectionOutput> {
        let mut result = SelectionResult::new();
        for step in &self.steps {
            let outcome = step.call(&mut events, ctx).map_err(|e| step_error(step.name(), e))?;
            for (name, mask) in outcome.masks {
                if mask.len() != events.len() {
                    return Err(Error::Selection {
                        step: step.name().to_string(),
                        message: format!("mask '{name}' has {} entries", mask.len()),
                    });
                }
                result.add_step(name, mask).map_err(|e| step_error(step.name(), e))?;
            }
            for (name, values) in outcome.aux {
                result.set_aux(name, values);
            }
        }

        let event_mask = result.finalize(events.len());
        record_stats(&events, &event_mask, stats)?;
        log::info!(
            "dataset '{}': selected {} of {} events",
            ctx.dataset.name,
            result.n_selected(),
            events.len()
        );
        Ok(SelectionOutput { events, result })
    }

    /// Split `events` into chunks, run the chain on each in parallel and
    /// merge the per-chunk statistics. An empty batch is run once as a
    /// single empty chunk.
    pub fn run_chunked(
        &self,
        events: &EventBatch,
        ctx: &SelectionContext<'_>,
        chunk_size: usize,
    ) -> Result<(Vec<SelectionOutput>, SelectionStats)> {
        let chunks =
            if events.is_empty() { vec![events.clone()] } else { events.chunks(chunk_size) };
        let parts: Vec<(SelectionOutput, SelectionStats)> = chunks
            .into_par_iter()
            .map(|chunk| -> Result<(SelectionOutput, SelectionStats)> {
                let mut stats = SelectionStats::new();
                let out = self.run(chunk, ctx, &mut stats)?;
                Ok((out, stats))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut stats = SelectionStats::new();
        let mut outputs = Vec::with_capacity(parts.len());
        for (out, s) in parts {
            stats.merge(&s);
            outputs.push(out);
        }
        Ok((outputs, stats))
    }
}

/// Event counts and weight sums, in total and per process id.
fn record_stats(
    events: &EventBatch,
    event_mask: &[bool],
    stats: &mut SelectionStats,
) -> Result<()> {
    let mut weights = vec![
        ("num_events", WeightSpec::Unit),
        ("num_events_selected", WeightSpec::Mask(event_mask)),
    ];
    let mc_weight = if events.has("mc_weight") { Some(events.scalar("mc_weight")?) } else { None };
    if let Some(w) = mc_weight {
        weights.push(("sum_mc_weight", WeightSpec::Weighted(w, None)));
        weights.push(("sum_mc_weight_selected", WeightSpec::Weighted(w, Some(event_mask))));
    }

    let mut groups = Vec::new();
    if events.has("process_id") {
        groups.push(StatGroup { name: "process", ids: events.scalar("process_id")? });
    }
    increment_stats(stats, events.len(), &weights, &groups)
}
