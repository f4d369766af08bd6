//! The selection-step abstraction.

use std::collections::BTreeMap;

use hcp_core::{AnalysisConfig, Dataset, Result};
use hcp_events::EventBatch;

/// What a step sees besides the events.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    /// Analysis configuration.
    pub config: &'a AnalysisConfig,
    /// Dataset the events belong to.
    pub dataset: &'a Dataset,
}

impl<'a> SelectionContext<'a> {
    /// Create a context.
    pub fn new(config: &'a AnalysisConfig, dataset: &'a Dataset) -> Self {
        Self { config, dataset }
    }

    /// `true` for collision data.
    pub fn is_data(&self) -> bool {
        self.dataset.is_data
    }
}

/// Masks and auxiliary columns contributed by one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    /// Named step masks, in order.
    pub masks: Vec<(String, Vec<bool>)>,
    /// Auxiliary per-event values.
    pub aux: BTreeMap<String, Vec<f64>>,
}

impl StepOutcome {
    /// No masks: the step only produces columns.
    pub fn none() -> Self {
        Self::default()
    }

    /// A single named mask.
    pub fn mask(name: impl Into<String>, mask: Vec<bool>) -> Self {
        Self { masks: vec![(name.into(), mask)], aux: BTreeMap::new() }
    }

    /// Add an auxiliary column.
    pub fn with_aux(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.aux.insert(name.into(), values);
        self
    }
}

/// One step of an event selection.
///
/// A step may add columns to the batch and contribute named masks. Steps are
/// applied in order by a [`crate::SelectorChain`].
pub trait Selector: Send + Sync {
    /// Step name.
    fn name(&self) -> &str;

    /// Columns read (patterns like `*.pt` allowed).
    fn uses(&self) -> Vec<String>;

    /// Columns written.
    fn produces(&self) -> Vec<String>;

    /// Run the step.
    fn call(&self, events: &mut EventBatch, ctx: &SelectionContext<'_>) -> Result<StepOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AllPass;

    impl Selector for AllPass {
        fn name(&self) -> &str {
            "all_pass"
        }

        fn uses(&self) -> Vec<String> {
            vec![]
        }

        fn produces(&self) -> Vec<String> {
            vec![]
        }

        fn call(&self, events: &mut EventBatch, _ctx: &SelectionContext<'_>) -> Result<StepOutcome> {
            Ok(StepOutcome::mask("all", vec![true; events.len()]))
        }
    }

    #[test]
    fn custom_selector() {
        let cfg = AnalysisConfig::example();
        let ds = cfg.get_dataset("dy_amcatnlo").unwrap();
        let ctx = SelectionContext::new(&cfg, ds);
        assert!(!ctx.is_data());

        let mut ev = EventBatch::new(2);
        let out = AllPass.call(&mut ev, &ctx).unwrap();
        assert_eq!(out.masks, vec![("all".to_string(), vec![true, true])]);
        assert_eq!(AllPass.name(), "all_pass");
    }
}
