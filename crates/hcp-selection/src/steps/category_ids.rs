//! Category id tagging.

use hcp_core::Result;
use hcp_events::{CompiledExpr, EventBatch, JaggedCol};

use crate::step::{SelectionContext, Selector, StepOutcome};

/// Writes the jagged `category_ids` column: every leaf category whose
/// selection, and the selections of all its ancestors, hold for the event.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryIds;

impl Selector for CategoryIds {
    fn name(&self) -> &str {
        "category_ids"
    }

    fn uses(&self) -> Vec<String> {
        Vec::new()
    }

    fn produces(&self) -> Vec<String> {
        vec!["category_ids".to_string()]
    }

    fn call(&self, events: &mut EventBatch, ctx: &SelectionContext<'_>) -> Result<StepOutcome> {
        let n = events.len();
        let mut lists: Vec<Vec<f64>> = vec![Vec::new(); n];

        for leaf in ctx.config.leaf_categories() {
            let mut mask = vec![true; n];
            for cat in ctx.config.category_path(&leaf.name)? {
                let Some(sel) = &cat.selection else { continue };
                let m = CompiledExpr::compile(sel)?.eval_mask(events)?;
                for (a, b) in mask.iter_mut().zip(m) {
                    *a &= b;
                }
            }
            for (ids, _) in lists.iter_mut().zip(&mask).filter(|(_, m)| **m) {
                ids.push(leaf.id as f64);
            }
        }

        events.insert("category_ids", JaggedCol::from_lists(&lists))?;
        Ok(StepOutcome::none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcp_core::AnalysisConfig;

    #[test]
    fn leaves_require_ancestor_selections() {
        let cfg = AnalysisConfig::example();
        let ctx = SelectionContext::new(&cfg, cfg.get_dataset("tt_powheg").unwrap());
        let mut ev = EventBatch::from_json_str(
            r#"{
                "n_jet": [2, 1, 3, 0],
                "Jet.pt": [[40.0, 30.0], [90.0], [75.0, 50.0, 20.0], []]
            }"#,
        )
        .unwrap();
        CategoryIds.call(&mut ev, &ctx).unwrap();

        let ids = ev.jagged("category_ids").unwrap();
        assert_eq!(ids.row(0), &[11.0]);
        // a high-pt jet alone is not enough: cat_c needs two jets
        assert_eq!(ids.row(1), &[20.0]);
        assert_eq!(ids.row(2), &[12.0]);
        assert_eq!(ids.row(3), &[20.0]);
    }
}
