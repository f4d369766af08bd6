//! Kinematic helpers for object collections.

use hcp_core::{Error, Result};
use hcp_events::{EventBatch, JaggedCol};

use crate::step::{SelectionContext, Selector, StepOutcome};

/// Attaches `px`, `py`, `pz` and `energy` to every collection carrying
/// `pt`, `eta` and `phi` (`mass` optional), and an `n_<collection>` count
/// column for every collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachBehavior;

impl Selector for AttachBehavior {
    fn name(&self) -> &str {
        "attach_behavior"
    }

    fn uses(&self) -> Vec<String> {
        ["*.pt", "*.eta", "*.phi", "*.mass"].iter().map(|s| s.to_string()).collect()
    }

    fn produces(&self) -> Vec<String> {
        ["*.px", "*.py", "*.pz", "*.energy", "n_*"].iter().map(|s| s.to_string()).collect()
    }

    fn call(&self, events: &mut EventBatch, _ctx: &SelectionContext<'_>) -> Result<StepOutcome> {
        for (coll, fields) in events.collections() {
            let first = events.jagged(&format!("{coll}.{}", fields[0]))?;
            let offsets = first.offsets.clone();
            for f in &fields[1..] {
                if events.jagged(&format!("{coll}.{f}"))?.offsets != offsets {
                    return Err(Error::Validation(format!(
                        "collection '{coll}': field '{f}' has a different object count"
                    )));
                }
            }

            let count = format!("n_{}", coll.to_lowercase());
            if !events.has(&count) {
                let counts: Vec<f64> = first.counts().into_iter().map(|c| c as f64).collect();
                events.insert(count, counts)?;
            }

            let has = |f: &str| fields.iter().any(|x| x == f);
            if !(has("pt") && has("eta") && has("phi")) {
                continue;
            }
            let pt = events.jagged(&format!("{coll}.pt"))?;
            let eta = events.jagged(&format!("{coll}.eta"))?;
            let phi = events.jagged(&format!("{coll}.phi"))?;
            let mass = if has("mass") { Some(events.jagged(&format!("{coll}.mass"))?) } else { None };

            let n = pt.flat.len();
            let mut px = Vec::with_capacity(n);
            let mut py = Vec::with_capacity(n);
            let mut pz = Vec::with_capacity(n);
            let mut energy = Vec::with_capacity(n);
            for i in 0..n {
                let (p_t, h, f) = (pt.flat[i], eta.flat[i], phi.flat[i]);
                let m = mass.map_or(0.0, |m| m.flat[i]);
                let z = p_t * h.sinh();
                px.push(p_t * f.cos());
                py.push(p_t * f.sin());
                pz.push(z);
                energy.push((p_t * p_t + z * z + m * m).sqrt());
            }

            for (field, flat) in [("px", px), ("py", py), ("pz", pz), ("energy", energy)] {
                let col = JaggedCol { flat, offsets: offsets.clone() };
                events.insert(format!("{coll}.{field}"), col)?;
            }
            log::debug!("attached four-vector components to '{coll}'");
        }
        Ok(StepOutcome::none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hcp_core::AnalysisConfig;

    #[test]
    fn attaches_components_and_counts() {
        let cfg = AnalysisConfig::example();
        let ds = cfg.get_dataset("tt_powheg").unwrap();
        let ctx = SelectionContext::new(&cfg, ds);
        let mut ev = EventBatch::from_json_str(
            r#"{
                "Jet.pt": [[10.0], []],
                "Jet.eta": [[0.0], []],
                "Jet.phi": [[0.0], []],
                "Jet.mass": [[3.0], []],
                "Tau.decayMode": [[1, 10], [0]]
            }"#,
        )
        .unwrap();
        let out = AttachBehavior.call(&mut ev, &ctx).unwrap();
        assert!(out.masks.is_empty());

        assert_eq!(ev.scalar("n_jet").unwrap(), &[1.0, 0.0]);
        assert_eq!(ev.scalar("n_tau").unwrap(), &[2.0, 1.0]);
        assert_relative_eq!(ev.jagged("Jet.px").unwrap().flat[0], 10.0);
        assert_relative_eq!(ev.jagged("Jet.pz").unwrap().flat[0], 0.0);
        assert_relative_eq!(ev.jagged("Jet.energy").unwrap().flat[0], 109.0_f64.sqrt());
        assert!(!ev.has("Tau.px"));
    }

    #[test]
    fn inconsistent_collection_fails() {
        let cfg = AnalysisConfig::example();
        let ds = cfg.get_dataset("tt_powheg").unwrap();
        let ctx = SelectionContext::new(&cfg, ds);
        let mut ev = EventBatch::from_json_str(
            r#"{"Jet.pt": [[10.0], []], "Jet.eta": [[], [1.0]]}"#,
        )
        .unwrap();
        assert!(AttachBehavior.call(&mut ev, &ctx).is_err());
    }
}
