//! Selection result: named step masks, the combined event mask and
//! auxiliary per-event columns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hcp_core::{Error, Result};

/// Key of the combined event mask in [`SelectionResult::main`].
pub const EVENT_MASK: &str = "event";

/// One named per-event selection criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMask {
    /// Step name.
    pub name: String,
    /// Per-event decision.
    pub mask: Vec<bool>,
}

/// Output of a selection over one event batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Step masks in the order they were added.
    pub steps: Vec<StepMask>,
    /// Main masks; holds [`EVENT_MASK`] once the selection is finalized.
    pub main: BTreeMap<String, Vec<bool>>,
    /// Auxiliary per-event values.
    #[serde(default)]
    pub aux: BTreeMap<String, Vec<f64>>,
}

impl SelectionResult {
    /// Empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named step mask. Step names are unique.
    pub fn add_step(&mut self, name: impl Into<String>, mask: Vec<bool>) -> Result<()> {
        let name = name.into();
        if self.step(&name).is_some() {
            return Err(Error::Validation(format!("duplicate selection step '{name}'")));
        }
        if let Some(first) = self.steps.first()
            && first.mask.len() != mask.len()
        {
            return Err(Error::Validation(format!(
                "step '{name}' has {} entries, expected {}",
                mask.len(),
                first.mask.len()
            )));
        }
        self.steps.push(StepMask { name, mask });
        Ok(())
    }

    /// Mask of a named step.
    pub fn step(&self, name: &str) -> Option<&[bool]> {
        self.steps.iter().find(|s| s.name == name).map(|s| s.mask.as_slice())
    }

    /// Step names in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// Set an auxiliary column.
    pub fn set_aux(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.aux.insert(name.into(), values);
    }

    /// Merge another result into this one (steps appended, maps extended).
    pub fn merge(&mut self, other: SelectionResult) -> Result<()> {
        for s in other.steps {
            self.add_step(s.name, s.mask)?;
        }
        self.main.extend(other.main);
        self.aux.extend(other.aux);
        Ok(())
    }

    /// Join results of consecutive event chunks. Every part must have the
    /// same steps, main masks and auxiliary columns.
    pub fn concat(parts: Vec<SelectionResult>) -> Result<SelectionResult> {
        let mut parts = parts.into_iter();
        let Some(mut out) = parts.next() else {
            return Ok(SelectionResult::new());
        };
        for part in parts {
            if part.step_names() != out.step_names()
                || !part.main.keys().eq(out.main.keys())
                || !part.aux.keys().eq(out.aux.keys())
            {
                return Err(Error::Validation(
                    "cannot concatenate selection results with different layouts".to_string(),
                ));
            }
            for (dst, src) in out.steps.iter_mut().zip(part.steps) {
                dst.mask.extend(src.mask);
            }
            for (k, v) in part.main {
                out.main.entry(k).or_default().extend(v);
            }
            for (k, v) in part.aux {
                out.aux.entry(k).or_default().extend(v);
            }
        }
        Ok(out)
    }

    /// Logical AND of all step masks. All-true when there are no steps.
    pub fn combined_mask(&self, n_events: usize) -> Vec<bool> {
        let mut out = vec![true; n_events];
        for s in &self.steps {
            for (o, &m) in out.iter_mut().zip(&s.mask) {
                *o &= m;
            }
        }
        out
    }

    /// Store the combined mask under `main["event"]` and return it.
    pub fn finalize(&mut self, n_events: usize) -> Vec<bool> {
        let mask = self.combined_mask(n_events);
        self.main.insert(EVENT_MASK.to_string(), mask.clone());
        mask
    }

    /// The combined event mask, once finalized.
    pub fn event_mask(&self) -> Option<&[bool]> {
        self.main.get(EVENT_MASK).map(|m| m.as_slice())
    }

    /// Number of selected events, once finalized.
    pub fn n_selected(&self) -> usize {
        self.event_mask().map_or(0, |m| m.iter().filter(|x| **x).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_mask_is_and_of_steps() {
        let mut r = SelectionResult::new();
        r.add_step("trigger", vec![true, true, false, true]).unwrap();
        r.add_step("jets", vec![true, false, true, true]).unwrap();
        assert_eq!(r.finalize(4), vec![true, false, false, true]);
        assert_eq!(r.n_selected(), 2);
        assert_eq!(r.step_names(), vec!["trigger", "jets"]);
    }

    #[test]
    fn no_steps_selects_everything() {
        let mut r = SelectionResult::new();
        assert_eq!(r.finalize(3), vec![true; 3]);
    }

    #[test]
    fn merge_rejects_duplicate_steps() {
        let mut a = SelectionResult::new();
        a.add_step("trigger", vec![true]).unwrap();
        let mut b = SelectionResult::new();
        b.add_step("trigger", vec![false]).unwrap();
        assert!(a.merge(b).is_err());
    }

    #[test]
    fn concat_joins_chunks() {
        let mut a = SelectionResult::new();
        a.add_step("trigger", vec![true, false]).unwrap();
        a.set_aux("w", vec![1.0, 2.0]);
        a.finalize(2);
        let mut b = SelectionResult::new();
        b.add_step("trigger", vec![true]).unwrap();
        b.set_aux("w", vec![3.0]);
        b.finalize(1);

        let r = SelectionResult::concat(vec![a.clone(), b]).unwrap();
        assert_eq!(r.step("trigger"), Some(&[true, false, true][..]));
        assert_eq!(r.event_mask(), Some(&[true, false, true][..]));
        assert_eq!(r.aux["w"], vec![1.0, 2.0, 3.0]);

        let mut c = SelectionResult::new();
        c.add_step("jets", vec![true]).unwrap();
        assert!(SelectionResult::concat(vec![a, c]).is_err());
    }

    #[test]
    fn step_length_must_match() {
        let mut r = SelectionResult::new();
        r.add_step("a", vec![true, false]).unwrap();
        assert!(r.add_step("b", vec![true]).is_err());
    }
}
