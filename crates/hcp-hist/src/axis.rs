//! Histogram axes.
//!
//! Categorical axes (`process`, `category`, `shift`) hold integer ids and have
//! no flow bins. Binned axes always carry one underflow bin (index 0) and one
//! overflow bin (index `bins + 1`).

use serde::{Deserialize, Serialize};

use hcp_core::{Binning, Error, Result, Variable};

/// One histogram axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Axis {
    /// Integer categories, in insertion order. Grows on fill.
    IntCategory {
        /// Axis name.
        name: String,
        /// Category ids.
        categories: Vec<i64>,
    },
    /// Equal-width bins.
    Regular {
        /// Axis name.
        name: String,
        /// Number of in-range bins.
        bins: usize,
        /// Lower edge.
        lo: f64,
        /// Upper edge.
        hi: f64,
        /// Axis title.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// Explicit bin edges.
    Variable {
        /// Axis name.
        name: String,
        /// Strictly increasing edges.
        edges: Vec<f64>,
        /// Axis title.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
}

impl Axis {
    /// Categorical axis with the given ids.
    pub fn int_category(name: impl Into<String>, categories: Vec<i64>) -> Self {
        Axis::IntCategory { name: name.into(), categories }
    }

    /// Equal-width binned axis.
    pub fn regular(name: impl Into<String>, bins: usize, lo: f64, hi: f64) -> Self {
        Axis::Regular { name: name.into(), bins, lo, hi, label: None }
    }

    /// Binned axis with explicit edges.
    pub fn variable(name: impl Into<String>, edges: Vec<f64>) -> Self {
        Axis::Variable { name: name.into(), edges, label: None }
    }

    /// Binned axis for an analysis variable.
    pub fn from_variable(var: &Variable) -> Self {
        let label = Some(var.axis_title());
        match &var.binning {
            Binning::Regular(bins, lo, hi) => {
                Axis::Regular { name: var.name.clone(), bins: *bins, lo: *lo, hi: *hi, label }
            }
            Binning::Edges { edges } => {
                Axis::Variable { name: var.name.clone(), edges: edges.clone(), label }
            }
        }
    }

    /// Axis name.
    pub fn name(&self) -> &str {
        match self {
            Axis::IntCategory { name, .. }
            | Axis::Regular { name, .. }
            | Axis::Variable { name, .. } => name,
        }
    }

    /// Axis title, if any.
    pub fn label(&self) -> Option<&str> {
        match self {
            Axis::IntCategory { .. } => None,
            Axis::Regular { label, .. } | Axis::Variable { label, .. } => label.as_deref(),
        }
    }

    /// `true` for integer-category axes.
    pub fn is_categorical(&self) -> bool {
        matches!(self, Axis::IntCategory { .. })
    }

    /// Number of in-range bins (categories for categorical axes).
    pub fn n_bins(&self) -> usize {
        match self {
            Axis::IntCategory { categories, .. } => categories.len(),
            Axis::Regular { bins, .. } => *bins,
            Axis::Variable { edges, .. } => edges.len().saturating_sub(1),
        }
    }

    /// Storage extent along this axis, flow bins included.
    pub fn extent(&self) -> usize {
        match self {
            Axis::IntCategory { categories, .. } => categories.len(),
            _ => self.n_bins() + 2,
        }
    }

    /// Bin edges of a binned axis (empty for categorical axes).
    pub fn edges(&self) -> Vec<f64> {
        match self {
            Axis::IntCategory { .. } => Vec::new(),
            Axis::Regular { bins, lo, hi, .. } => {
                let width = (hi - lo) / *bins as f64;
                (0..=*bins).map(|i| lo + width * i as f64).collect()
            }
            Axis::Variable { edges, .. } => edges.clone(),
        }
    }

    /// Position of a category id, if present.
    pub fn index_of(&self, id: i64) -> Option<usize> {
        match self {
            Axis::IntCategory { categories, .. } => categories.iter().position(|&c| c == id),
            _ => None,
        }
    }

    /// Category ids (empty for binned axes).
    pub fn categories(&self) -> &[i64] {
        match self {
            Axis::IntCategory { categories, .. } => categories,
            _ => &[],
        }
    }

    /// Flow-inclusive storage index of `value` on a binned axis.
    ///
    /// Values below the first edge go to the underflow (0), values at or above
    /// the last edge and NaN to the overflow (`bins + 1`).
    pub fn bin_index(&self, value: f64) -> usize {
        match self {
            Axis::IntCategory { .. } => 0,
            Axis::Regular { bins, lo, hi, .. } => {
                if value.is_nan() || value >= *hi {
                    bins + 1
                } else if value < *lo {
                    0
                } else {
                    let idx = ((value - lo) / (hi - lo) * *bins as f64) as usize;
                    idx.min(bins - 1) + 1
                }
            }
            Axis::Variable { edges, .. } => {
                let n = edges.len() - 1;
                if value.is_nan() || value >= edges[n] {
                    n + 1
                } else if value < edges[0] {
                    0
                } else {
                    // edges[k] <= value < edges[k + 1]
                    edges.partition_point(|&e| e <= value)
                }
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Axis::IntCategory { name, categories } => {
                let mut seen = categories.clone();
                seen.sort_unstable();
                seen.dedup();
                if seen.len() != categories.len() {
                    return Err(Error::Histogram(format!("axis '{name}' has duplicate ids")));
                }
            }
            Axis::Regular { name, bins, lo, hi, .. } => {
                if *bins == 0 || !(hi > lo) {
                    return Err(Error::Histogram(format!(
                        "axis '{name}': invalid regular binning ({bins}, {lo}, {hi})"
                    )));
                }
            }
            Axis::Variable { name, edges, .. } => {
                if edges.len() < 2 || edges.windows(2).any(|w| !(w[1] > w[0])) {
                    return Err(Error::Histogram(format!(
                        "axis '{name}': edges must be strictly increasing"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Same name, kind and binning (categorical ids included).
    pub fn is_compatible(&self, other: &Axis) -> bool {
        match (self, other) {
            (
                Axis::IntCategory { name: a, categories: ca },
                Axis::IntCategory { name: b, categories: cb },
            ) => a == b && ca == cb,
            (Axis::IntCategory { .. }, _) | (_, Axis::IntCategory { .. }) => false,
            _ => self.name() == other.name() && self.edges() == other.edges(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_bin_lookup_with_flow() {
        let a = Axis::regular("x", 4, 0.0, 2.0);
        assert_eq!(a.extent(), 6);
        assert_eq!(a.bin_index(-0.1), 0);
        assert_eq!(a.bin_index(0.0), 1);
        assert_eq!(a.bin_index(0.49), 1);
        assert_eq!(a.bin_index(0.5), 2);
        assert_eq!(a.bin_index(1.99), 4);
        assert_eq!(a.bin_index(2.0), 5);
        assert_eq!(a.bin_index(f64::NAN), 5);
    }

    #[test]
    fn variable_bin_lookup_with_flow() {
        let a = Axis::variable("x", vec![0.0, 1.0, 5.0]);
        assert_eq!(a.extent(), 4);
        assert_eq!(a.bin_index(-99999.0), 0);
        assert_eq!(a.bin_index(0.0), 1);
        assert_eq!(a.bin_index(1.0), 2);
        assert_eq!(a.bin_index(4.9), 2);
        assert_eq!(a.bin_index(5.0), 3);
    }

    #[test]
    fn categorical_axis_has_no_flow() {
        let a = Axis::int_category("process", vec![1, 1200]);
        assert_eq!(a.extent(), 2);
        assert_eq!(a.index_of(1200), Some(1));
        assert_eq!(a.index_of(7), None);
        assert!(a.edges().is_empty());
    }

    #[test]
    fn axis_serde_is_tagged() {
        let a = Axis::regular("jet1_pt", 2, 0.0, 1.0);
        let s = serde_json::to_string(&a).unwrap();
        assert!(s.contains(r#""type":"regular""#));
        let back: Axis = serde_json::from_str(&s).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn from_variable_keeps_binning_and_title() {
        let v = Variable::new("m", Binning::Edges { edges: vec![0.0, 10.0, 50.0] }).unit("GeV");
        let a = Axis::from_variable(&v);
        assert_eq!(a.n_bins(), 2);
        assert_eq!(a.label(), Some("m / GeV"));
    }
}
