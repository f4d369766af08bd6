//! Per-process stack artifacts (numbers-first).
//!
//! One artifact describes one (category, variable) plot: the binning, the
//! yields of every process in display order, an optional estimated
//! background, and observed data points with asymmetric error bars.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::{Result, VizError};

/// Schema identifier written into every artifact.
pub const SCHEMA_VERSION: &str = "higgscp_process_stack_v1";

/// Provenance block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Producing tool
    pub tool: String,
    /// Producing tool version
    pub tool_version: String,
    /// Creation time (ms since the Unix epoch)
    pub created_unix_ms: u128,
    /// sha256 of every input histogram file, keyed by dataset name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_sha256: BTreeMap<String, String>,
}

impl ArtifactMeta {
    /// Metadata stamped with the current time.
    pub fn now() -> Result<Self> {
        Ok(Self {
            tool: "higgscp".to_string(),
            tool_version: hcp_core::VERSION.to_string(),
            created_unix_ms: now_unix_ms()?,
            input_sha256: BTreeMap::new(),
        })
    }
}

/// The plotted variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    /// Variable name
    pub name: String,
    /// Axis title
    pub title: String,
    /// Unit appended to the axis title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl VariableInfo {
    /// `title [unit]`, or just the title.
    pub fn axis_label(&self) -> String {
        match &self.unit {
            Some(u) if !u.is_empty() => format!("{} [{}]", self.title, u),
            _ => self.title.clone(),
        }
    }
}

/// The plotted category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    /// Category name
    pub name: String,
    /// Display label
    pub label: String,
}

/// Yields of one process, without flow bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSeries {
    /// Process name
    pub name: String,
    /// Display label
    pub label: String,
    /// Observed data rather than simulation
    pub is_data: bool,
    /// Preferred color (`#rrggbb`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Per-bin yields
    pub y: Vec<f64>,
}

/// Observed data points with asymmetric errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoints {
    /// Per-bin observed yields
    pub y: Vec<f64>,
    /// Downward error
    pub yerr_lo: Vec<f64>,
    /// Upward error
    pub yerr_hi: Vec<f64>,
    /// `garwood_poisson_68` or `sqrt_y_fallback`
    pub error_model: String,
}

impl DataPoints {
    /// Points for `y` with [`data_errors`].
    pub fn from_yields(y: Vec<f64>) -> Self {
        let (yerr_lo, yerr_hi, error_model) = data_errors(&y);
        Self { y, yerr_lo, yerr_hi, error_model }
    }
}

/// A stacked per-process plot for one category and variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStackArtifact {
    /// [`SCHEMA_VERSION`]
    pub schema_version: String,
    /// Provenance
    pub meta: ArtifactMeta,
    /// Plotted variable
    pub variable: VariableInfo,
    /// Plotted category
    pub category: CategoryInfo,
    /// `n_bins + 1` edges
    pub bin_edges: Vec<f64>,
    /// Requested processes in caller order
    pub series: Vec<ProcessSeries>,
    /// Data-driven background estimate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<ProcessSeries>,
    /// Sum of the data series, with error bars
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataPoints>,
}

impl ProcessStackArtifact {
    /// Empty artifact for the given binning.
    pub fn new(
        meta: ArtifactMeta,
        variable: VariableInfo,
        category: CategoryInfo,
        bin_edges: Vec<f64>,
    ) -> Result<Self> {
        if bin_edges.len() < 2 {
            return Err(VizError::Artifact(format!(
                "variable '{}' needs at least two bin edges",
                variable.name
            )));
        }
        if bin_edges.windows(2).any(|w| w[1] <= w[0]) {
            return Err(VizError::Artifact(format!(
                "bin edges of '{}' are not strictly increasing",
                variable.name
            )));
        }
        Ok(Self {
            schema_version: SCHEMA_VERSION.to_string(),
            meta,
            variable,
            category,
            bin_edges,
            series: Vec::new(),
            estimate: None,
            data: None,
        })
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.bin_edges.len() - 1
    }

    fn check_len(&self, s: &ProcessSeries) -> Result<()> {
        if s.y.len() != self.n_bins() {
            return Err(VizError::Artifact(format!(
                "series '{}' has {} bins, expected {}",
                s.name,
                s.y.len(),
                self.n_bins()
            )));
        }
        Ok(())
    }

    /// Append a process series.
    pub fn push_series(&mut self, series: ProcessSeries) -> Result<()> {
        self.check_len(&series)?;
        self.series.push(series);
        Ok(())
    }

    /// Set the estimated background series.
    pub fn set_estimate(&mut self, series: ProcessSeries) -> Result<()> {
        self.check_len(&series)?;
        self.estimate = Some(series);
        Ok(())
    }

    /// Sum the data series into [`DataPoints`]. No-op without data series.
    pub fn finalize_data(&mut self) {
        let mut sum: Option<Vec<f64>> = None;
        for s in self.series.iter().filter(|s| s.is_data) {
            let acc = sum.get_or_insert_with(|| vec![0.0; s.y.len()]);
            for (a, v) in acc.iter_mut().zip(&s.y) {
                *a += v;
            }
        }
        self.data = sum.map(DataPoints::from_yields);
    }

    /// Simulated series, in stacking order (bottom first).
    pub fn simulated(&self) -> impl Iterator<Item = &ProcessSeries> {
        self.series.iter().filter(|s| !s.is_data)
    }

    /// Per-bin total of the simulated stack, estimate included.
    pub fn stack_total(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.n_bins()];
        for s in self.simulated().chain(self.estimate.iter()) {
            for (t, v) in total.iter_mut().zip(&s.y) {
                *t += v;
            }
        }
        total
    }

    /// Pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn now_unix_ms() -> Result<u128> {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| VizError::Computation(format!("system time error: {e}")))?;
    Ok(d.as_millis())
}

fn near_integer_count(x: f64) -> Option<u64> {
    if !(x.is_finite() && x >= 0.0) {
        return None;
    }
    let r = x.round();
    if (x - r).abs() <= 1e-9 { Some(r as u64) } else { None }
}

/// Central 68.27% Garwood interval for a Poisson count `n`, returned as
/// `(down, up)` distances from `n`.
pub fn garwood_68_interval(n: u64) -> (f64, f64) {
    let alpha = 0.31731_f64;
    let quantile = |dof: f64, p: f64| {
        ChiSquared::new(dof).map(|d| d.inverse_cdf(p)).unwrap_or(f64::NAN)
    };
    let lo = if n == 0 { 0.0 } else { n as f64 - 0.5 * quantile(2.0 * n as f64, alpha / 2.0) };
    let hi = 0.5 * quantile(2.0 * (n + 1) as f64, 1.0 - alpha / 2.0) - n as f64;
    (lo, hi)
}

/// Error bars for observed yields: Garwood for integer counts, `sqrt(y)`
/// otherwise. The model is `garwood_poisson_68` only if every bin is an
/// integer count.
pub fn data_errors(y: &[f64]) -> (Vec<f64>, Vec<f64>, String) {
    let mut lo = Vec::with_capacity(y.len());
    let mut hi = Vec::with_capacity(y.len());
    let mut all_poisson = true;
    for &v in y {
        if let Some(n) = near_integer_count(v) {
            let (dl, dh) = garwood_68_interval(n);
            lo.push(dl);
            hi.push(dh);
        } else {
            all_poisson = false;
            let e = if v.is_finite() && v > 0.0 { v.sqrt() } else { 0.0 };
            lo.push(e);
            hi.push(e);
        }
    }
    let model = if all_poisson { "garwood_poisson_68" } else { "sqrt_y_fallback" };
    (lo, hi, model.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn artifact() -> ProcessStackArtifact {
        ProcessStackArtifact::new(
            ArtifactMeta::now().unwrap(),
            VariableInfo {
                name: "jet1_pt".into(),
                title: "Leading jet pt".into(),
                unit: Some("GeV".into()),
            },
            CategoryInfo { name: "cat_c".into(), label: "Control region".into() },
            vec![0.0, 50.0, 100.0],
        )
        .unwrap()
    }

    fn series(name: &str, is_data: bool, y: Vec<f64>) -> ProcessSeries {
        ProcessSeries { name: name.into(), label: name.into(), is_data, color: None, y }
    }

    #[test]
    fn garwood_known_values() {
        let (lo, hi) = garwood_68_interval(0);
        assert_relative_eq!(lo, 0.0);
        assert_relative_eq!(hi, 1.8410, epsilon = 1e-3);
        let (lo, hi) = garwood_68_interval(10);
        assert_relative_eq!(lo, 3.1087, epsilon = 1e-3);
        assert_relative_eq!(hi, 4.2670, epsilon = 1e-3);
    }

    #[test]
    fn fractional_counts_fall_back_to_sqrt() {
        let (lo, hi, model) = data_errors(&[4.0, 2.25]);
        assert_eq!(model, "sqrt_y_fallback");
        assert_relative_eq!(lo[1], 1.5);
        assert_relative_eq!(hi[1], 1.5);
        assert!(hi[0] > lo[0]);
    }

    #[test]
    fn data_points_sum_data_series() {
        let mut a = artifact();
        a.push_series(series("data", true, vec![5.0, 3.0])).unwrap();
        a.push_series(series("tt", false, vec![1.0, 1.0])).unwrap();
        a.finalize_data();
        let data = a.data.as_ref().unwrap();
        assert_eq!(data.y, vec![5.0, 3.0]);
        assert_eq!(data.error_model, "garwood_poisson_68");
        assert_eq!(a.simulated().count(), 1);
    }

    #[test]
    fn series_length_is_checked() {
        let mut a = artifact();
        assert!(a.push_series(series("tt", false, vec![1.0])).is_err());
        assert!(a.set_estimate(series("qcd", false, vec![1.0, 2.0, 3.0])).is_err());
    }

    #[test]
    fn stack_total_includes_estimate() {
        let mut a = artifact();
        a.push_series(series("tt", false, vec![1.0, 2.0])).unwrap();
        a.set_estimate(series("qcd", false, vec![0.5, 0.0])).unwrap();
        assert_eq!(a.stack_total(), vec![1.5, 2.0]);
        assert_eq!(a.variable.axis_label(), "Leading jet pt [GeV]");
    }

    #[test]
    fn bad_edges_are_rejected() {
        let v = VariableInfo { name: "x".into(), title: "x".into(), unit: None };
        let c = CategoryInfo { name: "c".into(), label: "c".into() };
        let meta = ArtifactMeta::now().unwrap();
        assert!(ProcessStackArtifact::new(meta.clone(), v.clone(), c.clone(), vec![1.0]).is_err());
        assert!(ProcessStackArtifact::new(meta, v, c, vec![0.0, 1.0, 1.0]).is_err());
    }
}
