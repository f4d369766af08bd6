//! Analysis variables: expression, binning, and display metadata.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Placeholder for missing per-event values (e.g. the leading jet pt in an
/// event without jets).
pub const EMPTY_FLOAT: f64 = -99999.0;

/// Histogram binning of a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Binning {
    /// `[n_bins, lo, hi]` with equal-width bins.
    Regular(usize, f64, f64),
    /// Explicit, strictly increasing edges.
    Edges {
        /// Bin edges (length = n_bins + 1).
        edges: Vec<f64>,
    },
}

impl Binning {
    /// Number of in-range bins.
    pub fn n_bins(&self) -> usize {
        match self {
            Binning::Regular(n, _, _) => *n,
            Binning::Edges { edges } => edges.len().saturating_sub(1),
        }
    }

    /// Bin edges (length = n_bins + 1).
    pub fn edges(&self) -> Vec<f64> {
        match self {
            Binning::Regular(n, lo, hi) => {
                let width = (hi - lo) / *n as f64;
                (0..=*n).map(|i| lo + width * i as f64).collect()
            }
            Binning::Edges { edges } => edges.clone(),
        }
    }

    /// Check that the binning describes at least one bin with increasing edges.
    pub fn validate(&self) -> Result<()> {
        match self {
            Binning::Regular(n, lo, hi) => {
                if *n == 0 || !(hi > lo) || !lo.is_finite() || !hi.is_finite() {
                    return Err(Error::Validation(format!(
                        "invalid regular binning ({n}, {lo}, {hi})"
                    )));
                }
            }
            Binning::Edges { edges } => {
                if edges.len() < 2 || edges.windows(2).any(|w| !(w[1] > w[0])) {
                    return Err(Error::Validation(format!(
                        "bin edges must be strictly increasing with at least two entries: {edges:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A histogrammable analysis variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Unique name, also used in output file names.
    pub name: String,
    /// Column expression (defaults to the name).
    #[serde(default)]
    pub expression: Option<String>,
    /// Binning.
    pub binning: Binning,
    /// Axis title.
    #[serde(default)]
    pub x_title: Option<String>,
    /// Unit appended to the axis title.
    #[serde(default)]
    pub unit: Option<String>,
    /// Value used when the expression has no entry for an event.
    #[serde(default)]
    pub null_value: Option<f64>,
    /// Integer-valued variable.
    #[serde(default)]
    pub discrete_x: bool,
}

impl Variable {
    /// Create a variable whose expression is its name.
    pub fn new(name: impl Into<String>, binning: Binning) -> Self {
        Self {
            name: name.into(),
            expression: None,
            binning,
            x_title: None,
            unit: None,
            null_value: None,
            discrete_x: false,
        }
    }

    /// Set the expression.
    pub fn expression(mut self, expr: impl Into<String>) -> Self {
        self.expression = Some(expr.into());
        self
    }

    /// Set the axis title.
    pub fn x_title(mut self, title: impl Into<String>) -> Self {
        self.x_title = Some(title.into());
        self
    }

    /// Set the unit.
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set the null value.
    pub fn null_value(mut self, v: f64) -> Self {
        self.null_value = Some(v);
        self
    }

    /// Mark as discrete.
    pub fn discrete(mut self) -> Self {
        self.discrete_x = true;
        self
    }

    /// Expression to evaluate.
    pub fn expr(&self) -> &str {
        self.expression.as_deref().unwrap_or(&self.name)
    }

    /// Null value, defaulting to [`EMPTY_FLOAT`].
    pub fn null(&self) -> f64 {
        self.null_value.unwrap_or(EMPTY_FLOAT)
    }

    /// Axis title with unit, e.g. `Jet 1 pT / GeV`.
    pub fn axis_title(&self) -> String {
        let title = self.x_title.as_deref().unwrap_or(&self.name);
        match &self.unit {
            Some(unit) => format!("{title} / {unit}"),
            None => title.to_string(),
        }
    }
}

/// Variables used by the default analysis setup.
pub fn default_variables() -> Vec<Variable> {
    vec![
        Variable::new("event", Binning::Regular(1, 0.0, 1.0e9)).x_title("Event number").discrete(),
        Variable::new("run", Binning::Regular(1, 100000.0, 500000.0))
            .x_title("Run number")
            .discrete(),
        Variable::new("lumi", Binning::Regular(1, 0.0, 5000.0))
            .expression("luminosityBlock")
            .x_title("Luminosity block")
            .discrete(),
        Variable::new("n_jet", Binning::Regular(11, -0.5, 10.5))
            .x_title("Number of jets")
            .discrete(),
        Variable::new("jets_pt", Binning::Regular(40, 0.0, 400.0))
            .expression("Jet.pt")
            .unit("GeV")
            .x_title("pT of all jets"),
        Variable::new("jet1_pt", Binning::Regular(40, 0.0, 400.0))
            .expression("Jet.pt[:,0]")
            .null_value(EMPTY_FLOAT)
            .unit("GeV")
            .x_title("Jet 1 pT"),
        Variable::new("jet1_eta", Binning::Regular(30, -3.0, 3.0))
            .expression("Jet.eta[:,0]")
            .null_value(EMPTY_FLOAT)
            .x_title("Jet 1 eta"),
        Variable::new("mc_weight", Binning::Regular(200, -10.0, 10.0)).x_title("MC weight"),
        Variable::new("cf_jet1_pt", Binning::Regular(40, 0.0, 400.0))
            .expression("cutflow.jet1_pt")
            .unit("GeV")
            .x_title("Jet 1 pT"),
        Variable::new("muon_eta", Binning::Regular(30, -3.0, 3.0))
            .expression("Muon.eta")
            .null_value(EMPTY_FLOAT)
            .x_title("Raw muon eta"),
        Variable::new("muon_pt", Binning::Regular(40, 0.0, 100.0))
            .expression("Muon.pt")
            .null_value(EMPTY_FLOAT)
            .unit("GeV")
            .x_title("Raw muon pT"),
        Variable::new("muon_phi", Binning::Regular(40, 0.0, 6.28))
            .expression("Muon.phi")
            .null_value(EMPTY_FLOAT)
            .x_title("Raw muon phi"),
    ]
}
