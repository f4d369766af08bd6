//! Analysis configuration: the container resolving names of processes,
//! categories, datasets, shifts, variables and triggers.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::process::Process;
use crate::variable::{Variable, default_variables};
use crate::{Error, Result};

/// A dataset: one input sample with its declared physics content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Unique name.
    pub name: String,
    /// `true` for collision data.
    #[serde(default)]
    pub is_data: bool,
    /// Names of the processes this dataset contains.
    pub processes: Vec<String>,
}

impl Dataset {
    /// Create a dataset.
    pub fn new(name: impl Into<String>, is_data: bool, processes: &[&str]) -> Self {
        Self {
            name: name.into(),
            is_data,
            processes: processes.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// A systematic shift variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    /// Integer identifier used on the `shift` histogram axis.
    pub id: i64,
    /// Unique name (`nominal`, `jec_up`, ...).
    pub name: String,
}

impl Shift {
    /// Create a shift.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// A trigger path evaluated by the trigger selection step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Trigger name (used in auxiliary column names).
    pub name: String,
    /// Boolean event column carrying the trigger decision.
    pub column: String,
    /// Only evaluated for collision data.
    #[serde(default)]
    pub data_only: bool,
}

/// The analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Analysis name.
    pub name: String,
    /// Root processes (each may carry a sub-process tree).
    pub processes: Vec<Process>,
    /// Root categories (each may carry sub-categories).
    pub categories: Vec<Category>,
    /// Datasets.
    #[serde(default)]
    pub datasets: Vec<Dataset>,
    /// Shifts. A `nominal` shift with id 0 is added when missing.
    #[serde(default)]
    pub shifts: Vec<Shift>,
    /// Variables. Defaults to the standard variable set.
    #[serde(default = "default_variables")]
    pub variables: Vec<Variable>,
    /// Trigger paths.
    #[serde(default)]
    pub triggers: Vec<Trigger>,
}

impl AnalysisConfig {
    /// Parse a YAML (or JSON) document and validate it.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let mut cfg: AnalysisConfig = serde_yaml_ng::from_str(text)?;
        cfg.ensure_nominal();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and validate a config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        log::debug!("loading analysis config from {}", path.display());
        Self::from_yaml_str(&text)
    }

    fn ensure_nominal(&mut self) {
        if !self.shifts.iter().any(|s| s.name == "nominal") {
            self.shifts.insert(0, Shift::new(0, "nominal"));
        }
    }

    /// Check name/id uniqueness, dataset process references and binnings.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for p in self.processes.iter().flat_map(|p| p.walk_processes(true)) {
            if !names.insert(p.name.as_str()) {
                return Err(Error::Validation(format!("duplicate process name '{}'", p.name)));
            }
            if !ids.insert(p.id) {
                return Err(Error::Validation(format!("duplicate process id {}", p.id)));
            }
        }

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for c in self.categories.iter().flat_map(|c| c.walk_categories()) {
            if !names.insert(c.name.as_str()) {
                return Err(Error::Validation(format!("duplicate category name '{}'", c.name)));
            }
            if !ids.insert(c.id) {
                return Err(Error::Validation(format!("duplicate category id {}", c.id)));
            }
        }

        let mut names = HashSet::new();
        for d in &self.datasets {
            if !names.insert(d.name.as_str()) {
                return Err(Error::Validation(format!("duplicate dataset '{}'", d.name)));
            }
            if d.processes.is_empty() {
                return Err(Error::Validation(format!("dataset '{}' declares no process", d.name)));
            }
            for p in &d.processes {
                let proc = self.get_process(p)?;
                if proc.is_data != d.is_data {
                    return Err(Error::Validation(format!(
                        "dataset '{}' (is_data={}) declares process '{}' (is_data={})",
                        d.name, d.is_data, p, proc.is_data
                    )));
                }
            }
        }

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for s in &self.shifts {
            if !names.insert(s.name.as_str()) || !ids.insert(s.id) {
                return Err(Error::Validation(format!("duplicate shift '{}' ({})", s.name, s.id)));
            }
        }

        let mut names = HashSet::new();
        for v in &self.variables {
            if !names.insert(v.name.as_str()) {
                return Err(Error::Validation(format!("duplicate variable '{}'", v.name)));
            }
            v.binning.validate()?;
        }
        Ok(())
    }

    /// Resolve a process anywhere in the process trees.
    pub fn get_process(&self, name: &str) -> Result<&Process> {
        self.processes
            .iter()
            .find_map(|p| p.find(name))
            .ok_or_else(|| Error::NotFound { kind: "process", name: name.to_string() })
    }

    /// Resolve a process by id.
    pub fn get_process_by_id(&self, id: i64) -> Option<&Process> {
        self.processes.iter().find_map(|p| p.find_id(id))
    }

    /// Resolve a category anywhere in the category trees.
    pub fn get_category(&self, name: &str) -> Result<&Category> {
        self.categories
            .iter()
            .flat_map(|c| c.walk_categories())
            .find(|c| c.name == name)
            .ok_or_else(|| Error::NotFound { kind: "category", name: name.to_string() })
    }

    /// Ancestor chain of a category, root first, the category itself last.
    pub fn category_path(&self, name: &str) -> Result<Vec<&Category>> {
        self.categories
            .iter()
            .find_map(|c| c.path_to(name))
            .ok_or_else(|| Error::NotFound { kind: "category", name: name.to_string() })
    }

    /// All leaf categories of the config, in tree order.
    pub fn leaf_categories(&self) -> Vec<&Category> {
        self.categories.iter().flat_map(|c| c.leaf_categories_or_self()).collect()
    }

    /// Resolve a dataset.
    pub fn get_dataset(&self, name: &str) -> Result<&Dataset> {
        self.datasets
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| Error::NotFound { kind: "dataset", name: name.to_string() })
    }

    /// Resolve a shift.
    pub fn get_shift(&self, name: &str) -> Result<&Shift> {
        self.shifts
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::NotFound { kind: "shift", name: name.to_string() })
    }

    /// Resolve a variable.
    pub fn get_variable(&self, name: &str) -> Result<&Variable> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| Error::NotFound { kind: "variable", name: name.to_string() })
    }

    /// Processes declared by a dataset.
    pub fn dataset_processes(&self, dataset: &Dataset) -> Result<Vec<&Process>> {
        dataset.processes.iter().map(|p| self.get_process(p)).collect()
    }

    /// `true` if the dataset contains `process`, i.e. one of its declared
    /// processes is `process` or has it in its subtree.
    pub fn dataset_has_process(&self, dataset: &Dataset, process: &Process) -> bool {
        dataset
            .processes
            .iter()
            .filter_map(|name| self.get_process(name).ok())
            .any(|p| p.has_process(process))
    }

    /// Minimal config with one data and two simulated processes, a control
    /// region `cat_c` and a signal region `cat_d`.
    pub fn example() -> Self {
        AnalysisConfig {
            name: "higgs_cp".into(),
            processes: vec![
                Process::new(1, "data", true).label("Data").color("#000000"),
                Process::new(1200, "tt", false)
                    .label("t#bar{t}")
                    .color("#e42536")
                    .add_process(Process::new(1210, "tt_sl", false).selection("n_lep == 1"))
                    .add_process(Process::new(1220, "tt_dl", false).selection("n_lep == 2")),
                Process::new(51000, "dy", false).label("Drell-Yan").color("#5790fc"),
            ],
            categories: vec![
                Category::new(1, "incl")
                    .add_category(
                        Category::new(10, "cat_c")
                            .selection("n_jet >= 2")
                            .label("Control region")
                            .add_category(
                                Category::new(11, "cat_c_lowpt").selection("Jet.pt[:,0] < 60"),
                            )
                            .add_category(
                                Category::new(12, "cat_c_highpt").selection("Jet.pt[:,0] >= 60"),
                            ),
                    )
                    .add_category(Category::new(20, "cat_d").selection("n_jet < 2")),
            ],
            datasets: vec![
                Dataset::new("data_mu_a", true, &["data"]),
                Dataset::new("tt_powheg", false, &["tt"]),
                Dataset::new("dy_amcatnlo", false, &["dy"]),
            ],
            shifts: vec![Shift::new(0, "nominal")],
            variables: default_variables(),
            triggers: vec![Trigger {
                name: "IsoMu24".into(),
                column: "HLT.IsoMu24".into(),
                data_only: false,
            }],
        }
    }
}
