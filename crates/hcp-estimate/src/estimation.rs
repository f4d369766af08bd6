//! QCD multijet estimation by subtraction of simulated processes from data.
//!
//! For one (category, variable) branch the requested processes are gathered
//! from the per-dataset histograms, reduced to `[shift, <variable>]`, and
//! combined into a non-negative estimate:
//!
//! ```text
//! qcd = max(0, sum(data) - sum(simulation))      per bin, flow included
//! ```
//!
//! The variance of the estimate is set to zero.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use hcp_core::{AnalysisConfig, Category, Dataset, Error, Process, Result, Shift};
use hcp_hist::{CATEGORY_AXIS, Histogram, PROCESS_AXIS, SHIFT_AXIS};
use hcp_viz::{VizConfig, render_svg};

use crate::branch::{Branch, BranchOrder, create_branch_map};
use crate::outputs::{PlotFormat, StagedOutputs, plot_stem, qcd_histogram_name};
use crate::plot::build_stack_artifact;
use crate::region::RegionSelector;
use crate::shift::ShiftRequest;
use crate::source::{HistogramSource, LoadedHistogram};

/// Histogram accumulated for one requested process.
#[derive(Debug, Clone)]
pub struct ProcessHistogram<'a> {
    /// The requested process
    pub process: &'a Process,
    /// `[shift, <variable>]` histogram summed over datasets
    pub hist: Histogram,
}

/// Output of [`collect_process_histograms`].
#[derive(Debug, Clone)]
pub struct CollectedHistograms<'a> {
    /// One entry per process that received any histogram, in caller order
    pub hists: Vec<ProcessHistogram<'a>>,
    /// sha256 of every loaded input file, keyed by dataset
    pub input_sha256: BTreeMap<String, String>,
}

fn no_histograms() -> Error {
    Error::NoHistograms(
        "no histograms found to plot; possible reasons:\n  \
         - requested variable requires columns that were missing during histogramming\n  \
         - selected --processes did not match any value on the process axis of the input \
         histogram"
            .to_string(),
    )
}

/// Gather one histogram per requested process for `category` and `variable`.
///
/// A dataset contributes to a process when it contains the process or one
/// of its sub-processes. Its histogram is restricted to the ids of the
/// process subtree, the leaf categories of `category` and the requested
/// shifts (ids missing from an axis are skipped), then summed over the
/// `process` and `category` axes. Each dataset is loaded at most once.
pub fn collect_process_histograms<'a>(
    config: &AnalysisConfig,
    source: &dyn HistogramSource,
    datasets: &[&Dataset],
    processes: &[&'a Process],
    category: &Category,
    variable: &str,
    shifts: &[&Shift],
) -> Result<CollectedHistograms<'a>> {
    let category_ids: Vec<i64> =
        category.leaf_categories_or_self().iter().map(|c| c.id).collect();
    let shift_ids: Vec<i64> = shifts.iter().map(|s| s.id).collect();

    let mut loaded: HashMap<&str, LoadedHistogram> = HashMap::new();
    let mut hists = Vec::with_capacity(processes.len());

    for &process in processes {
        let sub_processes = process.walk_processes(true);
        let process_ids: Vec<i64> = sub_processes.iter().map(|p| p.id).collect();
        let mut acc: Option<Histogram> = None;

        for &dataset in datasets {
            if !sub_processes.iter().any(|p| config.dataset_has_process(dataset, p)) {
                continue;
            }
            if !loaded.contains_key(dataset.name.as_str()) {
                let h = source.load(&dataset.name, variable)?;
                loaded.insert(dataset.name.as_str(), h);
            }
            let h = loaded[dataset.name.as_str()]
                .hist
                .select(PROCESS_AXIS, &process_ids)?
                .select(CATEGORY_AXIS, &category_ids)?
                .select(SHIFT_AXIS, &shift_ids)?
                .sum_axis(PROCESS_AXIS)?
                .sum_axis(CATEGORY_AXIS)?;
            match acc.as_mut() {
                Some(a) => a.add(&h)?,
                None => acc = Some(h),
            }
        }

        match acc {
            Some(hist) => hists.push(ProcessHistogram { process, hist }),
            None => log::debug!("process '{}': no contributing dataset", process.name),
        }
    }

    if hists.is_empty() {
        return Err(no_histograms());
    }
    let input_sha256 = loaded
        .into_iter()
        .filter_map(|(name, h)| h.sha256.map(|s| (name.to_string(), s)))
        .collect();
    Ok(CollectedHistograms { hists, input_sha256 })
}

/// Data minus simulation, clamped at zero, with zero variance.
///
/// The result has the axes of the first histogram. All histograms must have
/// the same axes.
pub fn estimate_background(hists: &[ProcessHistogram<'_>]) -> Result<Histogram> {
    let first = hists.first().ok_or_else(no_histograms)?;
    let mut values = vec![0.0; first.hist.values_flow().len()];

    for ph in hists {
        if !ph.hist.is_compatible(&first.hist) {
            return Err(Error::Histogram(format!(
                "histogram of process '{}' has shape {:?}, expected {:?}",
                ph.process.name,
                ph.hist.shape(),
                first.hist.shape()
            )));
        }
        let sign = if ph.process.is_data { 1.0 } else { -1.0 };
        for (v, x) in values.iter_mut().zip(ph.hist.values_flow()) {
            *v += sign * x;
        }
    }

    let mut negative = 0usize;
    for v in values.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
            negative += 1;
        }
    }
    if negative > 0 {
        log::debug!("clamped {negative} negative bins of the estimate to zero");
    }

    let n = values.len();
    let mut qcd = first.hist.clone();
    qcd.set_values_flow(values)?;
    qcd.set_variances_flow(vec![0.0; n])?;
    Ok(qcd)
}

fn default_formats() -> Vec<PlotFormat> {
    vec![PlotFormat::Svg]
}

/// Settings of an estimation run (YAML).
///
/// ```yaml
/// datasets: [data_mu_a, tt_powheg, dy_amcatnlo]
/// processes: [data, tt, dy]
/// categories: [cat_c, cat_d]
/// variables: [jet1_pt]
/// shifts: nominal
/// region: {category: cat_c}
/// branch_order: variable_major
/// formats: [svg, json]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimationSettings {
    /// Input datasets
    pub datasets: Vec<String>,
    /// Requested processes, in plotting order
    pub processes: Vec<String>,
    /// Categories of the branch map
    pub categories: Vec<String>,
    /// Variables of the branch map
    pub variables: Vec<String>,
    /// Shifts to extract
    #[serde(default)]
    pub shifts: ShiftRequest,
    /// Categories that produce artifacts
    #[serde(default)]
    pub region: RegionSelector,
    /// Branch map nesting
    #[serde(default)]
    pub branch_order: BranchOrder,
    /// Plot formats
    #[serde(default = "default_formats")]
    pub formats: Vec<PlotFormat>,
}

impl EstimationSettings {
    /// Parse YAML settings.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Read a settings file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Check that every name resolves in `config`.
    pub fn validate(&self, config: &AnalysisConfig) -> Result<()> {
        for (what, list) in [
            ("datasets", &self.datasets),
            ("processes", &self.processes),
            ("categories", &self.categories),
            ("variables", &self.variables),
        ] {
            if list.is_empty() {
                return Err(Error::Validation(format!("no {what} requested")));
            }
        }
        for d in &self.datasets {
            config.get_dataset(d)?;
        }
        for p in &self.processes {
            config.get_process(p)?;
        }
        for c in &self.categories {
            config.get_category(c)?;
        }
        for v in &self.variables {
            config.get_variable(v)?;
        }
        self.shifts.resolve(config)?;
        Ok(())
    }
}

/// Result of one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchOutcome {
    /// The category is outside the region; nothing was loaded or written.
    Skipped,
    /// Published files.
    Produced {
        /// Paths in the output directory
        paths: Vec<PathBuf>,
    },
}

/// Runs the estimation branch by branch.
pub struct DataDrivenEstimation<'a, S: HistogramSource> {
    config: &'a AnalysisConfig,
    settings: EstimationSettings,
    source: S,
    viz: VizConfig,
    output_dir: PathBuf,
}

impl<'a, S: HistogramSource> DataDrivenEstimation<'a, S> {
    /// Validate `settings` against `config`.
    pub fn new(
        config: &'a AnalysisConfig,
        settings: EstimationSettings,
        source: S,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        settings.validate(config)?;
        Ok(Self {
            config,
            settings,
            source,
            viz: VizConfig::default(),
            output_dir: output_dir.into(),
        })
    }

    /// Use a plot configuration other than the default.
    pub fn with_viz(mut self, viz: VizConfig) -> Self {
        self.viz = viz;
        self
    }

    /// Settings in use.
    pub fn settings(&self) -> &EstimationSettings {
        &self.settings
    }

    /// Output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The branch map.
    pub fn branches(&self) -> Vec<Branch> {
        create_branch_map(
            &self.settings.categories,
            &self.settings.variables,
            self.settings.branch_order,
        )
    }

    /// Run one branch. Outputs are published together or not at all.
    pub fn run_branch(&self, branch: &Branch) -> Result<BranchOutcome> {
        let cfg = self.config;
        let category = cfg.get_category(&branch.category)?;
        if !self.settings.region.matches(&category.name) {
            log::info!("{branch}: category outside region '{}', skipped", self.settings.region);
            return Ok(BranchOutcome::Skipped);
        }
        let variable = cfg.get_variable(&branch.variable)?;
        let datasets =
            self.settings.datasets.iter().map(|d| cfg.get_dataset(d)).collect::<Result<Vec<_>>>()?;
        let processes = self
            .settings
            .processes
            .iter()
            .map(|p| cfg.get_process(p))
            .collect::<Result<Vec<_>>>()?;
        let shifts = self.settings.shifts.resolve(cfg)?;

        let collected = collect_process_histograms(
            cfg,
            &self.source,
            &datasets,
            &processes,
            category,
            &variable.name,
            &shifts,
        )?;
        let qcd = estimate_background(&collected.hists)?;
        log::info!("{branch}: estimate sum {:.3}", qcd.sum());

        let mut staged = StagedOutputs::begin(&self.output_dir)?;
        staged.write(
            &qcd_histogram_name(&category.name, &variable.name),
            serde_json::to_string_pretty(&qcd)?.as_bytes(),
        )?;
        if !self.settings.formats.is_empty() {
            let artifact = build_stack_artifact(
                category,
                variable,
                &collected.hists,
                &qcd,
                collected.input_sha256.clone(),
            )?;
            let stem = plot_stem(&self.settings.processes, &category.name, &variable.name);
            for &format in &self.settings.formats {
                let body = match format {
                    PlotFormat::Svg => render_svg(&artifact, &self.viz)?,
                    PlotFormat::Json => artifact.to_json_string()?,
                };
                staged.write(&format!("{stem}.{}", format.ext()), body.as_bytes())?;
            }
        }
        let paths = staged.commit()?;
        for p in &paths {
            log::info!("{branch}: wrote {}", p.display());
        }
        Ok(BranchOutcome::Produced { paths })
    }

    /// Run every branch in map order. A failing branch does not stop the
    /// others.
    pub fn run_all(&self) -> Vec<(Branch, Result<BranchOutcome>)> {
        self.branches()
            .into_iter()
            .map(|b| {
                let r = self.run_branch(&b);
                if let Err(e) = &r {
                    log::warn!("{b}: {e}");
                }
                (b, r)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use hcp_hist::Axis;

    fn one_axis(values: &[f64]) -> Histogram {
        let axes = vec![Axis::regular("x", values.len() - 2, 0.0, (values.len() - 2) as f64)];
        let n = values.len();
        Histogram::from_parts(axes, values.to_vec(), vec![1.0; n]).unwrap()
    }

    #[test]
    fn subtraction_clamps_and_zeroes_variance() {
        let data = Process::new(1, "data", true);
        let tt = Process::new(2, "tt", false);
        let hists = vec![
            ProcessHistogram { process: &data, hist: one_axis(&[1.0, 10.0, 8.0, 0.0]) },
            ProcessHistogram { process: &tt, hist: one_axis(&[2.0, 1.0, 2.0, 0.5]) },
        ];
        let qcd = estimate_background(&hists).unwrap();
        let v = qcd.values_flow();
        assert_abs_diff_eq!(v[0], 0.0);
        assert_abs_diff_eq!(v[1], 9.0);
        assert_abs_diff_eq!(v[2], 6.0);
        assert_abs_diff_eq!(v[3], 0.0);
        assert!(qcd.variances_flow().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn empty_input_is_data_absence() {
        let err = estimate_background(&[]).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, Error::NoHistograms(_)));
        assert!(msg.contains("possible reasons"));
        assert!(msg.contains("missing during histogramming"));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let data = Process::new(1, "data", true);
        let tt = Process::new(2, "tt", false);
        let hists = vec![
            ProcessHistogram { process: &data, hist: one_axis(&[0.0, 1.0, 0.0]) },
            ProcessHistogram { process: &tt, hist: one_axis(&[0.0, 1.0, 1.0, 0.0]) },
        ];
        assert!(matches!(estimate_background(&hists), Err(Error::Histogram(_))));
    }

    #[test]
    fn settings_defaults_and_unknown_keys() {
        let s = EstimationSettings::from_yaml_str(
            "datasets: [data_mu_a]\nprocesses: [data]\ncategories: [cat_c]\nvariables: [jet1_pt]\n",
        )
        .unwrap();
        assert_eq!(s.shifts, ShiftRequest::default());
        assert_eq!(s.region, RegionSelector::default());
        assert_eq!(s.branch_order, BranchOrder::VariableMajor);
        assert_eq!(s.formats, vec![PlotFormat::Svg]);
        s.validate(&AnalysisConfig::example()).unwrap();

        assert!(
            EstimationSettings::from_yaml_str(
                "datasets: [a]\nprocesses: [b]\ncategories: [c]\nvariables: [d]\ncolour: red\n"
            )
            .is_err()
        );
    }

    #[test]
    fn settings_region_forms() {
        let base = "datasets: [data_mu_a]\nprocesses: [data]\ncategories: [cat_c]\nvariables: [jet1_pt]\n";
        let parse = |region: &str| EstimationSettings::from_yaml_str(&format!("{base}{region}\n"));

        let s = parse("region: {category: cat_d}").unwrap();
        assert_eq!(s.region, RegionSelector::Category("cat_d".into()));
        let s = parse("region: {any_of: [cat_c, cat_d]}").unwrap();
        assert!(s.region.matches("cat_c") && s.region.matches("cat_d"));
        assert!(!s.region.matches("cat_c_lowpt"));
        assert_eq!(parse("region: all").unwrap().region, RegionSelector::All);
        assert!(parse("region: {category: cat_c, any_of: [cat_d]}").is_err());

        let back = EstimationSettings::from_yaml_str(&serde_yaml_ng::to_string(&s).unwrap());
        assert_eq!(back.unwrap(), s);
    }

    #[test]
    fn settings_validation_resolves_names() {
        let cfg = AnalysisConfig::example();
        let mut s = EstimationSettings::from_yaml_str(
            "datasets: [data_mu_a]\nprocesses: [qcd]\ncategories: [cat_c]\nvariables: [jet1_pt]\n",
        )
        .unwrap();
        assert!(matches!(s.validate(&cfg), Err(Error::NotFound { kind: "process", .. })));
        s.processes = vec!["data".into()];
        s.variables.clear();
        assert!(matches!(s.validate(&cfg), Err(Error::Validation(_))));
    }
}
