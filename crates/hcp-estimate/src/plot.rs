//! Conversion of estimation histograms into a process stack artifact.

use std::collections::BTreeMap;

use hcp_core::{Category, Error, Result, Variable};
use hcp_hist::Histogram;
use hcp_viz::{ArtifactMeta, CategoryInfo, ProcessSeries, ProcessStackArtifact, VariableInfo};

use crate::estimation::ProcessHistogram;

/// Name of the estimated series.
pub const ESTIMATE_NAME: &str = "qcd";

/// Sum every axis except `variable` away and return the in-range yields.
fn project(hist: &Histogram, variable: &str) -> Result<Vec<f64>> {
    let mut h = hist.clone();
    let others: Vec<String> = hist
        .axes()
        .iter()
        .map(|a| a.name().to_string())
        .filter(|n| n != variable)
        .collect();
    for name in &others {
        h = h.sum_axis(name)?;
    }
    h.values()
}

/// Build the stack artifact of one branch.
///
/// Process series follow the caller order of `hists`; the shift axis is
/// summed for display.
pub fn build_stack_artifact(
    category: &Category,
    variable: &Variable,
    hists: &[ProcessHistogram<'_>],
    estimate: &Histogram,
    input_sha256: BTreeMap<String, String>,
) -> Result<ProcessStackArtifact> {
    let edges = estimate.axis(&variable.name)?.edges();
    if edges.is_empty() {
        return Err(Error::Histogram(format!("axis '{}' is not binned", variable.name)));
    }

    let mut meta = ArtifactMeta::now()?;
    meta.input_sha256 = input_sha256;
    let var_info = VariableInfo {
        name: variable.name.clone(),
        title: variable.x_title.clone().unwrap_or_else(|| variable.name.clone()),
        unit: variable.unit.clone(),
    };
    let cat_info =
        CategoryInfo { name: category.name.clone(), label: category.display_label().to_string() };

    let mut artifact = ProcessStackArtifact::new(meta, var_info, cat_info, edges)?;
    for ph in hists {
        artifact.push_series(ProcessSeries {
            name: ph.process.name.clone(),
            label: ph.process.display_label().to_string(),
            is_data: ph.process.is_data,
            color: ph.process.color.clone(),
            y: project(&ph.hist, &variable.name)?,
        })?;
    }
    artifact.set_estimate(ProcessSeries {
        name: ESTIMATE_NAME.to_string(),
        label: "QCD".to_string(),
        is_data: false,
        color: None,
        y: project(estimate, &variable.name)?,
    })?;
    artifact.finalize_data();
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use hcp_core::{AnalysisConfig, Process};
    use hcp_hist::Axis;

    fn shift_hist(rows: &[[f64; 4]]) -> Histogram {
        let ids: Vec<i64> = (0..rows.len() as i64).collect();
        let axes = vec![Axis::int_category("shift", ids), Axis::regular("x", 2, 0.0, 2.0)];
        let values: Vec<f64> = rows.iter().flatten().copied().collect();
        let n = values.len();
        Histogram::from_parts(axes, values, vec![0.0; n]).unwrap()
    }

    #[test]
    fn series_drop_flow_and_sum_shifts() {
        let cfg = AnalysisConfig::example();
        let data = Process::new(1, "data", true).label("Data");
        let tt = cfg.get_process("tt").unwrap();
        let hists = vec![
            ProcessHistogram {
                process: &data,
                hist: shift_hist(&[[5.0, 3.0, 4.0, 1.0], [0.0, 1.0, 1.0, 0.0]]),
            },
            ProcessHistogram { process: tt, hist: shift_hist(&[[0.0, 1.0, 1.0, 0.0]; 2]) },
        ];
        let estimate = shift_hist(&[[0.0, 2.0, 3.0, 0.0]]);
        let mut var = Variable::new("x", hcp_core::Binning::Regular(2, 0.0, 2.0));
        var.unit = Some("GeV".into());
        let cat = cfg.get_category("cat_c").unwrap();

        let a = build_stack_artifact(cat, &var, &hists, &estimate, BTreeMap::new()).unwrap();
        assert_eq!(a.bin_edges, vec![0.0, 1.0, 2.0]);
        assert_eq!(a.series[0].y, vec![4.0, 5.0]);
        assert_eq!(a.series[1].y, vec![2.0, 2.0]);
        assert_eq!(a.series[1].color.as_deref(), Some("#e42536"));
        assert_eq!(a.series[1].label, "t#bar{t}");
        assert_eq!(a.category.label, "Control region");
        assert_eq!(a.variable.axis_label(), "x [GeV]");
        let est = a.estimate.as_ref().unwrap();
        assert_eq!(est.name, ESTIMATE_NAME);
        assert_eq!(est.y, vec![2.0, 3.0]);
        let data_points = a.data.as_ref().unwrap();
        assert_abs_diff_eq!(data_points.y[1], 5.0);
        assert_eq!(data_points.error_model, "garwood_poisson_68");
    }
}
