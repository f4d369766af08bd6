//! End-to-end QCD estimation over in-memory and on-disk histograms.

use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use hcp_core::{AnalysisConfig, Error};
use hcp_estimate::{
    BranchOrder, BranchOutcome, DataDrivenEstimation, DirectorySource, EstimationSettings,
    MemorySource, PlotFormat, RegionSelector, ShiftRequest, collect_process_histograms,
    estimate_background,
};
use hcp_hist::{Axis, Histogram, read_histogram, write_histogram};
use hcp_viz::ProcessStackArtifact;

const CONFIG: &str = r##"
name: qcd_test
processes:
  - {id: 1, name: data, is_data: true, label: Data}
  - id: 2
    name: tt
    color: "#e42536"
    processes:
      - {id: 21, name: tt_sl}
      - {id: 22, name: tt_dl}
categories:
  - id: 10
    name: cat_c
    label: Control region
    categories:
      - {id: 11, name: cat_c_lowpt}
      - {id: 12, name: cat_c_highpt}
  - {id: 20, name: cat_d}
datasets:
  - {name: data_a, is_data: true, processes: [data]}
  - {name: data_b, is_data: true, processes: [data]}
  - {name: tt_mc, processes: [tt]}
shifts:
  - {id: 0, name: nominal}
  - {id: 1, name: jec_up}
variables:
  - {name: x, binning: [2, 0, 2], x_title: X, unit: GeV}
"##;

fn config() -> AnalysisConfig {
    AnalysisConfig::from_yaml_str(CONFIG).unwrap()
}

/// `flow` holds the four flow-inclusive bins of `x` per process id; every
/// entry is split evenly between the two leaf categories of `cat_c`, and
/// `cat_d` receives a large constant that must never be selected.
fn hist(entries: &[(i64, [f64; 4])]) -> Histogram {
    let axes = vec![
        Axis::int_category("process", entries.iter().map(|(id, _)| *id).collect()),
        Axis::int_category("category", vec![11, 12, 20]),
        Axis::int_category("shift", vec![0]),
        Axis::regular("x", 2, 0.0, 2.0),
    ];
    let mut values = Vec::new();
    for (_, flow) in entries {
        for cat in [11, 12, 20] {
            for v in flow {
                values.push(if cat == 20 { 1000.0 } else { v / 2.0 });
            }
        }
    }
    let n = values.len();
    Histogram::from_parts(axes, values, vec![1.0; n]).unwrap()
}

fn source(mc: [f64; 4]) -> MemorySource {
    MemorySource::new()
        .with("data_a", "x", hist(&[(1, [0.0, 10.0, 5.0, 0.0])]))
        .with("data_b", "x", hist(&[(1, [0.0, 3.0, 2.0, 0.0])]))
        .with("tt_mc", "x", hist(&[(21, mc)]))
}

fn settings(processes: &[&str], categories: &[&str]) -> EstimationSettings {
    let list = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    EstimationSettings {
        datasets: list(&["data_a", "data_b", "tt_mc"]),
        processes: list(processes),
        categories: list(categories),
        variables: list(&["x"]),
        shifts: ShiftRequest::default(),
        region: RegionSelector::default(),
        branch_order: BranchOrder::VariableMajor,
        formats: vec![PlotFormat::Svg, PlotFormat::Json],
    }
}

fn out_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hcp_qcd_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(rd) => rd.map(|e| e.unwrap().file_name().to_string_lossy().into_owned()).collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

fn estimate_for(mc: [f64; 4]) -> Histogram {
    let cfg = config();
    let datasets: Vec<_> = cfg.datasets.iter().collect();
    let processes = vec![cfg.get_process("data").unwrap(), cfg.get_process("tt").unwrap()];
    let shifts = vec![cfg.get_shift("nominal").unwrap()];
    let collected = collect_process_histograms(
        &cfg,
        &source(mc),
        &datasets,
        &processes,
        cfg.get_category("cat_c").unwrap(),
        "x",
        &shifts,
    )
    .unwrap();
    estimate_background(&collected.hists).unwrap()
}

#[test]
fn data_minus_simulation() {
    let qcd = estimate_for([0.0, 4.0, 1.0, 0.0]);
    let names: Vec<&str> = qcd.axes().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["shift", "x"]);
    let v = qcd.values_flow();
    assert_abs_diff_eq!(v[1], 9.0, epsilon = 1e-12);
    assert_abs_diff_eq!(v[2], 6.0, epsilon = 1e-12);
}

#[test]
fn negative_bins_are_clamped() {
    let qcd = estimate_for([0.0, 20.0, 10.0, 0.0]);
    assert_eq!(qcd.values_flow(), &[0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn variance_is_reset() {
    let qcd = estimate_for([0.0, 4.0, 1.0, 0.0]);
    assert!(qcd.variances_flow().iter().all(|&v| v == 0.0));
}

#[test]
fn flow_bins_take_part() {
    let cfg = config();
    let src = MemorySource::new()
        .with("data_a", "x", hist(&[(1, [2.0, 0.0, 0.0, 3.0])]))
        .with("tt_mc", "x", hist(&[(2, [1.0, 0.0, 0.0, 5.0])]));
    let datasets = vec![cfg.get_dataset("data_a").unwrap(), cfg.get_dataset("tt_mc").unwrap()];
    let processes = vec![cfg.get_process("data").unwrap(), cfg.get_process("tt").unwrap()];
    let shifts = vec![cfg.get_shift("nominal").unwrap()];
    let collected = collect_process_histograms(
        &cfg,
        &src,
        &datasets,
        &processes,
        cfg.get_category("cat_c").unwrap(),
        "x",
        &shifts,
    )
    .unwrap();
    let qcd = estimate_background(&collected.hists).unwrap();
    assert_eq!(qcd.values_flow(), &[1.0, 0.0, 0.0, 0.0]);
}

#[test]
fn caller_order_is_kept() {
    let cfg = config();
    let datasets: Vec<_> = cfg.datasets.iter().collect();
    let processes = vec![cfg.get_process("tt").unwrap(), cfg.get_process("data").unwrap()];
    let shifts = vec![cfg.get_shift("nominal").unwrap()];
    let collected = collect_process_histograms(
        &cfg,
        &source([0.0, 4.0, 1.0, 0.0]),
        &datasets,
        &processes,
        cfg.get_category("cat_c").unwrap(),
        "x",
        &shifts,
    )
    .unwrap();
    let order: Vec<&str> = collected.hists.iter().map(|h| h.process.name.as_str()).collect();
    assert_eq!(order, vec!["tt", "data"]);
    let qcd = estimate_background(&collected.hists).unwrap();
    assert_abs_diff_eq!(qcd.values_flow()[1], 9.0, epsilon = 1e-12);
}

#[test]
fn absent_identifiers_are_skipped() {
    let cfg = config();
    let datasets: Vec<_> = cfg.datasets.iter().collect();
    let processes = vec![cfg.get_process("data").unwrap(), cfg.get_process("tt").unwrap()];
    // jec_up (id 1) is missing from every shift axis, tt_dl (22) and tt (2)
    // from the process axis of tt_mc
    let shifts = ShiftRequest::Many(vec!["nominal".into(), "jec_up".into()]).resolve(&cfg).unwrap();
    let collected = collect_process_histograms(
        &cfg,
        &source([0.0, 4.0, 1.0, 0.0]),
        &datasets,
        &processes,
        cfg.get_category("cat_c").unwrap(),
        "x",
        &shifts,
    )
    .unwrap();
    assert_eq!(collected.hists.len(), 2);
    let qcd = estimate_background(&collected.hists).unwrap();
    assert_abs_diff_eq!(qcd.values_flow()[1], 9.0, epsilon = 1e-12);
    assert_abs_diff_eq!(qcd.values_flow()[2], 6.0, epsilon = 1e-12);
}

#[test]
fn shifts_stay_on_their_own_axis() {
    let cfg = config();
    // per process: nominal then jec_up flow bins, cat_c leaves only
    let shifted = |process: i64, nominal: [f64; 4], up: [f64; 4]| {
        let axes = vec![
            Axis::int_category("process", vec![process]),
            Axis::int_category("category", vec![11, 12]),
            Axis::int_category("shift", vec![0, 1]),
            Axis::regular("x", 2, 0.0, 2.0),
        ];
        let mut values = Vec::new();
        for _ in [11, 12] {
            values.extend(nominal.iter().chain(&up).map(|v| v / 2.0));
        }
        let n = values.len();
        Histogram::from_parts(axes, values, vec![1.0; n]).unwrap()
    };
    let src = MemorySource::new()
        .with("data_a", "x", shifted(1, [0.0, 10.0, 5.0, 0.0], [0.0, 12.0, 6.0, 0.0]))
        .with("tt_mc", "x", shifted(21, [0.0, 4.0, 1.0, 0.0], [0.0, 2.0, 2.0, 0.0]));
    let datasets = vec![cfg.get_dataset("data_a").unwrap(), cfg.get_dataset("tt_mc").unwrap()];
    let processes = vec![cfg.get_process("data").unwrap(), cfg.get_process("tt").unwrap()];
    let shifts = ShiftRequest::Many(vec!["nominal".into(), "jec_up".into()]).resolve(&cfg).unwrap();
    let collected = collect_process_histograms(
        &cfg,
        &src,
        &datasets,
        &processes,
        cfg.get_category("cat_c").unwrap(),
        "x",
        &shifts,
    )
    .unwrap();
    let qcd = estimate_background(&collected.hists).unwrap();

    assert_eq!(qcd.axis("shift").unwrap().categories(), &[0, 1]);
    assert_eq!(qcd.values_flow(), &[0.0, 6.0, 4.0, 0.0, 0.0, 10.0, 4.0, 0.0]);
}

#[test]
fn branch_publishes_histogram_and_plots() {
    let cfg = config();
    let dir = out_dir("publish");
    let est = DataDrivenEstimation::new(
        &cfg,
        settings(&["data", "tt"], &["cat_c"]),
        source([0.0, 4.0, 1.0, 0.0]),
        &dir,
    )
    .unwrap();
    let branches = est.branches();
    assert_eq!(branches.len(), 1);

    let outcome = est.run_branch(&branches[0]).unwrap();
    let BranchOutcome::Produced { paths } = outcome else { panic!("branch was skipped") };
    assert_eq!(paths.len(), 3);
    assert_eq!(
        file_names(&dir),
        vec![
            "plot__proc_data_tt__cat_cat_c__var_x.json",
            "plot__proc_data_tt__cat_cat_c__var_x.svg",
            "qcd_histogram__cat_c_x.json",
        ]
    );

    let qcd = read_histogram(&dir.join("qcd_histogram__cat_c_x.json")).unwrap();
    assert_abs_diff_eq!(qcd.values_flow()[1], 9.0, epsilon = 1e-12);

    let text = std::fs::read_to_string(dir.join("plot__proc_data_tt__cat_cat_c__var_x.json"))
        .unwrap();
    let artifact: ProcessStackArtifact = serde_json::from_str(&text).unwrap();
    let names: Vec<&str> = artifact.series.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["data", "tt"]);
    assert_eq!(artifact.estimate.as_ref().unwrap().y, vec![9.0, 6.0]);
    assert_eq!(artifact.data.as_ref().unwrap().y, vec![13.0, 7.0]);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn no_matching_dataset_writes_nothing() {
    let cfg = config();
    let dir = out_dir("absent");
    let mut s = settings(&["data"], &["cat_c"]);
    s.datasets = vec!["tt_mc".into()];
    let est = DataDrivenEstimation::new(&cfg, s, source([0.0; 4]), &dir).unwrap();
    let err = est.run_branch(&est.branches()[0]).unwrap_err();
    assert!(matches!(err, Error::NoHistograms(_)));
    assert!(err.to_string().contains("did not match any value on the process axis"));
    assert!(file_names(&dir).is_empty());
}

#[test]
fn categories_outside_the_region_are_skipped() {
    let cfg = config();
    let dir = out_dir("region");
    // nothing is loaded for a skipped branch, so an empty source suffices
    let s = settings(&["data", "tt"], &["cat_d"]);
    let est = DataDrivenEstimation::new(&cfg, s, MemorySource::new(), &dir).unwrap();
    assert_eq!(est.run_branch(&est.branches()[0]).unwrap(), BranchOutcome::Skipped);
    assert!(file_names(&dir).is_empty());
}

#[test]
fn run_all_follows_the_branch_map() {
    let cfg = config();
    let dir = out_dir("run_all");
    let mut s = settings(&["data", "tt"], &["cat_d", "cat_c"]);
    s.formats = vec![PlotFormat::Svg];
    let est = DataDrivenEstimation::new(&cfg, s, source([0.0, 4.0, 1.0, 0.0]), &dir).unwrap();

    let results = est.run_all();
    let cats: Vec<&str> = results.iter().map(|(b, _)| b.category.as_str()).collect();
    assert_eq!(cats, vec!["cat_c", "cat_d"]);
    assert!(matches!(results[0].1, Ok(BranchOutcome::Produced { .. })));
    assert!(matches!(results[1].1, Ok(BranchOutcome::Skipped)));
    // no staging directory is left behind
    assert_eq!(
        file_names(&dir),
        vec!["plot__proc_data_tt__cat_cat_c__var_x.svg", "qcd_histogram__cat_c_x.json"]
    );
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn region_can_cover_several_categories() {
    let cfg = config();
    let dir = out_dir("any_of");
    let mut s = settings(&["data", "tt"], &["cat_c", "cat_d"]);
    s.region = RegionSelector::AnyOf(vec!["cat_c".into(), "cat_d".into()]);
    s.formats.clear();
    let src = source([0.0, 4.0, 1.0, 0.0]);
    let est = DataDrivenEstimation::new(&cfg, s, src, &dir).unwrap();
    let results = est.run_all();
    assert!(results.iter().all(|(_, r)| matches!(r, Ok(BranchOutcome::Produced { .. }))));
    // cat_d is a leaf: 2 * 1000 (data) - 1000 (tt) per bin
    let qcd = read_histogram(&dir.join("qcd_histogram__cat_d_x.json")).unwrap();
    assert_eq!(qcd.values_flow(), &[1000.0; 4]);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn directory_source_records_input_digests() {
    let cfg = config();
    let root = out_dir("inputs");
    let dir = root.join("out");
    let src = DirectorySource::new(root.join("hists"));
    for (ds, h) in [
        ("data_a", hist(&[(1, [0.0, 10.0, 5.0, 0.0])])),
        ("data_b", hist(&[(1, [0.0, 3.0, 2.0, 0.0])])),
        ("tt_mc", hist(&[(21, [0.0, 4.0, 1.0, 0.0])])),
    ] {
        write_histogram(&src.path_for(ds, "x"), &h).unwrap();
    }
    let mut s = settings(&["data", "tt"], &["cat_c"]);
    s.formats = vec![PlotFormat::Json];
    let est = DataDrivenEstimation::new(&cfg, s, src, &dir).unwrap();
    est.run_branch(&est.branches()[0]).unwrap();

    let text = std::fs::read_to_string(dir.join("plot__proc_data_tt__cat_cat_c__var_x.json"))
        .unwrap();
    let artifact: ProcessStackArtifact = serde_json::from_str(&text).unwrap();
    let keys: Vec<&str> = artifact.meta.input_sha256.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["data_a", "data_b", "tt_mc"]);
    assert!(artifact.meta.input_sha256.values().all(|h| h.len() == 64));
    std::fs::remove_dir_all(&root).unwrap();
}
