//! # hcp-estimate
//!
//! Data-driven QCD multijet estimation. Each branch of a
//! (category, variable) map loads the per-dataset histograms, accumulates the
//! requested processes and subtracts simulation from data. Branches whose
//! category lies in the configured region publish the estimated histogram
//! and per-process stack plots.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod branch;
pub mod estimation;
pub mod outputs;
pub mod plot;
pub mod region;
pub mod shift;
pub mod source;

pub use branch::{Branch, BranchOrder, create_branch_map};
pub use estimation::{
    BranchOutcome, CollectedHistograms, DataDrivenEstimation, EstimationSettings,
    ProcessHistogram, collect_process_histograms, estimate_background,
};
pub use outputs::{PlotFormat, StagedOutputs, plot_stem, processes_repr, qcd_histogram_name};
pub use plot::build_stack_artifact;
pub use region::{DEFAULT_CONTROL_REGION, RegionSelector};
pub use shift::ShiftRequest;
pub use source::{
    DirectorySource, HistogramSource, LoadedHistogram, MemorySource, histogram_file_name,
};
