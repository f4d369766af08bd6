//! `branches` and `estimate-qcd` subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use hcp_estimate::{
    BranchOutcome, DataDrivenEstimation, DirectorySource, EstimationSettings, RegionSelector,
    create_branch_map,
};
use hcp_viz::resolve_config;

use crate::{load_config, write_json};

pub(crate) fn cmd_branches(settings: &Path, output: Option<&PathBuf>) -> Result<()> {
    let s = EstimationSettings::from_path(settings)
        .with_context(|| format!("reading settings from {}", settings.display()))?;
    let branches = create_branch_map(&s.categories, &s.variables, s.branch_order);
    write_json(output, serde_json::json!({ "order": s.branch_order, "branches": branches }))
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_estimate_qcd(
    config: Option<&PathBuf>,
    settings: &Path,
    hists: &Path,
    out_dir: &Path,
    viz_config: Option<&PathBuf>,
    branch: Option<usize>,
    region: Option<&str>,
    output: Option<&PathBuf>,
) -> Result<()> {
    let cfg = load_config(config)?;
    let mut s = EstimationSettings::from_path(settings)
        .with_context(|| format!("reading settings from {}", settings.display()))?;
    if let Some(r) = region {
        s.region = r.parse::<RegionSelector>()?;
    }
    let viz = match viz_config {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("reading plot config {}", p.display()))?;
            resolve_config(Some(text.as_str()))?
        }
        None => resolve_config(None)?,
    };

    let est = DataDrivenEstimation::new(&cfg, s, DirectorySource::new(hists), out_dir)?
        .with_viz(viz);
    let mut branches = est.branches();
    if let Some(i) = branch {
        if i >= branches.len() {
            bail!("branch {i} out of range (branch map has {} entries)", branches.len());
        }
        branches = vec![branches.swap_remove(i)];
    }
    tracing::info!(
        branches = branches.len(),
        region = %est.settings().region,
        out_dir = %out_dir.display(),
        "running QCD estimation"
    );

    let mut summary = Vec::with_capacity(branches.len());
    let mut n_failed = 0usize;
    for b in &branches {
        let entry = match est.run_branch(b) {
            Ok(BranchOutcome::Produced { paths }) => serde_json::json!({
                "index": b.index,
                "category": b.category,
                "variable": b.variable,
                "status": "produced",
                "outputs": paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            }),
            Ok(BranchOutcome::Skipped) => serde_json::json!({
                "index": b.index,
                "category": b.category,
                "variable": b.variable,
                "status": "skipped",
            }),
            Err(e) => {
                n_failed += 1;
                tracing::error!(branch = b.index, "{e}");
                serde_json::json!({
                    "index": b.index,
                    "category": b.category,
                    "variable": b.variable,
                    "status": "failed",
                    "error": e.to_string(),
                })
            }
        };
        summary.push(entry);
    }

    write_json(output, serde_json::json!({ "branches": summary, "n_failed": n_failed }))?;
    if n_failed > 0 {
        bail!("{n_failed} of {} branches failed", branches.len());
    }
    Ok(())
}
