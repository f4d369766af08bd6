//! `select` and `histograms` subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hcp_core::Error;
use hcp_estimate::DirectorySource;
use hcp_events::EventBatch;
use hcp_hist::{event_weights, fill_variable_histogram, write_histogram};
use hcp_selection::{SelectionContext, SelectionResult, SelectionStats, default_selector};

use crate::{load_config, write_json};

pub(crate) fn cmd_select(
    events: &Path,
    config: Option<&PathBuf>,
    dataset: &str,
    out_dir: &Path,
    chunk_size: Option<usize>,
    threads: usize,
) -> Result<()> {
    let cfg = load_config(config)?;
    let ds = cfg.get_dataset(dataset)?;
    let batch = EventBatch::from_path(events)
        .with_context(|| format!("reading events from {}", events.display()))?;
    tracing::info!(dataset, events = batch.len(), "running selection");

    let ctx = SelectionContext::new(&cfg, ds);
    let chain = default_selector();
    let (result, stats) = match chunk_size {
        Some(size) => {
            let run_chunks = || chain.run_chunked(&batch, &ctx, size);
            let (outputs, stats) = if threads > 0 {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .context("failed to create thread pool")?;
                pool.install(run_chunks)?
            } else {
                run_chunks()?
            };
            tracing::info!(chunks = outputs.len(), chunk_size = size, "chunked selection done");
            let result = SelectionResult::concat(outputs.into_iter().map(|o| o.result).collect())?;
            (result, stats)
        }
        None => {
            let mut stats = SelectionStats::new();
            let out = chain.run(batch, &ctx, &mut stats)?;
            (out.result, stats)
        }
    };

    std::fs::create_dir_all(out_dir)?;
    std::fs::write(out_dir.join("results.json"), serde_json::to_string_pretty(&result)?)?;
    std::fs::write(out_dir.join("stats.json"), stats.to_json_string()?)?;

    write_json(
        None,
        serde_json::json!({
            "dataset": dataset,
            "steps": result.step_names(),
            "num_events": stats.get("num_events"),
            "num_events_selected": stats.get("num_events_selected"),
        }),
    )
}

pub(crate) fn cmd_histograms(
    events: &Path,
    config: Option<&PathBuf>,
    dataset: &str,
    variables: &[String],
    shift: &str,
    out_dir: &Path,
) -> Result<()> {
    let cfg = load_config(config)?;
    let ds = cfg.get_dataset(dataset)?;
    let shift = cfg.get_shift(shift)?;
    let vars = if variables.is_empty() {
        cfg.variables.iter().collect::<Vec<_>>()
    } else {
        variables.iter().map(|v| cfg.get_variable(v)).collect::<hcp_core::Result<Vec<_>>>()?
    };

    let batch = EventBatch::from_path(events)
        .with_context(|| format!("reading events from {}", events.display()))?;
    let ctx = SelectionContext::new(&cfg, ds);
    let mut stats = SelectionStats::new();
    let out = default_selector().run(batch, &ctx, &mut stats)?;
    let mask = out.result.event_mask().unwrap_or_default();
    let selected = out.events.filter(mask)?;
    let weights = event_weights(&selected, ds.is_data)?;
    tracing::info!(dataset, selected = selected.len(), "filling histograms");

    let target = DirectorySource::new(out_dir);
    let mut written = Vec::new();
    let mut skipped = Vec::new();
    for var in vars {
        match fill_variable_histogram(&selected, var, shift.id, Some(weights.as_slice())) {
            Ok(hist) => {
                let path = target.path_for(dataset, &var.name);
                write_histogram(&path, &hist)?;
                written.push(path.display().to_string());
            }
            Err(Error::NotFound { kind: "column", name }) => {
                tracing::warn!(variable = %var.name, column = %name, "missing column, variable skipped");
                skipped.push(var.name.clone());
            }
            Err(e) => return Err(e).with_context(|| format!("variable '{}'", var.name)),
        }
    }

    write_json(
        None,
        serde_json::json!({
            "dataset": dataset,
            "shift": shift.name,
            "num_events_selected": selected.len(),
            "written": written,
            "skipped": skipped,
        }),
    )
}
