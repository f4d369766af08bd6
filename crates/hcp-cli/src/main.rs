//! higgscp CLI

mod estimate;
mod selection;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hcp_core::AnalysisConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "higgscp")]
#[command(about = "higgscp - event selection and data-driven QCD estimation")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the default event selection on one dataset
    Select {
        /// Event batch (column JSON)
        #[arg(short, long)]
        events: PathBuf,

        /// Analysis config (YAML/JSON). Defaults to the built-in example.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Dataset the events belong to
        #[arg(short, long)]
        dataset: String,

        /// Directory for results.json and stats.json
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Process the batch in chunks of this many events, in parallel
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Threads for chunked processing (0 = auto)
        #[arg(long, default_value = "0", requires = "chunk_size")]
        threads: usize,
    },

    /// Select events and fill one histogram per variable
    Histograms {
        /// Event batch (column JSON)
        #[arg(short, long)]
        events: PathBuf,

        /// Analysis config (YAML/JSON). Defaults to the built-in example.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Dataset the events belong to
        #[arg(short, long)]
        dataset: String,

        /// Variables to fill (comma-separated). Defaults to every config variable.
        #[arg(long, value_delimiter = ',')]
        variables: Vec<String>,

        /// Shift the events correspond to
        #[arg(long, default_value = "nominal")]
        shift: String,

        /// Histograms are written to `<out-dir>/<dataset>/hist__<variable>.json`
        #[arg(short, long)]
        out_dir: PathBuf,
    },

    /// Print the branch map of an estimation run
    Branches {
        /// Estimation settings (YAML)
        #[arg(short, long)]
        settings: PathBuf,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Data-driven QCD estimation
    EstimateQcd {
        /// Analysis config (YAML/JSON). Defaults to the built-in example.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Estimation settings (YAML)
        #[arg(short, long)]
        settings: PathBuf,

        /// Root of the input histograms (`<hists>/<dataset>/hist__<variable>.json`)
        #[arg(long)]
        hists: PathBuf,

        /// Output directory for estimated histograms and plots
        #[arg(short = 'O', long)]
        out_dir: PathBuf,

        /// Plot configuration (YAML)
        #[arg(long)]
        viz_config: Option<PathBuf>,

        /// Run only this branch
        #[arg(long)]
        branch: Option<usize>,

        /// Region override: `all`, a category name or a comma-separated list
        #[arg(long)]
        region: Option<String>,

        /// Run summary (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analysis config utilities
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Validate a config and print a summary
    Validate {
        /// Analysis config (YAML/JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the built-in example config as YAML
    Example,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Select { events, config, dataset, out_dir, chunk_size, threads } => {
            selection::cmd_select(&events, config.as_ref(), &dataset, &out_dir, chunk_size, threads)
        }
        Commands::Histograms { events, config, dataset, variables, shift, out_dir } => {
            selection::cmd_histograms(
                &events,
                config.as_ref(),
                &dataset,
                &variables,
                &shift,
                &out_dir,
            )
        }
        Commands::Branches { settings, output } => {
            estimate::cmd_branches(&settings, output.as_ref())
        }
        Commands::EstimateQcd {
            config,
            settings,
            hists,
            out_dir,
            viz_config,
            branch,
            region,
            output,
        } => estimate::cmd_estimate_qcd(
            config.as_ref(),
            &settings,
            &hists,
            &out_dir,
            viz_config.as_ref(),
            branch,
            region.as_deref(),
            output.as_ref(),
        ),
        Commands::Config { command } => match command {
            ConfigCommands::Validate { config, output } => cmd_config_validate(&config, output.as_ref()),
            ConfigCommands::Example => {
                print!("{}", serde_yaml_ng::to_string(&AnalysisConfig::example())?);
                Ok(())
            }
        },
        Commands::Version => {
            println!("higgscp {}", hcp_core::VERSION);
            Ok(())
        }
    }
}

/// The config at `path`, or the built-in example.
fn load_config(path: Option<&PathBuf>) -> Result<AnalysisConfig> {
    match path {
        Some(p) => {
            tracing::info!(path = %p.display(), "loading analysis config");
            Ok(AnalysisConfig::from_path(p)?)
        }
        None => {
            tracing::info!("no --config given, using the built-in example");
            Ok(AnalysisConfig::example())
        }
    }
}

fn cmd_config_validate(config: &PathBuf, output: Option<&PathBuf>) -> Result<()> {
    let cfg = AnalysisConfig::from_path(config)?;
    let count = |f: fn(&hcp_core::Process) -> bool| {
        cfg.processes.iter().flat_map(|p| p.walk_processes(true)).filter(|p| f(p)).count()
    };
    write_json(
        output,
        serde_json::json!({
            "name": cfg.name,
            "valid": true,
            "n_processes": count(|_| true),
            "n_data_processes": count(|p| p.is_data),
            "n_categories": cfg.categories.iter().map(|c| c.walk_categories().len()).sum::<usize>(),
            "leaf_categories": cfg.leaf_categories().iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "datasets": cfg.datasets.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            "shifts": cfg.shifts.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "variables": cfg.variables.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        }),
    )
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
