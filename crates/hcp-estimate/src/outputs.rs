//! Output naming and atomic per-branch publishing.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use hcp_core::{Error, Result};

use crate::source::sha256_hex;

/// Up to this many process names are spelled out in plot names.
pub const MAX_SPELLED_PROCESSES: usize = 5;

/// Compact representation of a process list for file names.
///
/// `a_b_c` for short lists, `<n>_<sha256 prefix>` otherwise.
pub fn processes_repr(processes: &[String]) -> String {
    let joined = processes.join("_");
    if processes.len() <= MAX_SPELLED_PROCESSES {
        return joined;
    }
    let digest = sha256_hex(joined.as_bytes());
    format!("{}_{}", processes.len(), &digest[..8])
}

/// File name of the estimated histogram.
pub fn qcd_histogram_name(category: &str, variable: &str) -> String {
    format!("qcd_histogram__{category}_{variable}.json")
}

/// Plot file name without extension.
pub fn plot_stem(processes: &[String], category: &str, variable: &str) -> String {
    format!("plot__proc_{}__cat_{category}__var_{variable}", processes_repr(processes))
}

/// Plot output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotFormat {
    /// Rendered SVG
    Svg,
    /// Raw plot artifact
    Json,
}

impl PlotFormat {
    /// File extension.
    pub fn ext(self) -> &'static str {
        match self {
            PlotFormat::Svg => "svg",
            PlotFormat::Json => "json",
        }
    }
}

impl fmt::Display for PlotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ext())
    }
}

impl FromStr for PlotFormat {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(PlotFormat::Svg),
            "json" => Ok(PlotFormat::Json),
            other => Err(Error::Validation(format!("unknown plot format '{other}'"))),
        }
    }
}

/// Files of one branch, written to a hidden staging directory and moved
/// into the output directory together.
///
/// Dropping an uncommitted set removes the staging directory.
#[derive(Debug)]
pub struct StagedOutputs {
    target: PathBuf,
    staging: PathBuf,
    names: Vec<String>,
    done: bool,
}

impl StagedOutputs {
    /// Create the staging directory under `target`.
    pub fn begin(target: &Path) -> Result<Self> {
        std::fs::create_dir_all(target)?;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Computation(format!("system clock before epoch: {e}")))?
            .as_nanos();
        let staging = target.join(format!(".staging-{}-{nanos}", std::process::id()));
        std::fs::create_dir(&staging)?;
        Ok(Self { target: target.to_path_buf(), staging, names: Vec::new(), done: false })
    }

    /// Staging directory.
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    /// Stage one file.
    pub fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        if name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(Error::Validation(format!("invalid output name '{name}'")));
        }
        if self.names.iter().any(|n| n == name) {
            return Err(Error::Validation(format!("output '{name}' staged twice")));
        }
        std::fs::write(self.staging.join(name), bytes)?;
        self.names.push(name.to_string());
        Ok(())
    }

    /// Move every staged file into place.
    ///
    /// If a rename fails, files already moved are removed again.
    pub fn commit(mut self) -> Result<Vec<PathBuf>> {
        let mut published: Vec<PathBuf> = Vec::with_capacity(self.names.len());
        for name in &self.names {
            let dest = self.target.join(name);
            if let Err(e) = std::fs::rename(self.staging.join(name), &dest) {
                for p in &published {
                    if let Err(e) = std::fs::remove_file(p) {
                        log::warn!("rollback: cannot remove {}: {e}", p.display());
                    }
                }
                return Err(Error::Io(e));
            }
            published.push(dest);
        }
        self.done = true;
        std::fs::remove_dir_all(&self.staging)?;
        Ok(published)
    }
}

impl Drop for StagedOutputs {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.staging) {
            log::warn!("cannot remove staging dir {}: {e}", self.staging.display());
        }
    }
}
