//! Where per-dataset histograms come from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use hcp_core::{Error, Result};
use hcp_hist::Histogram;

/// A histogram and, when it was read from a file, the file's sha256.
#[derive(Debug, Clone)]
pub struct LoadedHistogram {
    /// The histogram
    pub hist: Histogram,
    /// Hex sha256 of the input bytes
    pub sha256: Option<String>,
}

/// Provides the merged histogram of one dataset for one variable.
pub trait HistogramSource {
    /// Load the histogram of `dataset` for `variable`.
    fn load(&self, dataset: &str, variable: &str) -> Result<LoadedHistogram>;
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    let out = h.finalize();
    let mut s = String::with_capacity(64);
    for b in out {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// File name of a stored histogram.
pub fn histogram_file_name(variable: &str) -> String {
    format!("hist__{variable}.json")
}

/// Histograms stored as `<root>/<dataset>/hist__<variable>.json`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the histogram of `dataset` for `variable`.
    pub fn path_for(&self, dataset: &str, variable: &str) -> PathBuf {
        self.root.join(dataset).join(histogram_file_name(variable))
    }
}

impl HistogramSource for DirectorySource {
    fn load(&self, dataset: &str, variable: &str) -> Result<LoadedHistogram> {
        let path = self.path_for(dataset, variable);
        let bytes = std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::NotFound { kind: "histogram file", name: path.display().to_string() }
            }
            _ => Error::Io(e),
        })?;
        let hist: Histogram = serde_json::from_slice(&bytes)?;
        log::debug!("loaded {} ({:?})", path.display(), hist.shape());
        Ok(LoadedHistogram { hist, sha256: Some(sha256_hex(&bytes)) })
    }
}

/// In-memory histograms keyed by (dataset, variable).
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    hists: BTreeMap<(String, String), Histogram>,
}

impl MemorySource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a histogram.
    pub fn insert(&mut self, dataset: &str, variable: &str, hist: Histogram) {
        self.hists.insert((dataset.to_string(), variable.to_string()), hist);
    }

    /// Builder form of [`MemorySource::insert`].
    pub fn with(mut self, dataset: &str, variable: &str, hist: Histogram) -> Self {
        self.insert(dataset, variable, hist);
        self
    }
}

impl HistogramSource for MemorySource {
    fn load(&self, dataset: &str, variable: &str) -> Result<LoadedHistogram> {
        self.hists
            .get(&(dataset.to_string(), variable.to_string()))
            .map(|h| LoadedHistogram { hist: h.clone(), sha256: None })
            .ok_or_else(|| Error::NotFound {
                kind: "histogram",
                name: format!("{dataset}/{variable}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcp_hist::{Axis, write_histogram};

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn directory_layout_and_digest() {
        let root = std::env::temp_dir().join(format!("hcp_source_{}", std::process::id()));
        let src = DirectorySource::new(&root);
        let h = Histogram::new(vec![Axis::regular("x", 2, 0.0, 2.0)]).unwrap();
        write_histogram(&src.path_for("data_mu_a", "x"), &h).unwrap();

        let loaded = src.load("data_mu_a", "x").unwrap();
        assert_eq!(loaded.hist.shape(), vec![4]);
        assert_eq!(loaded.sha256.as_ref().map(String::len), Some(64));
        assert!(root.join("data_mu_a").join("hist__x.json").exists());

        let missing = src.load("data_mu_a", "y").unwrap_err();
        assert!(matches!(missing, Error::NotFound { kind: "histogram file", .. }));
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn memory_source_lookup() {
        let h = Histogram::new(vec![Axis::regular("x", 1, 0.0, 1.0)]).unwrap();
        let src = MemorySource::new().with("tt_powheg", "x", h);
        assert!(src.load("tt_powheg", "x").unwrap().sha256.is_none());
        assert!(src.load("tt_powheg", "met").is_err());
    }
}
