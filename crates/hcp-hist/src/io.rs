//! JSON persistence for histograms.

use std::path::Path;

use hcp_core::Result;

use crate::histogram::Histogram;

/// Read a histogram JSON file. Storage is validated against the axes.
pub fn read_histogram(path: &Path) -> Result<Histogram> {
    let text = std::fs::read_to_string(path)?;
    let h: Histogram = serde_json::from_str(&text)?;
    log::debug!("read histogram {:?} from {}", h.shape(), path.display());
    Ok(h)
}

/// Write a histogram as JSON, creating parent directories.
///
/// The file is written next to its target and renamed into place.
pub fn write_histogram(path: &Path, hist: &Histogram) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(hist)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;
    use crate::histogram::Coord;

    #[test]
    fn write_then_read() {
        let dir = std::env::temp_dir().join(format!("hcp_hist_io_{}", std::process::id()));
        let path = dir.join("nested").join("hist__x.json");
        let mut h = Histogram::new(vec![Axis::regular("x", 3, 0.0, 3.0)]).unwrap();
        h.fill(&[Coord::Value(1.5)], 2.0).unwrap();

        write_histogram(&path, &h).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(read_histogram(&path).unwrap(), h);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_histogram(Path::new("/nonexistent/hist.json")).unwrap_err();
        assert!(matches!(err, hcp_core::Error::Io(_)));
    }
}
