//! Report assembly and persistence
//!
//! Each analyzer serializes a report struct holding a `"metadata"` section
//! plus one section per analysis into a [`Datum`] tree. Writing always
//! normalizes the tree first and goes through a sibling temporary file, so a
//! failed write never leaves a partial report.

use crate::error::{AnalysisError, Result};
use crate::normalize::{encode_json, Datum, NanPolicy};
use crate::results::ResultsBundle;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Provenance recorded at the top of every report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    /// RFC 3339 UTC timestamp
    #[serde(rename = "timestamp")]
    pub generated_at: String,
    pub data_path: String,
    pub sample_sizes: BTreeMap<String, usize>,
    #[serde(rename = "version")]
    pub crate_version: &'static str,
    /// "comparative" or "sensitivity"
    pub analysis: &'static str,
}

impl ReportMetadata {
    pub fn new(analysis: &'static str, data_path: &Path, results: &ResultsBundle) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            data_path: data_path.display().to_string(),
            sample_sizes: results.sample_sizes(),
            crate_version: env!("CARGO_PKG_VERSION"),
            analysis,
        }
    }
}

/// Normalize, encode and atomically write `report` to `path`
///
/// Missing parent directories are created. Any I/O failure is reported as
/// [`AnalysisError::ReportWrite`] naming `kind` and the underlying cause.
pub fn write_report(kind: &'static str, path: &Path, report: &Datum, policy: NanPolicy) -> Result<()> {
    let wrap = |source: std::io::Error| AnalysisError::ReportWrite {
        kind,
        path: path.to_path_buf(),
        source,
    };
    let text = encode_json(report, policy, true).map_err(|e| wrap(e.into()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }

    let temp = temp_path(path);
    let written = write_then_rename(&temp, path, text.as_bytes());
    if let Err(e) = written {
        // Best effort: the temp file may never have been created
        let _ = std::fs::remove_file(&temp);
        return Err(wrap(e));
    }

    tracing::info!("Saved {} report to {}", kind, path.display());
    Ok(())
}

fn write_then_rename(temp: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(temp)?;
    file.write_all(bytes)?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    std::fs::rename(temp, target)
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{convert_numeric_types, to_datum};
    use crate::results::MetricSeries;

    fn bundle() -> ResultsBundle {
        let series: MetricSeries = [(0, 0.1), (10, 0.2)].into_iter().collect();
        [("semantic_distances".to_string(), series)].into_iter().collect()
    }

    #[test]
    fn test_metadata_fields() {
        let meta = ReportMetadata::new("comparative", Path::new("results"), &bundle());
        let datum = convert_numeric_types(to_datum(&meta).unwrap());
        assert_eq!(datum.get("data_path").and_then(Datum::as_str), Some("results"));
        assert_eq!(datum.get("analysis").and_then(Datum::as_str), Some("comparative"));
        assert!(datum.get("timestamp").is_some());
        assert!(datum
            .get("sample_sizes")
            .and_then(|s| s.get("semantic_distances"))
            .is_some());
    }

    #[test]
    fn test_write_report_round_trips_as_standard_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        let meta = ReportMetadata::new("sensitivity", dir.path(), &bundle());
        let mut report = BTreeMap::new();
        report.insert("metadata".to_string(), to_datum(&meta).unwrap());
        report.insert("value".to_string(), to_datum(&f64::NAN).unwrap());
        let report = Datum::Map(report);

        write_report("sensitivity", &path, &report, NanPolicy::NullOnEncode).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(parsed["value"].is_null());
        assert_eq!(parsed["metadata"]["analysis"], "sensitivity");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_failure_names_kind_and_cause() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "x").unwrap();
        let path = blocker.join("report.json");

        let err = write_report("comparative", &path, &Datum::Null, NanPolicy::Preserve).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Cannot save comparative report"));
        assert!(matches!(err, AnalysisError::ReportWrite { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // Renaming a file onto a non-empty directory fails
        let target = dir.path().join("report.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();

        let result = write_report("comparative", &target, &Datum::Null, NanPolicy::Preserve);
        assert!(result.is_err());
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
