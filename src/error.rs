//! Error types for the analysis core
//!
//! Insufficient data is never an error here: analyzers return results carrying
//! a sentinel interpretation instead. These variants cover setup, corruption,
//! resampling and persistence failures only.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by analyzers, loaders and report writers
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Results directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Results file not found: {}", .0.display())]
    ResultsFileNotFound(PathBuf),

    #[error("Failed to load results from {}: {reason}", path.display())]
    LoadFailed { path: PathBuf, reason: String },

    #[error("Vector dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("Bootstrap resampling failed: {0}")]
    Bootstrap(String),

    #[error("Unsupported polynomial degree {0} (supported: 1, 2, 3)")]
    UnsupportedDegree(usize),

    #[error("Unknown correction method: {0} (expected bonferroni, holm, fdr_bh or none)")]
    UnknownCorrection(String),

    #[error("Cannot save {kind} report to {}: {source}", path.display())]
    ReportWrite {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build report: {0}")]
    Serialize(#[from] crate::normalize::DatumError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Translation corpus unavailable: {0}")]
    Corpus(String),
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_failed_message_names_cause() {
        let err = AnalysisError::LoadFailed {
            path: PathBuf::from("results/analysis_results_local.json"),
            reason: "expected value at line 1 column 2".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to load results"));
        assert!(msg.contains("line 1 column 2"));
    }

    #[test]
    fn test_report_write_message_carries_source() {
        let err = AnalysisError::ReportWrite {
            kind: "comparative",
            path: PathBuf::from("/root/report.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Denied"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Cannot save comparative report"));
        assert!(msg.contains("Denied"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_directory_not_found_mentions_path() {
        let err = AnalysisError::DirectoryNotFound(PathBuf::from("missing/dir"));
        assert!(err.to_string().contains("directory not found"));
        assert!(err.to_string().contains("missing/dir"));
    }
}
