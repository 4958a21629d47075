// Configuration for the comparative and sensitivity analyzers
//
// One explicitly constructed value is passed into each analyzer; nothing is
// read from global state. Missing TOML keys fall back to the defaults below.

use crate::error::{AnalysisError, Result};
use crate::normalize::NanPolicy;
use crate::stats::CorrectionMethod;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Analysis configuration
///
/// # Example
/// ```
/// use deriva::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.significance_level, 0.05);
/// assert_eq!(config.bootstrap_iterations, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Alpha for the significant / not significant verdict of pairwise tests
    pub significance_level: f64,

    /// Coverage of every confidence interval (correlation, sensitivity, bootstrap)
    pub confidence_level: f64,

    /// Multiple-comparison correction used by the comparative report
    pub correction: CorrectionMethod,

    /// Resamples drawn by the sensitivity report's bootstrap
    ///
    /// Default: 10 000
    pub bootstrap_iterations: usize,

    /// Seed of the report bootstrap, so reports are reproducible
    pub seed: u64,

    /// Embedding dimensions swept by the sensitivity report
    pub embedding_dimensions: Vec<usize>,

    /// N-gram ranges swept by the sensitivity report
    pub ngram_ranges: Vec<(usize, usize)>,

    /// How non-finite floats are written in the comparative report
    pub comparative_nan_policy: NanPolicy,

    /// How non-finite floats are written in the sensitivity report
    pub sensitivity_nan_policy: NanPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            confidence_level: 0.95,
            correction: CorrectionMethod::Holm,
            bootstrap_iterations: 10_000,
            seed: 42,
            embedding_dimensions: vec![10, 20, 50, 100, 500],
            ngram_ranges: vec![(1, 1), (1, 2), (1, 3), (2, 2)],
            comparative_nan_policy: NanPolicy::NullOnEncode,
            sensitivity_nan_policy: NanPolicy::NullOnEncode,
        }
    }
}

impl AnalysisConfig {
    /// Stricter alpha, family-wise correction and a wider interval
    pub fn strict() -> Self {
        Self {
            significance_level: 0.01,
            confidence_level: 0.99,
            correction: CorrectionMethod::Bonferroni,
            ..Self::default()
        }
    }

    /// Looser alpha with false-discovery-rate control and a cheaper bootstrap
    pub fn permissive() -> Self {
        Self {
            significance_level: 0.10,
            confidence_level: 0.90,
            correction: CorrectionMethod::FdrBh,
            bootstrap_iterations: 1_000,
            ..Self::default()
        }
    }

    /// Read a TOML file and validate it
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| AnalysisError::Config(e.to_string()))?;
        config.validate().map_err(AnalysisError::Config)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !in_open_unit_interval(self.significance_level) {
            return Err(format!(
                "significance_level must be in (0, 1), got {}",
                self.significance_level
            ));
        }

        if !in_open_unit_interval(self.confidence_level) {
            return Err(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            ));
        }

        if self.bootstrap_iterations == 0 {
            return Err("bootstrap_iterations must be >= 1".to_string());
        }

        if self.embedding_dimensions.iter().any(|&d| d == 0) {
            return Err("embedding_dimensions must all be >= 1".to_string());
        }

        if let Some((lo, hi)) = self
            .ngram_ranges
            .iter()
            .find(|(lo, hi)| *lo == 0 || lo > hi)
        {
            return Err(format!("invalid ngram range ({lo}, {hi})"));
        }

        Ok(())
    }
}

fn in_open_unit_interval(v: f64) -> bool {
    v > 0.0 && v < 1.0
}
