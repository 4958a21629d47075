//! Results bundle: metric name → noise level → scalar
//!
//! The bundle is read from `analysis_results_local.json`, whose metric series
//! are JSON objects keyed by string-encoded noise levels. Keys are parsed into
//! integers so levels always sort numerically.

use crate::error::{AnalysisError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Noise level as an integer percentage (0–50)
pub type NoiseLevel = u32;

/// Noise levels the translation experiment runs at
pub const NOISE_LEVELS: [NoiseLevel; 7] = [0, 10, 20, 25, 30, 40, 50];

/// File name of the persisted results inside the data directory
pub const RESULTS_FILE_NAME: &str = "analysis_results_local.json";

pub const SEMANTIC_DISTANCES: &str = "semantic_distances";
pub const TEXT_SIMILARITIES: &str = "text_similarities";
pub const WORD_OVERLAPS: &str = "word_overlaps";

/// Per-noise-level values of one metric, ordered by level
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricSeries {
    values: BTreeMap<NoiseLevel, f64>,
}

impl MetricSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value at a level, replacing any previous one
    pub fn insert(&mut self, level: NoiseLevel, value: f64) {
        self.values.insert(level, value);
    }

    pub fn get(&self, level: NoiseLevel) -> Option<f64> {
        self.values.get(&level).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Levels in ascending order
    pub fn levels(&self) -> Vec<NoiseLevel> {
        self.values.keys().copied().collect()
    }

    /// Values in ascending level order
    pub fn values(&self) -> Vec<f64> {
        self.values.values().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NoiseLevel, f64)> + '_ {
        self.values.iter().map(|(&l, &v)| (l, v))
    }

    /// Paired values at levels present in both series, in level order
    pub fn common_levels(&self, other: &MetricSeries) -> (Vec<NoiseLevel>, Vec<f64>, Vec<f64>) {
        let mut levels = Vec::new();
        let mut left = Vec::new();
        let mut right = Vec::new();
        for (level, value) in self.iter() {
            if let Some(other_value) = other.get(level) {
                levels.push(level);
                left.push(value);
                right.push(other_value);
            }
        }
        (levels, left, right)
    }
}

impl FromIterator<(NoiseLevel, f64)> for MetricSeries {
    fn from_iter<I: IntoIterator<Item = (NoiseLevel, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// All metric series of one experiment run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultsBundle {
    metrics: BTreeMap<String, MetricSeries>,
}

impl ResultsBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `analysis_results_local.json` from a results directory
    ///
    /// # Errors
    /// - [`AnalysisError::DirectoryNotFound`] when `data_path` does not exist
    /// - [`AnalysisError::ResultsFileNotFound`] when the file is absent
    /// - [`AnalysisError::LoadFailed`] when the file cannot be read or parsed
    pub fn load(data_path: impl AsRef<Path>) -> Result<Self> {
        let data_path = data_path.as_ref();
        if !data_path.exists() {
            return Err(AnalysisError::DirectoryNotFound(data_path.to_path_buf()));
        }

        let file = results_file_path(data_path);
        if !file.exists() {
            return Err(AnalysisError::ResultsFileNotFound(file));
        }

        let text = std::fs::read_to_string(&file).map_err(|e| AnalysisError::LoadFailed {
            path: file.clone(),
            reason: e.to_string(),
        })?;

        let bundle = Self::from_json_str(&text).map_err(|reason| AnalysisError::LoadFailed {
            path: file.clone(),
            reason,
        })?;

        tracing::debug!(
            "Loaded {} metrics from {}",
            bundle.metrics.len(),
            file.display()
        );
        Ok(bundle)
    }

    /// Parse a bundle from JSON text
    ///
    /// Only JSON well-formedness is enforced. Non-object metrics, non-integer
    /// level keys and non-numeric values are skipped with a warning.
    pub fn from_json_str(text: &str) -> std::result::Result<Self, String> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
        let serde_json::Value::Object(root) = value else {
            return Err("top-level JSON value is not an object".to_string());
        };

        let mut bundle = ResultsBundle::new();
        for (metric, series_value) in root {
            let serde_json::Value::Object(entries) = series_value else {
                tracing::warn!("Skipping metric {}: not an object", metric);
                continue;
            };

            let mut series = MetricSeries::new();
            for (key, value) in entries {
                let Ok(level) = key.trim().parse::<NoiseLevel>() else {
                    tracing::warn!("Skipping {}[{}]: noise level is not an integer", metric, key);
                    continue;
                };
                let Some(number) = value.as_f64() else {
                    tracing::warn!("Skipping {}[{}]: value is not a number", metric, key);
                    continue;
                };
                series.insert(level, number);
            }
            bundle.metrics.insert(metric, series);
        }
        Ok(bundle)
    }

    pub fn insert(&mut self, metric: impl Into<String>, series: MetricSeries) {
        self.metrics.insert(metric.into(), series);
    }

    pub fn metric(&self, name: &str) -> Option<&MetricSeries> {
        self.metrics.get(name)
    }

    /// Metric names in sorted order
    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricSeries)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Number of noise levels recorded per metric
    pub fn sample_sizes(&self) -> BTreeMap<String, usize> {
        self.metrics
            .iter()
            .map(|(k, v)| (k.clone(), v.len()))
            .collect()
    }

    /// `semantic_distances` when present, otherwise the first metric by name
    pub fn primary_metric(&self) -> Option<(&str, &MetricSeries)> {
        self.metrics
            .get_key_value(SEMANTIC_DISTANCES)
            .or_else(|| self.metrics.iter().next())
            .map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, MetricSeries)> for ResultsBundle {
    fn from_iter<I: IntoIterator<Item = (String, MetricSeries)>>(iter: I) -> Self {
        Self {
            metrics: iter.into_iter().collect(),
        }
    }
}

/// Location of the results file inside a data directory
pub fn results_file_path(data_path: &Path) -> PathBuf {
    data_path.join(RESULTS_FILE_NAME)
}
