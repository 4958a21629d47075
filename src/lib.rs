//! Deriva - statistical analysis of semantic drift in noisy translation chains
//!
//! A sentence with injected spelling noise goes through a chain of
//! translations; this library measures how far the result drifts from the
//! clean original at each noise level and analyses those measurements with
//! pairwise tests, correlation, regression, diagnostics, parameter sweeps,
//! bootstrap intervals, effect sizes and ANOVA.

pub mod cli;
pub mod comparative;
pub mod config;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod report;
pub mod results;
pub mod sensitivity;
pub mod stats;

pub use comparative::ComparativeAnalyzer;
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
pub use normalize::{convert_numeric_types, to_datum, Datum, NanPolicy};
pub use results::{MetricSeries, NoiseLevel, ResultsBundle};
pub use sensitivity::SensitivityAnalyzer;
pub use stats::CorrectionMethod;
