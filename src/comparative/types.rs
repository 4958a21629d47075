// Result records produced by the comparative analyzer

use crate::results::NoiseLevel;
use crate::stats::EffectMagnitude;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

pub const INSUFFICIENT_CORRELATION: &str = "Insufficient data for correlation";
pub const CONSTANT_CORRELATION: &str = "Undefined correlation (constant input)";
pub const INSUFFICIENT_REGRESSION: &str = "Insufficient data for regression";

/// One pairwise test between two noise levels of one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub metric: String,
    pub group1: NoiseLevel,
    pub group2: NoiseLevel,
    pub group1_mean: f64,
    pub group1_std: f64,
    pub group2_mean: f64,
    pub group2_std: f64,
    pub test_name: &'static str,
    pub statistic: f64,
    pub p_value: f64,
    pub p_value_corrected: f64,
    pub effect_size: f64,
    pub effect_magnitude: EffectMagnitude,
    pub significant: bool,
    pub interpretation: String,
}

/// Rank correlation between two metrics over their common noise levels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub metric1: String,
    pub metric2: String,
    pub test_name: &'static str,
    pub correlation: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub n: usize,
    pub interpretation: String,
}

/// Polynomial fit of a metric against noise level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionResult {
    pub metric: String,
    pub degree: usize,
    /// Constant term first; always `degree + 1` entries (NaN when not fitted)
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub p_value: f64,
    pub rmse: f64,
    pub n: usize,
    pub interpretation: String,
}

impl RegressionResult {
    pub(crate) fn unfitted(metric: &str, degree: usize, n: usize, interpretation: String) -> Self {
        Self {
            metric: metric.to_string(),
            degree,
            coefficients: vec![f64::NAN; degree + 1],
            r_squared: f64::NAN,
            adj_r_squared: f64::NAN,
            f_statistic: f64::NAN,
            p_value: f64::NAN,
            rmse: f64::NAN,
            n,
            interpretation,
        }
    }
}

/// Shapiro-Wilk verdict for one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalityTest {
    pub test: &'static str,
    pub statistic: f64,
    pub p_value: f64,
    pub normal: bool,
}

/// Equal-variance verdict across metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceTest {
    pub test: &'static str,
    pub statistic: f64,
    pub p_value: f64,
    pub homoscedastic: bool,
}

/// A diagnostic sub-test that could not run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticFailure {
    pub test: &'static str,
    /// Metric name, or "all metrics" for the cross-metric tests
    pub subject: String,
    pub reason: String,
}

/// Normality per metric plus homoscedasticity across metrics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticReport {
    pub normality: BTreeMap<String, NormalityTest>,
    pub levene: Option<VarianceTest>,
    pub bartlett: Option<VarianceTest>,
    pub failures: Vec<DiagnosticFailure>,
}

impl Serialize for DiagnosticReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (metric, test) in &self.normality {
            map.serialize_entry(&format!("{metric}_normality"), test)?;
        }
        if self.levene.is_some() || self.bartlett.is_some() {
            let homoscedasticity = Homoscedasticity {
                levene_test: self.levene.as_ref(),
                bartlett_test: self.bartlett.as_ref(),
            };
            map.serialize_entry("homoscedasticity", &homoscedasticity)?;
        }
        if !self.failures.is_empty() {
            map.serialize_entry("failures", &self.failures)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct Homoscedasticity<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    levene_test: Option<&'a VarianceTest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bartlett_test: Option<&'a VarianceTest>,
}
