// Result records produced by the sensitivity analyzer

use crate::results::NoiseLevel;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const INSUFFICIENT_SENSITIVITY: &str = "Insufficient data for analysis";
/// Start of the interpretation of a sweep run without a translation corpus
pub const NOT_REMEASURED_PREFIX: &str = "Not re-measured across";
pub const INSUFFICIENT_ANOVA: &str = "Insufficient data for ANOVA";
pub const CONSTANT_ANOVA: &str = "Undefined ANOVA (constant input)";

/// One setting of a swept parameter
///
/// Serialized as the bare dimension or as a `[lo, hi]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// TF-IDF vocabulary size
    Dimension(usize),
    /// Inclusive n-gram range
    NgramRange(usize, usize),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Dimension(d) => write!(f, "{d}"),
            ParameterValue::NgramRange(lo, hi) => write!(f, "({lo}, {hi})"),
        }
    }
}

/// Effect of one swept parameter on semantic distance
///
/// The per-value vectors are parallel to `parameter_values`; they are empty
/// for the insufficient-data sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityResult {
    pub parameter_name: String,
    pub parameter_values: Vec<ParameterValue>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
    pub ci_lower: Vec<f64>,
    pub ci_upper: Vec<f64>,
    /// Spearman correlation between sweep position and mean distance
    pub correlation: f64,
    pub p_value: f64,
    /// Cohen's d between the first and the last swept value
    pub effect_size: f64,
    pub interpretation: String,
}

impl SensitivityResult {
    pub(crate) fn insufficient(parameter_name: &str) -> Self {
        Self {
            parameter_name: parameter_name.to_string(),
            parameter_values: Vec::new(),
            means: Vec::new(),
            stds: Vec::new(),
            ci_lower: Vec::new(),
            ci_upper: Vec::new(),
            correlation: f64::NAN,
            p_value: f64::NAN,
            effect_size: f64::NAN,
            interpretation: INSUFFICIENT_SENSITIVITY.to_string(),
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.interpretation == INSUFFICIENT_SENSITIVITY
    }
}

/// Bootstrap summary of one metric's mean
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootstrapResult {
    pub metric: String,
    pub observed: f64,
    pub bootstrap_mean: f64,
    pub bootstrap_std: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    /// Bootstrap mean minus observed mean
    pub bias: f64,
    pub n_iterations: usize,
}

/// Coarse grouping of noise levels used as the ANOVA factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseBand {
    /// Below 25%
    Low,
    /// 25% to 39%
    Medium,
    /// 40% and above
    High,
}

impl NoiseBand {
    pub fn of(level: NoiseLevel) -> Self {
        match level {
            0..=24 => NoiseBand::Low,
            25..=39 => NoiseBand::Medium,
            _ => NoiseBand::High,
        }
    }
}

/// One-way ANOVA of a metric across noise bands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaResult {
    pub metric: String,
    pub test_name: &'static str,
    pub f_statistic: f64,
    pub p_value: f64,
    pub df_between: usize,
    pub df_within: usize,
    pub eta_squared: f64,
    /// Observations per band
    pub group_sizes: BTreeMap<NoiseBand, usize>,
    pub interpretation: String,
}

impl AnovaResult {
    pub(crate) fn degenerate(
        metric: &str,
        group_sizes: BTreeMap<NoiseBand, usize>,
        interpretation: &str,
    ) -> Self {
        Self {
            metric: metric.to_string(),
            test_name: super::ONE_WAY_ANOVA,
            f_statistic: f64::NAN,
            p_value: f64::NAN,
            df_between: 0,
            df_within: 0,
            eta_squared: f64::NAN,
            group_sizes,
            interpretation: interpretation.to_string(),
        }
    }
}
