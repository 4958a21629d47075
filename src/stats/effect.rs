// Effect sizes and their qualitative bands

use super::descriptive::{mean, variance};
use serde::Serialize;
use std::fmt;

/// Upper bound (exclusive) of the negligible band
pub const NEGLIGIBLE_BOUND: f64 = 0.147;
/// Upper bound (exclusive) of the small band
pub const SMALL_BOUND: f64 = 0.330;
/// Upper bound (exclusive) of the medium band; at or above is large
pub const MEDIUM_BOUND: f64 = 0.474;

/// Qualitative magnitude of an effect size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectMagnitude {
    /// |e| < 0.147
    Negligible,
    /// 0.147 <= |e| < 0.330
    Small,
    /// 0.330 <= |e| < 0.474
    Medium,
    /// |e| >= 0.474
    Large,
}

impl EffectMagnitude {
    /// Classify by absolute value; NaN counts as negligible
    pub fn classify(effect: f64) -> Self {
        let e = effect.abs();
        if e.is_nan() || e < NEGLIGIBLE_BOUND {
            EffectMagnitude::Negligible
        } else if e < SMALL_BOUND {
            EffectMagnitude::Small
        } else if e < MEDIUM_BOUND {
            EffectMagnitude::Medium
        } else {
            EffectMagnitude::Large
        }
    }
}

impl fmt::Display for EffectMagnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectMagnitude::Negligible => write!(f, "negligible"),
            EffectMagnitude::Small => write!(f, "small"),
            EffectMagnitude::Medium => write!(f, "medium"),
            EffectMagnitude::Large => write!(f, "large"),
        }
    }
}

fn pooled_std(a: &[f64], b: &[f64]) -> f64 {
    let df = a.len() + b.len();
    if df <= 2 {
        return 0.0;
    }
    let pooled_var = ((a.len().saturating_sub(1)) as f64 * variance(a)
        + (b.len().saturating_sub(1)) as f64 * variance(b))
        / (df - 2) as f64;
    pooled_var.sqrt()
}

/// Cohen's d of `b` relative to `a` with pooled standard deviation
///
/// Zero or undefined pooled variance yields 0.0 rather than a division error.
pub fn cohens_d(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let sd = pooled_std(a, b);
    if sd > 0.0 && sd.is_finite() {
        (mean(b) - mean(a)) / sd
    } else {
        0.0
    }
}

/// Standardized mean difference of `b` relative to `a`
///
/// Single-observation groups have no spread to standardize by; the raw mean
/// difference is returned then, which keeps bounded metrics on their own scale.
pub fn standardized_mean_difference(a: &[f64], b: &[f64]) -> f64 {
    let diff = mean(b) - mean(a);
    let sd = pooled_std(a, b);
    if sd > 0.0 && sd.is_finite() {
        diff / sd
    } else {
        diff
    }
}
