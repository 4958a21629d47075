// Statistical primitives for small, noisy per-noise-level samples
//
// Every routine here works on a handful of values (one per noise level), so
// degenerate input is the normal case rather than the exception: fewer
// samples than a test needs, zero variance, ties, non-finite values. Each
// routine reports those as a StatsError instead of returning garbage, and the
// analyzers decide whether to skip the sub-result or emit a sentinel.
//
// Scientific Foundation:
// [1] Mann, H. B., & Whitney, D. R. (1947). On a test of whether one of two
//     random variables is stochastically larger than the other. Ann. Math. Stat.
// [2] Royston, P. (1995). Remark AS R94: A remark on algorithm AS 181, the
//     W-test for normality. Applied Statistics 44(4).
// [3] Holm, S. (1979). A simple sequentially rejective multiple test procedure.
// [4] Benjamini, Y., & Hochberg, Y. (1995). Controlling the false discovery rate.
// [5] Efron, B. (1979). Bootstrap methods: another look at the jackknife.
// [6] Romano, J. et al. (2006). Appropriate statistics for ordinal level data
//     (effect size bands 0.147 / 0.330 / 0.474).
//
// Implementation:
// - statrs (crates.io) supplies the t, F, chi-squared and normal distributions
// - test statistics are computed in f64 throughout

mod bootstrap;
mod correction;
mod descriptive;
mod effect;
mod hypothesis;
mod regression;

pub use bootstrap::{bootstrap_mean, BootstrapDistribution, ResampleError, Resampler, RngResampler};
pub use correction::{correct_p_values, CorrectionMethod};
pub use descriptive::{
    all_finite, mean, median, percentile, population_std_dev, rank_average, std_dev, variance,
};
pub use effect::{cohens_d, standardized_mean_difference, EffectMagnitude};
pub use hypothesis::{
    bartlett, levene, mann_whitney_u, one_way_anova, shapiro_wilk, spearman, AnovaTable,
    RankCorrelation, TestOutcome,
};
pub use regression::{fit_polynomial, PolynomialFit};

pub(crate) use hypothesis::t_critical;

use thiserror::Error;

/// Why a statistical routine could not produce a value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("Insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Input lengths differ: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Zero variance in input")]
    ZeroVariance,

    #[error("Non-finite value in input")]
    NonFinite,

    #[error("Design matrix is singular")]
    Singular,

    #[error("Distribution error: {0}")]
    Distribution(String),
}

/// Result type for statistical primitives
pub type StatsResult<T> = std::result::Result<T, StatsError>;
