// Comparative analysis of drift metrics across noise levels
//
// Answers "does drift differ between noise levels, and how do the metrics
// move together?" over a results bundle holding one value per noise level.
// Samples are tiny, so every operation treats degenerate input as a normal
// outcome: a failing pairwise test is skipped, a failing diagnostic is
// recorded, and too few points yield a sentinel interpretation.
//
// Scientific Foundation:
// [1] Mann & Whitney (1947): rank-sum test for the pairwise comparisons.
// [3] Holm (1979) / [4] Benjamini & Hochberg (1995): the family of p-values
//     produced by one pairwise call is corrected together.
// [2] Royston (1995): Shapiro-Wilk normality diagnostics.
//
// Implementation:
// - Statistical primitives from crate::stats (statrs distributions)
// - Reports normalized through crate::normalize and written by crate::report

mod types;

pub use types::{
    ComparisonResult, CorrelationResult, DiagnosticFailure, DiagnosticReport, NormalityTest,
    RegressionResult, VarianceTest, CONSTANT_CORRELATION, INSUFFICIENT_CORRELATION,
    INSUFFICIENT_REGRESSION,
};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::normalize::{convert_numeric_types, to_datum, Datum};
use crate::report::{write_report, ReportMetadata};
use crate::results::{NoiseLevel, ResultsBundle, SEMANTIC_DISTANCES};
use crate::stats::{
    bartlett, correct_p_values, fit_polynomial, levene, mann_whitney_u, mean,
    shapiro_wilk, spearman, standardized_mean_difference, std_dev, CorrectionMethod,
    EffectMagnitude, StatsError, TestOutcome,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Polynomial degrees the regression supports
pub const SUPPORTED_DEGREES: std::ops::RangeInclusive<usize> = 1..=3;

const MANN_WHITNEY: &str = "Mann-Whitney U";
const SPEARMAN: &str = "Spearman";
const SHAPIRO_WILK: &str = "Shapiro-Wilk";
const LEVENE: &str = "Levene";
const BARTLETT: &str = "Bartlett";
const ALL_METRICS: &str = "all metrics";

/// Pairwise, correlation, regression and diagnostic analysis of a results bundle
#[derive(Debug, Clone)]
pub struct ComparativeAnalyzer {
    data_path: PathBuf,
    results: ResultsBundle,
    config: AnalysisConfig,
}

impl ComparativeAnalyzer {
    /// Load `analysis_results_local.json` from `data_path` with default settings
    pub fn new(data_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(data_path, AnalysisConfig::default())
    }

    pub fn with_config(data_path: impl AsRef<Path>, config: AnalysisConfig) -> Result<Self> {
        config.validate().map_err(AnalysisError::Config)?;
        let data_path = data_path.as_ref().to_path_buf();
        let results = ResultsBundle::load(&data_path)?;
        info!(
            "Comparative analyzer loaded {} metrics from {}",
            results.len(),
            data_path.display()
        );
        Ok(Self {
            data_path,
            results,
            config,
        })
    }

    /// Analyzer over an in-memory bundle, which it takes ownership of
    pub fn from_bundle(results: ResultsBundle, config: AnalysisConfig) -> Self {
        Self {
            data_path: PathBuf::from("<in-memory>"),
            results,
            config,
        }
    }

    pub fn results(&self) -> &ResultsBundle {
        &self.results
    }

    /// Replace the analyzed bundle
    pub fn set_results(&mut self, results: ResultsBundle) {
        self.results = results;
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Rank-sum test for every unordered pair of noise levels of `metric`
    ///
    /// Returns C(n, 2) results for n levels, minus any pair whose test could
    /// not run (e.g. identical values). P-values are corrected together.
    pub fn pairwise_comparisons(
        &self,
        metric: &str,
        correction: CorrectionMethod,
    ) -> Vec<ComparisonResult> {
        let Some(series) = self.results.metric(metric) else {
            debug!("No metric named {} for pairwise comparisons", metric);
            return Vec::new();
        };
        let groups: Vec<(NoiseLevel, Vec<f64>)> =
            series.iter().map(|(level, v)| (level, vec![v])).collect();

        let mut comparisons = Vec::new();
        for (i, (level1, group1)) in groups.iter().enumerate() {
            for (level2, group2) in &groups[i + 1..] {
                let outcome = match mann_whitney_u(group1, group2) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(
                            "Skipping {} {}% vs {}%: {}",
                            metric, level1, level2, e
                        );
                        continue;
                    }
                };
                let effect_size = standardized_mean_difference(group1, group2);
                comparisons.push(ComparisonResult {
                    metric: metric.to_string(),
                    group1: *level1,
                    group2: *level2,
                    group1_mean: mean(group1),
                    group1_std: std_dev(group1),
                    group2_mean: mean(group2),
                    group2_std: std_dev(group2),
                    test_name: MANN_WHITNEY,
                    statistic: outcome.statistic,
                    p_value: outcome.p_value,
                    p_value_corrected: outcome.p_value,
                    effect_size,
                    effect_magnitude: EffectMagnitude::classify(effect_size),
                    significant: false,
                    interpretation: String::new(),
                });
            }
        }

        let raw: Vec<f64> = comparisons.iter().map(|c| c.p_value).collect();
        let corrected = correct_p_values(&raw, correction);
        for (comparison, p) in comparisons.iter_mut().zip(corrected) {
            comparison.p_value_corrected = p;
            comparison.significant = p < self.config.significance_level;
            comparison.interpretation = format!(
                "{} difference (p_corrected={:.4}) with {} effect",
                if comparison.significant {
                    "Significant"
                } else {
                    "No significant"
                },
                p,
                comparison.effect_magnitude
            );
        }
        debug!(
            "{} pairwise comparisons for {} ({})",
            comparisons.len(),
            metric,
            correction
        );
        comparisons
    }

    /// [`pairwise_comparisons`](Self::pairwise_comparisons) of semantic
    /// distances with Bonferroni correction
    pub fn pairwise_semantic_distances(&self) -> Vec<ComparisonResult> {
        self.pairwise_comparisons(SEMANTIC_DISTANCES, CorrectionMethod::Bonferroni)
    }

    /// Spearman correlation for every unordered pair of metrics, in name order
    pub fn correlation_analysis(&self) -> Vec<CorrelationResult> {
        let names = self.results.metric_names();
        let mut correlations = Vec::new();
        for (i, first) in names.iter().enumerate() {
            for second in &names[i + 1..] {
                correlations.push(self.correlate(first, second));
            }
        }
        correlations
    }

    fn correlate(&self, metric1: &str, metric2: &str) -> CorrelationResult {
        let mut result = CorrelationResult {
            metric1: metric1.to_string(),
            metric2: metric2.to_string(),
            test_name: SPEARMAN,
            correlation: f64::NAN,
            p_value: f64::NAN,
            ci_lower: f64::NAN,
            ci_upper: f64::NAN,
            n: 0,
            interpretation: INSUFFICIENT_CORRELATION.to_string(),
        };
        let (Some(a), Some(b)) = (self.results.metric(metric1), self.results.metric(metric2)) else {
            return result;
        };
        let (levels, x, y) = a.common_levels(b);
        result.n = levels.len();
        if levels.len() < 3 {
            return result;
        }

        match spearman(&x, &y, self.config.confidence_level) {
            Ok(r) => {
                result.correlation = r.coefficient;
                result.p_value = r.p_value;
                result.ci_lower = r.ci_lower;
                result.ci_upper = r.ci_upper;
                result.interpretation =
                    describe_correlation(r.coefficient, r.p_value, self.config.significance_level);
            }
            Err(StatsError::ZeroVariance) => {
                result.interpretation = CONSTANT_CORRELATION.to_string();
            }
            Err(e) => {
                warn!("Correlation {} vs {} failed: {}", metric1, metric2, e);
                result.interpretation = format!("Correlation failed: {e}");
            }
        }
        result
    }

    /// Fit the primary metric (`semantic_distances`, else the first by name)
    /// against noise level
    pub fn regression_analysis(&self, degree: usize) -> Result<RegressionResult> {
        match self.results.primary_metric() {
            Some((name, _)) => self.regression_analysis_for(name, degree),
            None => {
                check_degree(degree)?;
                Ok(RegressionResult::unfitted(
                    "",
                    degree,
                    0,
                    INSUFFICIENT_REGRESSION.to_string(),
                ))
            }
        }
    }

    /// Fit `metric` against noise level with a polynomial of `degree` (1–3)
    pub fn regression_analysis_for(&self, metric: &str, degree: usize) -> Result<RegressionResult> {
        check_degree(degree)?;
        let (x, y): (Vec<f64>, Vec<f64>) = match self.results.metric(metric) {
            Some(series) => series.iter().map(|(level, v)| (level as f64, v)).unzip(),
            None => (Vec::new(), Vec::new()),
        };
        let n = x.len();
        if n <= degree {
            return Ok(RegressionResult::unfitted(
                metric,
                degree,
                n,
                INSUFFICIENT_REGRESSION.to_string(),
            ));
        }

        let fit = match fit_polynomial(&x, &y, degree) {
            Ok(fit) => fit,
            Err(StatsError::ZeroVariance) => {
                return Ok(RegressionResult::unfitted(
                    metric,
                    degree,
                    n,
                    "Undefined fit (constant input)".to_string(),
                ));
            }
            Err(e) => {
                warn!("Degree-{} regression of {} failed: {}", degree, metric, e);
                return Ok(RegressionResult::unfitted(
                    metric,
                    degree,
                    n,
                    format!("Regression failed: {e}"),
                ));
            }
        };

        Ok(RegressionResult {
            metric: metric.to_string(),
            degree,
            interpretation: describe_fit(fit.r_squared).to_string(),
            coefficients: fit.coefficients,
            r_squared: fit.r_squared,
            adj_r_squared: fit.adj_r_squared,
            f_statistic: fit.f_statistic,
            p_value: fit.p_value,
            rmse: fit.rmse,
            n,
        })
    }

    /// Normality per metric and equal variance across metrics
    ///
    /// A test that cannot run is listed in `failures`; the others still run.
    pub fn diagnostic_tests(&self) -> DiagnosticReport {
        let alpha = self.config.significance_level;
        let mut report = DiagnosticReport::default();

        for (metric, series) in self.results.iter() {
            if series.len() < 3 {
                debug!("Skipping normality test for {}: {} values", metric, series.len());
                continue;
            }
            match shapiro_wilk(&series.values()) {
                Ok(outcome) => {
                    report.normality.insert(
                        metric.to_string(),
                        NormalityTest {
                            test: SHAPIRO_WILK,
                            statistic: outcome.statistic,
                            p_value: outcome.p_value,
                            normal: outcome.p_value > alpha,
                        },
                    );
                }
                Err(e) => {
                    warn!("Normality test for {} failed: {}", metric, e);
                    report.failures.push(DiagnosticFailure {
                        test: SHAPIRO_WILK,
                        subject: metric.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let groups: Vec<Vec<f64>> = self
            .results
            .iter()
            .map(|(_, series)| series.values())
            .filter(|values| values.len() >= 2)
            .collect();
        if groups.len() < 2 {
            debug!("Skipping homoscedasticity tests: {} usable metrics", groups.len());
            return report;
        }

        report.levene = variance_verdict(LEVENE, levene(&groups), alpha, &mut report.failures);
        report.bartlett = variance_verdict(BARTLETT, bartlett(&groups), alpha, &mut report.failures);
        report
    }

    /// Run every comparative analysis and write the report to `output_file`
    ///
    /// Returns the normalized report tree that was written.
    pub fn generate_comparative_report(&self, output_file: impl AsRef<Path>) -> Result<Datum> {
        let output_file = output_file.as_ref();
        let correction = self.config.correction;

        let pairwise_comparisons = self
            .results
            .metric_names()
            .into_iter()
            .map(|metric| (metric, self.pairwise_comparisons(metric, correction)))
            .collect();

        let mut regression = BTreeMap::new();
        for (label, degree) in [("linear", 1), ("quadratic", 2), ("cubic", 3)] {
            regression.insert(label, self.regression_analysis(degree)?);
        }

        let report = to_datum(&ComparativeReport {
            metadata: ReportMetadata::new("comparative", &self.data_path, &self.results),
            pairwise_comparisons,
            correction_method: correction,
            correlations: self.correlation_analysis(),
            regression,
            diagnostics: self.diagnostic_tests(),
        })?;

        write_report(
            "comparative",
            output_file,
            &report,
            self.config.comparative_nan_policy,
        )?;
        Ok(convert_numeric_types(report))
    }
}

/// Layout of the comparative report file
#[derive(Serialize)]
struct ComparativeReport<'a> {
    metadata: ReportMetadata,
    pairwise_comparisons: BTreeMap<&'a str, Vec<ComparisonResult>>,
    correction_method: CorrectionMethod,
    correlations: Vec<CorrelationResult>,
    regression: BTreeMap<&'static str, RegressionResult>,
    diagnostics: DiagnosticReport,
}

fn variance_verdict(
    test: &'static str,
    outcome: std::result::Result<TestOutcome, StatsError>,
    alpha: f64,
    failures: &mut Vec<DiagnosticFailure>,
) -> Option<VarianceTest> {
    match outcome {
        Ok(outcome) => Some(VarianceTest {
            test,
            statistic: outcome.statistic,
            p_value: outcome.p_value,
            homoscedastic: outcome.p_value > alpha,
        }),
        Err(e) => {
            warn!("{} test failed: {}", test, e);
            failures.push(DiagnosticFailure {
                test,
                subject: ALL_METRICS.to_string(),
                reason: e.to_string(),
            });
            None
        }
    }
}

fn check_degree(degree: usize) -> Result<()> {
    if SUPPORTED_DEGREES.contains(&degree) {
        Ok(())
    } else {
        Err(AnalysisError::UnsupportedDegree(degree))
    }
}

/// Qualitative band of a coefficient of determination
fn describe_fit(r_squared: f64) -> &'static str {
    if r_squared >= 0.9 {
        "Excellent fit"
    } else if r_squared >= 0.7 {
        "Good fit"
    } else if r_squared >= 0.5 {
        "Moderate fit"
    } else {
        "Poor fit"
    }
}

fn describe_correlation(r: f64, p_value: f64, alpha: f64) -> String {
    let strength = match r.abs() {
        a if a >= 0.7 => "Strong",
        a if a >= 0.4 => "Moderate",
        a if a >= 0.1 => "Weak",
        _ => "Negligible",
    };
    let direction = if r >= 0.0 { "positive" } else { "negative" };
    let significance = if p_value < alpha {
        "significant"
    } else {
        "not significant"
    };
    format!("{strength} {direction} correlation ({significance}, p={p_value:.4})")
}
