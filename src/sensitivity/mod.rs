// Sensitivity analysis of the drift measurements
//
// Asks how robust the semantic-distance signal is: to the embedding
// configuration (dimension and n-gram sweeps), to sampling (bootstrap), and
// how large the noise effect is (Cohen's d, ANOVA across noise bands).
//
// Scientific Foundation:
// [1] Efron & Tibshirani (1993). An Introduction to the Bootstrap.
//     Percentile intervals over resampled means.
// [2] Cohen (1988). Statistical Power Analysis for the Behavioral Sciences.
//
// Sweeps recompute semantic distances from the translation corpus when one
// is attached. Otherwise every setting sees the observed series and the
// result says the parameter was not re-measured.

mod types;

pub use types::{
    AnovaResult, BootstrapResult, NoiseBand, ParameterValue, SensitivityResult, CONSTANT_ANOVA,
    INSUFFICIENT_ANOVA, INSUFFICIENT_SENSITIVITY, NOT_REMEASURED_PREFIX,
};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::metrics::{TfidfEmbedder, TranslationCorpus};
use crate::normalize::{convert_numeric_types, to_datum, Datum};
use crate::report::{write_report, ReportMetadata};
use crate::results::{NoiseLevel, ResultsBundle, SEMANTIC_DISTANCES};
use crate::stats::{
    bootstrap_mean, cohens_d, mean, one_way_anova, spearman, std_dev, t_critical, ResampleError,
    Resampler, RngResampler, StatsError,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub(crate) const ONE_WAY_ANOVA: &str = "One-way ANOVA";

const EMBEDDING_DIMENSION: &str = "embedding_dimension";
const NGRAM_RANGE: &str = "ngram_range";

/// Parameter sweeps, bootstrap, effect sizes and ANOVA over a results bundle
#[derive(Debug, Clone)]
pub struct SensitivityAnalyzer {
    data_path: PathBuf,
    results: ResultsBundle,
    corpus: Option<TranslationCorpus>,
    config: AnalysisConfig,
}

/// Summary of one sweep point
struct SweepPoint {
    value: ParameterValue,
    distances: Vec<f64>,
}

impl SensitivityAnalyzer {
    pub fn new(data_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(data_path, AnalysisConfig::default())
    }

    pub fn with_config(data_path: impl AsRef<Path>, config: AnalysisConfig) -> Result<Self> {
        config.validate().map_err(AnalysisError::Config)?;
        let data_path = data_path.as_ref().to_path_buf();
        let results = ResultsBundle::load(&data_path)?;
        info!(
            "Sensitivity analyzer loaded {} metrics from {}",
            results.len(),
            data_path.display()
        );
        Ok(Self {
            data_path,
            results,
            corpus: None,
            config,
        })
    }

    pub fn from_bundle(results: ResultsBundle, config: AnalysisConfig) -> Self {
        Self {
            data_path: PathBuf::from("<in-memory>"),
            results,
            corpus: None,
            config,
        }
    }

    /// Attach translations so sweeps re-embed them per setting
    pub fn with_corpus(mut self, corpus: TranslationCorpus) -> Self {
        self.corpus = Some(corpus);
        self
    }

    pub fn results(&self) -> &ResultsBundle {
        &self.results
    }

    pub fn set_results(&mut self, results: ResultsBundle) {
        self.results = results;
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Sweep the TF-IDF vocabulary size
    ///
    /// Fewer than two usable settings yield the "Insufficient data for
    /// analysis" sentinel.
    pub fn embedding_dimension_sensitivity(&self, dimensions: &[usize]) -> SensitivityResult {
        let points = dimensions
            .iter()
            .filter_map(|&dim| {
                self.sweep_point(
                    ParameterValue::Dimension(dim),
                    TfidfEmbedder::default().with_max_features(dim),
                )
            })
            .collect();
        self.summarize(EMBEDDING_DIMENSION, points)
    }

    /// Sweep the configured n-gram ranges
    pub fn ngram_range_sensitivity(&self) -> SensitivityResult {
        let points = self
            .config
            .ngram_ranges
            .iter()
            .filter_map(|&(lo, hi)| {
                self.sweep_point(
                    ParameterValue::NgramRange(lo, hi),
                    TfidfEmbedder::default().with_ngram_range(lo, hi),
                )
            })
            .collect();
        self.summarize(NGRAM_RANGE, points)
    }

    fn sweep_point(&self, value: ParameterValue, embedder: TfidfEmbedder) -> Option<SweepPoint> {
        let distances = match &self.corpus {
            Some(corpus) => match corpus.semantic_distances(&embedder) {
                Ok(series) => series.values(),
                Err(e) => {
                    warn!("Skipping {}: {}", value, e);
                    return None;
                }
            },
            None => self
                .results
                .metric(SEMANTIC_DISTANCES)
                .map(|s| s.values())
                .unwrap_or_default(),
        };
        if distances.is_empty() {
            debug!("No distances for setting {}", value);
            return None;
        }
        Some(SweepPoint { value, distances })
    }

    fn summarize(&self, parameter_name: &str, points: Vec<SweepPoint>) -> SensitivityResult {
        if points.len() < 2 {
            return SensitivityResult::insufficient(parameter_name);
        }

        let mut result = SensitivityResult::insufficient(parameter_name);
        for point in &points {
            let m = mean(&point.distances);
            let sd = std_dev(&point.distances);
            let half_width = self.interval_half_width(point.distances.len(), sd);
            result.parameter_values.push(point.value);
            result.means.push(m);
            result.stds.push(sd);
            result.ci_lower.push(m - half_width);
            result.ci_upper.push(m + half_width);
        }

        let positions: Vec<f64> = (0..points.len()).map(|i| i as f64).collect();
        (result.correlation, result.p_value) =
            match spearman(&positions, &result.means, self.config.confidence_level) {
                Ok(r) => (r.coefficient, r.p_value),
                // Every setting gives the same mean: no trend at all
                Err(StatsError::ZeroVariance) => (0.0, 1.0),
                Err(StatsError::InsufficientData { .. }) => {
                    let first = result.means[0];
                    let last = result.means[result.means.len() - 1];
                    let sign = if last > first {
                        1.0
                    } else if last < first {
                        -1.0
                    } else {
                        0.0
                    };
                    (sign, f64::NAN)
                }
                Err(e) => {
                    warn!("Sweep correlation for {} failed: {}", parameter_name, e);
                    (f64::NAN, f64::NAN)
                }
            };

        let first = &points[0].distances;
        let last = &points[points.len() - 1].distances;
        result.effect_size = cohens_d(first, last);

        result.interpretation = if self.corpus.is_none() {
            format!("{NOT_REMEASURED_PREFIX} {parameter_name}: no translation corpus attached")
        } else {
            let verdict = if result.p_value < self.config.significance_level {
                "Sensitive to"
            } else {
                "Robust to"
            };
            format!(
                "{} {} (rho={:.3}, p={:.4}, d={:.3})",
                verdict, parameter_name, result.correlation, result.p_value, result.effect_size
            )
        };
        result
    }

    /// t-based half width of the mean's interval; zero for a single value
    fn interval_half_width(&self, n: usize, sd: f64) -> f64 {
        if n < 2 {
            return 0.0;
        }
        match t_critical((n - 1) as f64, self.config.confidence_level) {
            Ok(t) => t * sd / (n as f64).sqrt(),
            Err(e) => {
                warn!("No t critical value for {} samples: {}", n, e);
                f64::NAN
            }
        }
    }

    /// Bootstrap every metric's mean with the configured seed
    pub fn bootstrap_analysis(&self, n_iterations: usize) -> Result<BTreeMap<String, BootstrapResult>> {
        let mut resampler = RngResampler::seeded(self.config.seed);
        self.bootstrap_analysis_with(n_iterations, &mut resampler)
    }

    /// Bootstrap every metric's mean drawing from `resampler`
    ///
    /// Metrics without values are left out of the result. A resampler
    /// failure or zero iterations is returned as [`AnalysisError::Bootstrap`].
    pub fn bootstrap_analysis_with<R: Resampler + ?Sized>(
        &self,
        n_iterations: usize,
        resampler: &mut R,
    ) -> Result<BTreeMap<String, BootstrapResult>> {
        if n_iterations == 0 {
            return Err(AnalysisError::Bootstrap(ResampleError::ZeroIterations.to_string()));
        }
        let mut results = BTreeMap::new();
        for (metric, series) in self.results.iter() {
            if series.is_empty() {
                warn!("Skipping bootstrap of {}: no values", metric);
                continue;
            }
            let distribution = bootstrap_mean(&series.values(), n_iterations, resampler)
                .map_err(|e| AnalysisError::Bootstrap(format!("{metric}: {e}")))?;
            let (ci_lower, ci_upper) =
                distribution.percentile_interval(self.config.confidence_level);
            results.insert(
                metric.to_string(),
                BootstrapResult {
                    metric: metric.to_string(),
                    observed: distribution.observed,
                    bootstrap_mean: distribution.mean(),
                    bootstrap_std: distribution.std(),
                    ci_lower,
                    ci_upper,
                    bias: distribution.bias(),
                    n_iterations,
                },
            );
        }
        debug!("Bootstrapped {} metrics x {} iterations", results.len(), n_iterations);
        Ok(results)
    }

    /// Standardized difference between two noise levels, per metric
    ///
    /// The difference `x[b] - x[a]` is scaled by the standard deviation of the
    /// metric's whole series. Zero or undefined spread gives 0.0. Metrics
    /// lacking either level are left out.
    pub fn cohens_d_effect_size(&self, level_a: NoiseLevel, level_b: NoiseLevel) -> BTreeMap<String, f64> {
        self.results
            .iter()
            .filter_map(|(metric, series)| {
                let (a, b) = (series.get(level_a)?, series.get(level_b)?);
                let sd = std_dev(&series.values());
                let d = if sd > 0.0 && sd.is_finite() {
                    (b - a) / sd
                } else {
                    0.0
                };
                Some((metric.to_string(), d))
            })
            .collect()
    }

    /// One-way ANOVA of the primary metric across noise bands
    pub fn anova_multi_factor(&self) -> AnovaResult {
        match self.results.primary_metric() {
            Some((metric, _)) => self.anova_for(metric),
            None => AnovaResult::degenerate("", BTreeMap::new(), INSUFFICIENT_ANOVA),
        }
    }

    /// [`anova_multi_factor`](Self::anova_multi_factor) for every metric
    pub fn anova_by_metric(&self) -> BTreeMap<String, AnovaResult> {
        self.results
            .metric_names()
            .into_iter()
            .map(|metric| (metric.to_string(), self.anova_for(metric)))
            .collect()
    }

    fn anova_for(&self, metric: &str) -> AnovaResult {
        let mut bands: BTreeMap<NoiseBand, Vec<f64>> = BTreeMap::new();
        if let Some(series) = self.results.metric(metric) {
            for (level, value) in series.iter() {
                bands.entry(NoiseBand::of(level)).or_default().push(value);
            }
        }
        let group_sizes: BTreeMap<NoiseBand, usize> =
            bands.iter().map(|(band, values)| (*band, values.len())).collect();
        let groups: Vec<Vec<f64>> = bands.into_values().collect();

        let table = match one_way_anova(&groups) {
            Ok(table) => table,
            Err(StatsError::InsufficientData { .. }) => {
                return AnovaResult::degenerate(metric, group_sizes, INSUFFICIENT_ANOVA);
            }
            Err(StatsError::ZeroVariance) => {
                return AnovaResult::degenerate(metric, group_sizes, CONSTANT_ANOVA);
            }
            Err(e) => {
                warn!("ANOVA for {} failed: {}", metric, e);
                return AnovaResult::degenerate(metric, group_sizes, &format!("ANOVA failed: {e}"));
            }
        };

        let verdict = if table.p_value < self.config.significance_level {
            "Significant"
        } else {
            "No significant"
        };
        AnovaResult {
            metric: metric.to_string(),
            test_name: ONE_WAY_ANOVA,
            f_statistic: table.f_statistic,
            p_value: table.p_value,
            df_between: table.df_between,
            df_within: table.df_within,
            eta_squared: table.eta_squared,
            group_sizes,
            interpretation: format!(
                "{} effect of noise band on {} (p={:.4}, eta_squared={:.3})",
                verdict, metric, table.p_value, table.eta_squared
            ),
        }
    }

    /// Run every sensitivity analysis and write the report to `output_file`
    pub fn generate_sensitivity_report(&self, output_file: impl AsRef<Path>) -> Result<Datum> {
        let output_file = output_file.as_ref();

        let bootstrap = self.bootstrap_analysis(self.config.bootstrap_iterations)?;

        let levels: Vec<NoiseLevel> = self
            .results
            .iter()
            .flat_map(|(_, series)| series.levels())
            .collect();
        let effect_sizes = match (levels.iter().min(), levels.iter().max()) {
            (Some(&lo), Some(&hi)) if lo != hi => Some(EffectSizes {
                level_a: lo,
                level_b: hi,
                cohens_d: self.cohens_d_effect_size(lo, hi),
            }),
            _ => None,
        };

        let report = to_datum(&SensitivityReport {
            metadata: ReportMetadata::new("sensitivity", &self.data_path, &self.results),
            embedding_dimension_sensitivity: self
                .embedding_dimension_sensitivity(&self.config.embedding_dimensions),
            ngram_range_sensitivity: self.ngram_range_sensitivity(),
            bootstrap,
            effect_sizes,
            anova: self.anova_multi_factor(),
            anova_by_metric: self.anova_by_metric(),
        })?;

        write_report(
            "sensitivity",
            output_file,
            &report,
            self.config.sensitivity_nan_policy,
        )?;
        Ok(convert_numeric_types(report))
    }
}

/// Layout of the sensitivity report file
#[derive(Serialize)]
struct SensitivityReport {
    metadata: ReportMetadata,
    embedding_dimension_sensitivity: SensitivityResult,
    ngram_range_sensitivity: SensitivityResult,
    bootstrap: BTreeMap<String, BootstrapResult>,
    /// Empty object when fewer than two distinct levels exist
    #[serde(serialize_with = "effect_sizes_or_empty")]
    effect_sizes: Option<EffectSizes>,
    anova: AnovaResult,
    anova_by_metric: BTreeMap<String, AnovaResult>,
}

#[derive(Serialize)]
struct EffectSizes {
    level_a: NoiseLevel,
    level_b: NoiseLevel,
    cohens_d: BTreeMap<String, f64>,
}

fn effect_sizes_or_empty<S: serde::Serializer>(
    effect_sizes: &Option<EffectSizes>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match effect_sizes {
        Some(effects) => effects.serialize(serializer),
        None => serializer.collect_map(std::iter::empty::<(&str, f64)>()),
    }
}
