// Nonparametric bootstrap of the sample mean
//
// The random source sits behind the Resampler trait so tests and benchmarks
// can inject a deterministic or failing resampler.

use super::descriptive::{mean, percentile, population_std_dev};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResampleError {
    #[error("cannot resample an empty series")]
    EmptyInput,

    #[error("bootstrap needs at least one iteration")]
    ZeroIterations,

    #[error("resampler failed: {0}")]
    Source(String),
}

/// Draws resamples with replacement
pub trait Resampler {
    /// Replace the contents of `out` with `values.len()` draws from `values`
    fn resample(&mut self, values: &[f64], out: &mut Vec<f64>) -> Result<(), ResampleError>;
}

/// Resampler backed by any `rand` generator
#[derive(Debug, Clone)]
pub struct RngResampler<R: Rng> {
    rng: R,
}

impl<R: Rng> RngResampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngResampler<StdRng> {
    /// Reproducible resampler for a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Resampler for RngResampler<R> {
    fn resample(&mut self, values: &[f64], out: &mut Vec<f64>) -> Result<(), ResampleError> {
        out.clear();
        for _ in 0..values.len() {
            let drawn = values
                .choose(&mut self.rng)
                .ok_or(ResampleError::EmptyInput)?;
            out.push(*drawn);
        }
        Ok(())
    }
}

/// Bootstrap distribution of the mean
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapDistribution {
    /// Mean of the original sample
    pub observed: f64,
    /// Resampled means, sorted ascending
    pub means: Vec<f64>,
}

impl BootstrapDistribution {
    pub fn mean(&self) -> f64 {
        mean(&self.means)
    }

    /// Population standard deviation of the resampled means
    pub fn std(&self) -> f64 {
        population_std_dev(&self.means)
    }

    pub fn bias(&self) -> f64 {
        self.mean() - self.observed
    }

    /// Percentile interval at `confidence` (e.g. 0.95 → 2.5th..97.5th)
    pub fn percentile_interval(&self, confidence: f64) -> (f64, f64) {
        let alpha = (1.0 - confidence) * 100.0;
        (
            percentile(&self.means, alpha / 2.0),
            percentile(&self.means, 100.0 - alpha / 2.0),
        )
    }
}

/// Resample `values` `iterations` times and collect the means
pub fn bootstrap_mean<S: Resampler + ?Sized>(
    values: &[f64],
    iterations: usize,
    resampler: &mut S,
) -> Result<BootstrapDistribution, ResampleError> {
    if values.is_empty() {
        return Err(ResampleError::EmptyInput);
    }
    if iterations == 0 {
        return Err(ResampleError::ZeroIterations);
    }

    let mut buffer = Vec::with_capacity(values.len());
    let mut means = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        resampler.resample(values, &mut buffer)?;
        means.push(mean(&buffer));
    }
    means.sort_by(f64::total_cmp);

    Ok(BootstrapDistribution {
        observed: mean(values),
        means,
    })
}
