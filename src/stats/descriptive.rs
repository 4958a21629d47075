// Descriptive statistics over f64 slices
//
// Moments come from statrs' streaming `Statistics`, order statistics from
// its selection-based `Data` container. Empty and single-sample inputs are
// mapped to the sentinels the analyzers expect.

use statrs::statistics::{Data, Median, OrderStatistics, Statistics};

/// Arithmetic mean (NaN for empty input)
pub fn mean(values: &[f64]) -> f64 {
    values.mean()
}

/// Sample variance with Bessel's correction (0.0 below two samples)
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.variance()
}

/// Sample standard deviation (0.0 below two samples)
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.std_dev()
}

/// Population standard deviation (NaN for empty input)
pub fn population_std_dev(values: &[f64]) -> f64 {
    values.population_std_dev()
}

/// Median (NaN for empty input)
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    Data::new(values.to_vec()).median()
}

/// Percentile with linear interpolation between order statistics
///
/// `q` is in percent (0–100). Matches the default ("linear") method of most
/// numeric libraries. Input order does not matter.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    let mut data = Data::new(values.to_vec());
    let index = (q.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    // order_statistic is 1-based
    let low_value = data.order_statistic(lower + 1);
    if lower == upper {
        return low_value;
    }
    let weight = index - lower as f64;
    low_value * (1.0 - weight) + data.order_statistic(upper + 1) * weight
}

/// 1-based ranks, ties receive the average of the ranks they span
pub fn rank_average(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Positions i..=j share the average of ranks i+1..=j+1
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

pub fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let v = [2.0, 4.0, 6.0, 8.0];
        assert_eq!(mean(&v), 5.0);
        // Sample variance: 20 / 3
        assert!((variance(&v) - 20.0 / 3.0).abs() < 1e-12);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_std_dev_single_sample_is_zero() {
        assert_eq!(std_dev(&[0.4]), 0.0);
        assert_eq!(std_dev(&[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[9.0, 1.0, 5.0, 7.0, 3.0]), 5.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 100.0), 5.0);
        assert!((percentile(&sorted, 2.5) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_ignores_input_order() {
        let shuffled = [5.0, 1.0, 4.0, 2.0, 3.0];
        assert_eq!(percentile(&shuffled, 50.0), 3.0);
        assert!((percentile(&shuffled, 97.5) - 4.9).abs() < 1e-12);
        assert!(percentile(&[], 50.0).is_nan());
        assert_eq!(percentile(&[0.7], 90.0), 0.7);
    }

    #[test]
    fn test_population_std_dev() {
        // Population variance of [2, 4, 6, 8] is 20 / 4
        assert!((population_std_dev(&[2.0, 4.0, 6.0, 8.0]) - 5.0f64.sqrt()).abs() < 1e-12);
        assert_eq!(population_std_dev(&[0.5; 6]), 0.0);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_rank_average_with_ties() {
        assert_eq!(rank_average(&[10.0, 20.0, 20.0, 5.0]), vec![2.0, 3.5, 3.5, 1.0]);
    }
}
