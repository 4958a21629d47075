// Least-squares polynomial fit
//
// Solved with Householder QR on the Vandermonde matrix rather than the normal
// equations; x is scaled to [-1, 1] first so cubic fits over noise levels in
// the tens stay well conditioned.

use super::descriptive::{all_finite, mean};
use super::{StatsError, StatsResult};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

/// Polynomial fit and its goodness-of-fit summary
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialFit {
    pub degree: usize,
    /// Coefficients from the constant term up to `x^degree`
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
    /// NaN when there are no residual degrees of freedom
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub p_value: f64,
    pub rmse: f64,
    pub n: usize,
}

impl PolynomialFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }
}

/// Fit `y ≈ c0 + c1·x + … + c_d·x^d` by least squares
///
/// Needs more points than the degree and a non-constant `y`.
pub fn fit_polynomial(x: &[f64], y: &[f64], degree: usize) -> StatsResult<PolynomialFit> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    let n = x.len();
    let p = degree + 1;
    if n < p {
        return Err(StatsError::InsufficientData {
            required: p,
            actual: n,
        });
    }
    if !all_finite(x) || !all_finite(y) {
        return Err(StatsError::NonFinite);
    }

    let y_mean = mean(y);
    let ss_total: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    if ss_total == 0.0 {
        return Err(StatsError::ZeroVariance);
    }

    let scale = x.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let scale = if scale > 0.0 { scale } else { 1.0 };

    // Column-major Vandermonde matrix on scaled x
    let mut a: Vec<Vec<f64>> = (0..p)
        .map(|j| x.iter().map(|v| (v / scale).powi(j as i32)).collect())
        .collect();
    let mut b = y.to_vec();

    householder_qr_in_place(&mut a, &mut b)?;
    let scaled = back_substitute(&a, &b)?;
    let coefficients: Vec<f64> = scaled
        .iter()
        .enumerate()
        .map(|(j, c)| c / scale.powi(j as i32))
        .collect();

    let mut fit = PolynomialFit {
        degree,
        coefficients,
        r_squared: 0.0,
        adj_r_squared: f64::NAN,
        f_statistic: f64::NAN,
        p_value: f64::NAN,
        rmse: 0.0,
        n,
    };

    let ss_resid: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (yi - fit.predict(*xi)).powi(2))
        .sum();
    let r_squared = (1.0 - ss_resid / ss_total).clamp(0.0, 1.0);
    let df_model = degree as f64;
    let df_resid = (n - p) as f64;

    fit.r_squared = r_squared;
    fit.rmse = (ss_resid / n as f64).sqrt();
    if df_resid > 0.0 {
        fit.adj_r_squared = 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df_resid;
        if ss_resid <= 1e-12 * ss_total {
            fit.f_statistic = f64::INFINITY;
            fit.p_value = 0.0;
        } else if degree > 0 {
            let f = ((ss_total - ss_resid) / df_model) / (ss_resid / df_resid);
            let dist = FisherSnedecor::new(df_model, df_resid)
                .map_err(|e| StatsError::Distribution(e.to_string()))?;
            fit.f_statistic = f;
            fit.p_value = dist.sf(f);
        }
    }
    Ok(fit)
}

/// Reduce the column-major `a` to upper-triangular R, applying the same
/// reflections to `b`
fn householder_qr_in_place(a: &mut [Vec<f64>], b: &mut [f64]) -> StatsResult<()> {
    let n = b.len();
    let p = a.len();
    for k in 0..p {
        let norm = a[k][k..].iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm < 1e-12 {
            return Err(StatsError::Singular);
        }
        let alpha = if a[k][k] > 0.0 { -norm } else { norm };
        let mut v: Vec<f64> = a[k][k..].to_vec();
        v[0] -= alpha;
        let v_norm_sq: f64 = v.iter().map(|e| e * e).sum();
        if v_norm_sq == 0.0 {
            continue;
        }

        for column in a.iter_mut().skip(k) {
            let dot: f64 = v.iter().zip(&column[k..n]).map(|(vi, ci)| vi * ci).sum();
            let factor = 2.0 * dot / v_norm_sq;
            for (ci, vi) in column[k..n].iter_mut().zip(&v) {
                *ci -= factor * vi;
            }
        }
        let dot: f64 = v.iter().zip(&b[k..n]).map(|(vi, bi)| vi * bi).sum();
        let factor = 2.0 * dot / v_norm_sq;
        for (bi, vi) in b[k..n].iter_mut().zip(&v) {
            *bi -= factor * vi;
        }
    }
    Ok(())
}

fn back_substitute(r: &[Vec<f64>], b: &[f64]) -> StatsResult<Vec<f64>> {
    let p = r.len();
    let mut coefficients = vec![0.0; p];
    for i in (0..p).rev() {
        let diag = r[i][i];
        if diag.abs() < 1e-12 {
            return Err(StatsError::Singular);
        }
        let tail: f64 = ((i + 1)..p).map(|j| r[j][i] * coefficients[j]).sum();
        coefficients[i] = (b[i] - tail) / diag;
    }
    Ok(coefficients)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line() {
        let x = [0.0, 10.0, 20.0, 30.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let fit = fit_polynomial(&x, &y, 1).unwrap();
        assert!((fit.coefficients[0] - 1.0).abs() < 1e-9);
        assert!((fit.coefficients[1] - 0.2).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!(fit.f_statistic.is_infinite());
        assert_eq!(fit.p_value, 0.0);
    }

    #[test]
    fn test_exact_quadratic() {
        let x = [0.0, 10.0, 20.0, 25.0, 30.0, 40.0, 50.0];
        let y: Vec<f64> = x.iter().map(|v| 0.5 - 0.01 * v + 0.0004 * v * v).collect();
        let fit = fit_polynomial(&x, &y, 2).unwrap();
        assert!((fit.coefficients[0] - 0.5).abs() < 1e-9);
        assert!((fit.coefficients[1] + 0.01).abs() < 1e-9);
        assert!((fit.coefficients[2] - 0.0004).abs() < 1e-11);
        assert!(fit.rmse < 1e-9);
    }

    #[test]
    fn test_noisy_line_statistics() {
        // slope 0.9, intercept 1.25, SSE 0.45, SST 4.5 → R² = 0.9, F = 18
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 3.5, 3.5, 5.0];
        let fit = fit_polynomial(&x, &y, 1).unwrap();
        assert!((fit.coefficients[1] - 0.9).abs() < 1e-9);
        assert!((fit.coefficients[0] - 1.25).abs() < 1e-9);
        assert!((fit.r_squared - 0.9).abs() < 1e-9);
        assert!(fit.p_value > 0.0 && fit.p_value < 0.1);
        assert!(fit.adj_r_squared < fit.r_squared);
    }

    #[test]
    fn test_saturated_fit_has_no_adjusted_r_squared() {
        let fit = fit_polynomial(&[0.0, 1.0], &[0.2, 0.7], 1).unwrap();
        assert!(fit.adj_r_squared.is_nan());
        assert!(fit.p_value.is_nan());
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(matches!(
            fit_polynomial(&[1.0, 2.0], &[1.0, 2.0], 2),
            Err(StatsError::InsufficientData { .. })
        ));
        assert_eq!(
            fit_polynomial(&[1.0, 2.0, 3.0], &[0.4, 0.4, 0.4], 1),
            Err(StatsError::ZeroVariance)
        );
        assert_eq!(
            fit_polynomial(&[2.0, 2.0, 2.0], &[0.1, 0.2, 0.3], 1),
            Err(StatsError::Singular)
        );
    }
}
