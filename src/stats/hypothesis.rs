// Hypothesis tests: rank-sum, rank correlation, normality, variance equality, ANOVA
//
// Each test returns a StatsError for the degenerate inputs it cannot handle
// (too few samples, zero variance, non-finite values). Callers that run a
// batch of tests skip the failing item and carry on.

use super::descriptive::{all_finite, mean, median, rank_average, variance};
use super::{StatsError, StatsResult};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

/// Statistic and two-sided p-value of a test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
}

/// Spearman rank correlation with a Fisher-z confidence interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankCorrelation {
    pub coefficient: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub n: usize,
}

/// One-way ANOVA decomposition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnovaTable {
    pub f_statistic: f64,
    pub p_value: f64,
    pub df_between: usize,
    pub df_within: usize,
    pub ss_between: f64,
    pub ss_within: f64,
    pub eta_squared: f64,
}

fn dist_err(e: impl std::fmt::Display) -> StatsError {
    StatsError::Distribution(e.to_string())
}

fn standard_normal() -> StatsResult<Normal> {
    Normal::new(0.0, 1.0).map_err(dist_err)
}

/// Upper tail of the standard normal, exact at ±infinity
fn normal_sf(z: f64) -> StatsResult<f64> {
    if z == f64::INFINITY {
        return Ok(0.0);
    }
    if z == f64::NEG_INFINITY {
        return Ok(1.0);
    }
    Ok(standard_normal()?.sf(z))
}

/// Two-sided critical value of Student's t for a confidence level
pub(crate) fn t_critical(df: f64, confidence: f64) -> StatsResult<f64> {
    let dist = StudentsT::new(0.0, 1.0, df).map_err(dist_err)?;
    Ok(dist.inverse_cdf(1.0 - (1.0 - confidence) / 2.0))
}

fn check_finite(values: &[f64]) -> StatsResult<()> {
    if all_finite(values) {
        Ok(())
    } else {
        Err(StatsError::NonFinite)
    }
}

/// Horner evaluation of `c[0] + c[1]x + c[2]x² + ...`
fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Two-sided Mann-Whitney U test of `x` against `y`
///
/// The statistic is U for `x`. Small samples without ties use the exact null
/// distribution; otherwise the normal approximation with tie and continuity
/// correction is used. Identical pooled values have no null variance and are
/// reported as [`StatsError::ZeroVariance`].
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> StatsResult<TestOutcome> {
    let (n1, n2) = (x.len(), y.len());
    if n1 == 0 || n2 == 0 {
        return Err(StatsError::InsufficientData {
            required: 1,
            actual: n1.min(n2),
        });
    }
    check_finite(x)?;
    check_finite(y)?;

    let pooled: Vec<f64> = x.iter().chain(y).copied().collect();
    let ranks = rank_average(&pooled);
    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;
    let u_max = u1.max(u2);

    let tie_term = tie_correction_term(&pooled);
    let p_value = if tie_term == 0.0 && n1.min(n2) <= 8 {
        (2.0 * exact_u_upper_tail(u_max, n1, n2)).min(1.0)
    } else {
        let n = (n1 + n2) as f64;
        let mu = (n1 * n2) as f64 / 2.0;
        let var = (n1 * n2) as f64 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
        if var <= 0.0 {
            return Err(StatsError::ZeroVariance);
        }
        let z = (u_max - mu - 0.5) / var.sqrt();
        (2.0 * normal_sf(z)?).min(1.0)
    };

    Ok(TestOutcome {
        statistic: u1,
        p_value,
    })
}

/// Σ(t³ - t) over groups of tied values
fn tie_correction_term(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut term = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        let t = (j - i + 1) as f64;
        term += t * t * t - t;
        i = j + 1;
    }
    term
}

/// P(U >= u) under the exact null distribution without ties
fn exact_u_upper_tail(u: f64, n1: usize, n2: usize) -> f64 {
    let max_u = n1 * n2;
    // counts[j][k]: arrangements of i x's and j y's with U = k, built up over i
    let mut counts: Vec<Vec<f64>> = (0..=n2)
        .map(|_| {
            let mut row = vec![0.0; max_u + 1];
            row[0] = 1.0;
            row
        })
        .collect();

    for _ in 1..=n1 {
        let mut next = vec![vec![0.0; max_u + 1]; n2 + 1];
        next[0][0] = 1.0;
        for j in 1..=n2 {
            for k in 0..=max_u {
                // Largest element is an x: it beats all j y's
                let x_last = if k >= j { counts[j][k - j] } else { 0.0 };
                // Largest element is a y
                let y_last = next[j - 1][k];
                next[j][k] = x_last + y_last;
            }
        }
        counts = next;
    }

    let dist = &counts[n2];
    let total: f64 = dist.iter().sum();
    let start = u.ceil().max(0.0) as usize;
    let tail: f64 = dist.iter().skip(start).sum();
    tail / total
}

/// Spearman rank correlation between paired samples
///
/// The p-value uses the t approximation with n-2 degrees of freedom; the
/// interval is the Fisher-z interval, which needs n > 3 (wider samples give
/// the uninformative [-1, 1]).
pub fn spearman(x: &[f64], y: &[f64], confidence: f64) -> StatsResult<RankCorrelation> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    let n = x.len();
    if n < 3 {
        return Err(StatsError::InsufficientData {
            required: 3,
            actual: n,
        });
    }
    check_finite(x)?;
    check_finite(y)?;

    let rx = rank_average(x);
    let ry = rank_average(y);
    let (mx, my) = (mean(&rx), mean(&ry));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in rx.iter().zip(&ry) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return Err(StatsError::ZeroVariance);
    }
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);

    let df = (n - 2) as f64;
    let p_value = if 1.0 - r.abs() < 1e-12 {
        0.0
    } else {
        let t = r * (df / (1.0 - r * r)).sqrt();
        let dist = StudentsT::new(0.0, 1.0, df).map_err(dist_err)?;
        (2.0 * dist.sf(t.abs())).min(1.0)
    };

    let (ci_lower, ci_upper) = if n > 3 {
        let z = r.atanh();
        let se = 1.0 / ((n - 3) as f64).sqrt();
        let crit = standard_normal()?.inverse_cdf(1.0 - (1.0 - confidence) / 2.0);
        ((z - crit * se).tanh(), (z + crit * se).tanh())
    } else {
        (-1.0, 1.0)
    };

    Ok(RankCorrelation {
        coefficient: r,
        p_value,
        ci_lower,
        ci_upper,
        n,
    })
}

// Royston's polynomial approximations (AS R94)
const SW_C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const SW_C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const SW_C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const SW_C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const SW_C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const SW_C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const SW_G: [f64; 2] = [-2.273, 0.459];

/// Shapiro-Wilk W test for normality (Royston 1995), 3 <= n
pub fn shapiro_wilk(values: &[f64]) -> StatsResult<TestOutcome> {
    let n = values.len();
    if n < 3 {
        return Err(StatsError::InsufficientData {
            required: 3,
            actual: n,
        });
    }
    check_finite(values)?;

    let mut x = values.to_vec();
    x.sort_by(f64::total_cmp);
    if x[n - 1] - x[0] <= f64::EPSILON * x[n - 1].abs().max(1.0) {
        return Err(StatsError::ZeroVariance);
    }

    let half = n / 2;
    // 1-based like the published algorithm; index 0 unused
    let mut a = vec![0.0; half + 1];
    let an = n as f64;
    if n == 3 {
        a[1] = std::f64::consts::FRAC_1_SQRT_2;
    } else {
        let normal = standard_normal()?;
        let an25 = an + 0.25;
        let mut m = vec![0.0; half + 1];
        let mut summ2 = 0.0;
        for i in 1..=half {
            m[i] = normal.inverse_cdf((i as f64 - 0.375) / an25);
            summ2 += m[i] * m[i];
        }
        summ2 *= 2.0;
        let ssumm2 = summ2.sqrt();
        let rsn = 1.0 / an.sqrt();
        let a1 = poly(&SW_C1, rsn) - m[1] / ssumm2;

        let (first_plain, fac) = if n > 5 {
            let a2 = -m[2] / ssumm2 + poly(&SW_C2, rsn);
            let fac = ((summ2 - 2.0 * m[1] * m[1] - 2.0 * m[2] * m[2])
                / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
                .sqrt();
            a[2] = a2;
            (3, fac)
        } else {
            let fac = ((summ2 - 2.0 * m[1] * m[1]) / (1.0 - 2.0 * a1 * a1)).sqrt();
            (2, fac)
        };
        a[1] = a1;
        for i in first_plain..=half {
            a[i] = -m[i] / fac;
        }
    }

    let numerator: f64 = (1..=half).map(|i| a[i] * (x[n - i] - x[i - 1])).sum();
    let m = mean(&x);
    let ss: f64 = x.iter().map(|v| (v - m).powi(2)).sum();
    let w = (numerator * numerator / ss).min(1.0);

    if n == 3 {
        const PI6: f64 = 6.0 / std::f64::consts::PI;
        const STQR: f64 = std::f64::consts::FRAC_PI_3;
        let p = (PI6 * (w.sqrt().asin() - STQR)).clamp(0.0, 1.0);
        return Ok(TestOutcome {
            statistic: w,
            p_value: p,
        });
    }

    let w1 = (1.0 - w).ln();
    let (y, mu, sigma) = if n <= 11 {
        let gamma = poly(&SW_G, an);
        if w1 >= gamma {
            return Ok(TestOutcome {
                statistic: w,
                p_value: 1e-99,
            });
        }
        (
            -(gamma - w1).ln(),
            poly(&SW_C3, an),
            poly(&SW_C4, an).exp(),
        )
    } else {
        let ln_n = an.ln();
        (w1, poly(&SW_C5, ln_n), poly(&SW_C6, ln_n).exp())
    };

    Ok(TestOutcome {
        statistic: w,
        p_value: normal_sf((y - mu) / sigma)?,
    })
}

/// One-way ANOVA across groups
///
/// Needs at least two non-empty groups and one within-group degree of freedom.
pub fn one_way_anova<G: AsRef<[f64]>>(groups: &[G]) -> StatsResult<AnovaTable> {
    let groups: Vec<&[f64]> = groups
        .iter()
        .map(AsRef::as_ref)
        .filter(|g| !g.is_empty())
        .collect();
    let k = groups.len();
    if k < 2 {
        return Err(StatsError::InsufficientData {
            required: 2,
            actual: k,
        });
    }
    let total_n: usize = groups.iter().map(|g| g.len()).sum();
    if total_n <= k {
        return Err(StatsError::InsufficientData {
            required: k + 1,
            actual: total_n,
        });
    }
    for g in &groups {
        check_finite(g)?;
    }

    let grand_mean = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / total_n as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for g in &groups {
        let gm = mean(g);
        ss_between += g.len() as f64 * (gm - grand_mean).powi(2);
        ss_within += g.iter().map(|v| (v - gm).powi(2)).sum::<f64>();
    }
    let ss_total = ss_between + ss_within;
    if ss_total == 0.0 {
        return Err(StatsError::ZeroVariance);
    }

    let df_between = k - 1;
    let df_within = total_n - k;
    let ms_between = ss_between / df_between as f64;
    let ms_within = ss_within / df_within as f64;

    let (f_statistic, p_value) = if ms_within == 0.0 {
        (f64::INFINITY, 0.0)
    } else {
        let f = ms_between / ms_within;
        let dist = FisherSnedecor::new(df_between as f64, df_within as f64).map_err(dist_err)?;
        (f, dist.sf(f))
    };

    Ok(AnovaTable {
        f_statistic,
        p_value,
        df_between,
        df_within,
        ss_between,
        ss_within,
        eta_squared: ss_between / ss_total,
    })
}

/// Levene's test for equal variances, centred on group medians
/// (the Brown-Forsythe variant)
pub fn levene<G: AsRef<[f64]>>(groups: &[G]) -> StatsResult<TestOutcome> {
    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let g = g.as_ref();
            let center = median(g);
            g.iter().map(|v| (v - center).abs()).collect()
        })
        .collect();
    let table = one_way_anova(&deviations)?;
    Ok(TestOutcome {
        statistic: table.f_statistic,
        p_value: table.p_value,
    })
}

/// Bartlett's test for equal variances
///
/// Every group needs two or more samples and non-zero variance.
pub fn bartlett<G: AsRef<[f64]>>(groups: &[G]) -> StatsResult<TestOutcome> {
    let groups: Vec<&[f64]> = groups.iter().map(AsRef::as_ref).collect();
    let k = groups.len();
    if k < 2 {
        return Err(StatsError::InsufficientData {
            required: 2,
            actual: k,
        });
    }
    for g in &groups {
        if g.len() < 2 {
            return Err(StatsError::InsufficientData {
                required: 2,
                actual: g.len(),
            });
        }
        check_finite(g)?;
    }

    let variances: Vec<f64> = groups.iter().map(|g| variance(g)).collect();
    if variances.iter().any(|&v| v <= 0.0) {
        return Err(StatsError::ZeroVariance);
    }

    let total_n: usize = groups.iter().map(|g| g.len()).sum();
    let df_total = (total_n - k) as f64;
    let pooled = groups
        .iter()
        .zip(&variances)
        .map(|(g, v)| (g.len() - 1) as f64 * v)
        .sum::<f64>()
        / df_total;

    let numerator = df_total * pooled.ln()
        - groups
            .iter()
            .zip(&variances)
            .map(|(g, v)| (g.len() - 1) as f64 * v.ln())
            .sum::<f64>();
    let inverse_sum: f64 = groups.iter().map(|g| 1.0 / (g.len() - 1) as f64).sum();
    let denominator = 1.0 + (inverse_sum - 1.0 / df_total) / (3.0 * (k - 1) as f64);
    let statistic = numerator / denominator;

    let dist = ChiSquared::new((k - 1) as f64).map_err(dist_err)?;
    Ok(TestOutcome {
        statistic,
        p_value: dist.sf(statistic),
    })
}
