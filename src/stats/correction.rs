// Multiple-comparison correction for a family of p-values
//
// Bonferroni and Holm control the family-wise error rate; Benjamini-Hochberg
// controls the false discovery rate. Every corrected p-value is >= its raw
// value and <= 1.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Adjustment applied across the p-values produced by one analysis call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CorrectionMethod {
    #[serde(rename = "bonferroni")]
    Bonferroni,
    #[default]
    #[serde(rename = "holm")]
    Holm,
    #[serde(rename = "fdr_bh")]
    FdrBh,
    #[serde(rename = "none")]
    None,
}

impl CorrectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionMethod::Bonferroni => "bonferroni",
            CorrectionMethod::Holm => "holm",
            CorrectionMethod::FdrBh => "fdr_bh",
            CorrectionMethod::None => "none",
        }
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrectionMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bonferroni" => Ok(CorrectionMethod::Bonferroni),
            "holm" | "holm-bonferroni" => Ok(CorrectionMethod::Holm),
            "fdr_bh" | "fdr" | "bh" | "benjamini-hochberg" => Ok(CorrectionMethod::FdrBh),
            "none" => Ok(CorrectionMethod::None),
            _ => Err(AnalysisError::UnknownCorrection(s.to_string())),
        }
    }
}

/// Correct `p_values` as one family, preserving input order
///
/// NaN entries pass through untouched and do not count towards the family size.
pub fn correct_p_values(p_values: &[f64], method: CorrectionMethod) -> Vec<f64> {
    let mut corrected = p_values.to_vec();
    let mut order: Vec<usize> = (0..p_values.len())
        .filter(|&i| !p_values[i].is_nan())
        .collect();
    let m = order.len();
    if m == 0 {
        return corrected;
    }
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    match method {
        CorrectionMethod::None => {}
        CorrectionMethod::Bonferroni => {
            for &i in &order {
                corrected[i] = (p_values[i] * m as f64).min(1.0);
            }
        }
        CorrectionMethod::Holm => {
            // Step-down: running maximum keeps adjusted values monotone
            let mut running = 0.0_f64;
            for (rank, &i) in order.iter().enumerate() {
                let adjusted = ((m - rank) as f64 * p_values[i]).min(1.0);
                running = running.max(adjusted);
                corrected[i] = running;
            }
        }
        CorrectionMethod::FdrBh => {
            // Step-up: running minimum from the largest p-value down
            let mut running = 1.0_f64;
            for (rank, &i) in order.iter().enumerate().rev() {
                let adjusted = (p_values[i] * m as f64 / (rank + 1) as f64).min(1.0);
                running = running.min(adjusted);
                corrected[i] = running.max(p_values[i]);
            }
        }
    }
    corrected
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: [f64; 4] = [0.01, 0.04, 0.03, 0.20];

    fn assert_close(actual: &[f64], expected: &[f64]) {
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn test_bonferroni() {
        assert_close(
            &correct_p_values(&P, CorrectionMethod::Bonferroni),
            &[0.04, 0.16, 0.12, 0.80],
        );
    }

    #[test]
    fn test_holm() {
        // sorted: 0.01*4=0.04, 0.03*3=0.09, 0.04*2=0.08→0.09, 0.20*1=0.20
        assert_close(
            &correct_p_values(&P, CorrectionMethod::Holm),
            &[0.04, 0.09, 0.09, 0.20],
        );
    }

    #[test]
    fn test_benjamini_hochberg() {
        // sorted: 0.01*4/1=0.04, 0.03*4/2=0.06, 0.04*4/3=0.0533, 0.20*4/4=0.20
        // step-up minimum: 0.04, 0.0533, 0.0533, 0.20
        assert_close(
            &correct_p_values(&P, CorrectionMethod::FdrBh),
            &[0.04, 0.16 / 3.0, 0.16 / 3.0, 0.20],
        );
    }

    #[test]
    fn test_none_leaves_values_unchanged() {
        assert_eq!(correct_p_values(&P, CorrectionMethod::None), P.to_vec());
    }

    #[test]
    fn test_clipped_at_one() {
        let corrected = correct_p_values(&[0.6, 0.9], CorrectionMethod::Bonferroni);
        assert_eq!(corrected, vec![1.0, 1.0]);
    }

    #[test]
    fn test_nan_passes_through() {
        let corrected = correct_p_values(&[0.02, f64::NAN], CorrectionMethod::Bonferroni);
        assert_eq!(corrected[0], 0.02);
        assert!(corrected[1].is_nan());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("bonferroni".parse::<CorrectionMethod>().unwrap(), CorrectionMethod::Bonferroni);
        assert_eq!("FDR_BH".parse::<CorrectionMethod>().unwrap(), CorrectionMethod::FdrBh);
        assert_eq!("holm".parse::<CorrectionMethod>().unwrap(), CorrectionMethod::Holm);
        assert_eq!("none".parse::<CorrectionMethod>().unwrap(), CorrectionMethod::None);
        assert!("sidak".parse::<CorrectionMethod>().is_err());
    }
}
