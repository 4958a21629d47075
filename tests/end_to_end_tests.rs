//! End-to-end scenarios through the public library API
//!
//! Each test persists a results file in a scratch directory and drives the
//! analyzers exactly as the binary does.

use deriva::comparative::INSUFFICIENT_REGRESSION;
use deriva::sensitivity::{INSUFFICIENT_ANOVA, INSUFFICIENT_SENSITIVITY};
use deriva::{
    AnalysisConfig, AnalysisError, ComparativeAnalyzer, CorrectionMethod, NanPolicy,
    SensitivityAnalyzer,
};
use std::fs;
use std::path::Path;

const LINEAR_RESULTS: &str = r#"{
    "semantic_distances": {"0": 0.1, "10": 0.2, "20": 0.3, "30": 0.4},
    "text_similarities": {"0": 0.9, "10": 0.8, "20": 0.7, "30": 0.6},
    "word_overlaps": {"0": 0.95, "10": 0.85, "20": 0.75, "30": 0.65}
}"#;

fn results_dir(contents: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("analysis_results_local.json"), contents).unwrap();
    dir
}

fn quick_config() -> AnalysisConfig {
    AnalysisConfig {
        bootstrap_iterations: 200,
        ..AnalysisConfig::default()
    }
}

#[test]
fn test_linear_drift_regression() {
    let dir = results_dir(LINEAR_RESULTS);
    let analyzer = ComparativeAnalyzer::new(dir.path()).unwrap();

    let fit = analyzer
        .regression_analysis_for("semantic_distances", 1)
        .unwrap();
    assert!((fit.r_squared - 1.0).abs() < 1e-9);
    assert!(fit.coefficients[1] > 0.0);
    assert!(fit.rmse < 1e-9);
}

#[test]
fn test_corrupt_file_fails_both_analyzers() {
    let dir = results_dir("{invalid json content");

    let comparative = ComparativeAnalyzer::new(dir.path()).unwrap_err();
    let sensitivity = SensitivityAnalyzer::new(dir.path()).unwrap_err();
    for err in [comparative, sensitivity] {
        assert!(matches!(err, AnalysisError::LoadFailed { .. }));
        assert!(err.to_string().contains("Failed to load results"));
    }
}

#[test]
fn test_missing_file_is_distinct_from_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ComparativeAnalyzer::new(dir.path()).unwrap_err();
    assert!(matches!(err, AnalysisError::ResultsFileNotFound(_)));
}

#[test]
fn test_identical_levels_effect_size() {
    let dir = results_dir(
        r#"{
            "semantic_distances": {"0": 0.5, "50": 0.5},
            "text_similarities": {"0": 0.8, "50": 0.8},
            "word_overlaps": {"0": 0.9, "50": 0.9}
        }"#,
    );
    let analyzer = SensitivityAnalyzer::new(dir.path()).unwrap();
    let effects = analyzer.cohens_d_effect_size(0, 50);

    let keys: Vec<&str> = effects.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["semantic_distances", "text_similarities", "word_overlaps"]
    );
    assert!(effects.values().all(|d| *d == 0.0));
}

#[test]
fn test_single_level_dataset_sentinels() {
    let dir = results_dir(r#"{"semantic_distances": {"0": 0.1}}"#);

    let sensitivity = SensitivityAnalyzer::new(dir.path()).unwrap();
    assert_eq!(
        sensitivity.anova_multi_factor().interpretation,
        INSUFFICIENT_ANOVA
    );
    assert_eq!(
        sensitivity
            .embedding_dimension_sensitivity(&[100])
            .interpretation,
        INSUFFICIENT_SENSITIVITY
    );

    let comparative = ComparativeAnalyzer::new(dir.path()).unwrap();
    assert!(comparative
        .pairwise_comparisons("semantic_distances", CorrectionMethod::Holm)
        .is_empty());
    assert_eq!(
        comparative.regression_analysis(1).unwrap().interpretation,
        INSUFFICIENT_REGRESSION
    );
    assert!(comparative.diagnostic_tests().normality.is_empty());
}

#[test]
fn test_tolerates_malformed_entries() {
    let dir = results_dir(
        r#"{
            "semantic_distances": {"0": 0.1, "ten": 0.2, "20": "x", "30": 0.4},
            "notes": "free text"
        }"#,
    );
    let analyzer = ComparativeAnalyzer::new(dir.path()).unwrap();
    let series = analyzer.results().metric("semantic_distances").unwrap();
    assert_eq!(series.levels(), vec![0, 30]);
    assert!(analyzer.results().metric("notes").is_none());
}

#[test]
fn test_reports_round_trip_as_standard_json() {
    let dir = results_dir(LINEAR_RESULTS);
    let comparative_out = dir.path().join("comparative_analysis_report.json");
    let sensitivity_out = dir.path().join("sensitivity_analysis_report.json");

    ComparativeAnalyzer::with_config(dir.path(), quick_config())
        .unwrap()
        .generate_comparative_report(&comparative_out)
        .unwrap();
    SensitivityAnalyzer::with_config(dir.path(), quick_config())
        .unwrap()
        .generate_sensitivity_report(&sensitivity_out)
        .unwrap();

    for path in [&comparative_out, &sensitivity_out] {
        let text = fs::read_to_string(path).unwrap();
        assert!(!text.contains("NaN"));
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(parsed["metadata"]["data_path"]
            .as_str()
            .unwrap()
            .ends_with(dir.path().file_name().unwrap().to_str().unwrap()));
    }
}

fn anova_f_statistic_text(policy: NanPolicy, output: &Path) -> String {
    let dir = results_dir(r#"{"semantic_distances": {"0": 0.1, "10": 0.2}}"#);
    let config = AnalysisConfig {
        sensitivity_nan_policy: policy,
        ..quick_config()
    };
    SensitivityAnalyzer::with_config(dir.path(), config)
        .unwrap()
        .generate_sensitivity_report(output)
        .unwrap();
    fs::read_to_string(output).unwrap()
}

#[test]
fn test_nan_policies_differ_only_when_encoding() {
    let out = tempfile::tempdir().unwrap();

    let nulled = anova_f_statistic_text(NanPolicy::NullOnEncode, &out.path().join("a.json"));
    assert!(nulled.contains("\"f_statistic\": null"));

    let preserved = anova_f_statistic_text(NanPolicy::Preserve, &out.path().join("b.json"));
    assert!(preserved.contains("\"f_statistic\": NaN"));
}

#[test]
fn test_returned_report_preserves_nan() {
    let dir = results_dir(r#"{"semantic_distances": {"0": 0.1, "10": 0.2}}"#);
    let output = dir.path().join("report.json");
    let report = SensitivityAnalyzer::with_config(dir.path(), quick_config())
        .unwrap()
        .generate_sensitivity_report(&output)
        .unwrap();

    assert!(report.is_native());
    let f = report
        .get("anova")
        .and_then(|a| a.get("f_statistic"))
        .and_then(|f| f.as_f64())
        .unwrap();
    assert!(f.is_nan());
}
