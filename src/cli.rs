//! CLI argument parsing for Deriva

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deriva")]
#[command(version)]
#[command(about = "Statistical analysis of semantic drift across input noise levels", long_about = None)]
pub struct Cli {
    /// TOML file overriding the analysis configuration
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pairwise tests, correlations, regression and diagnostics
    Comparative(ReportArgs),

    /// Parameter sweeps, bootstrap, effect sizes and ANOVA
    Sensitivity(SensitivityArgs),

    /// Compute the drift metrics from translation outputs
    Metrics(MetricsArgs),
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Directory holding analysis_results_local.json
    #[arg(long = "data-path", value_name = "DIR", default_value = "results")]
    pub data_path: PathBuf,

    /// Report file to write
    #[arg(
        long = "output",
        value_name = "FILE",
        default_value = "results/comparative_analysis_report.json"
    )]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct SensitivityArgs {
    /// Directory holding analysis_results_local.json
    #[arg(long = "data-path", value_name = "DIR", default_value = "results")]
    pub data_path: PathBuf,

    /// Report file to write
    #[arg(
        long = "output",
        value_name = "FILE",
        default_value = "results/sensitivity_analysis_report.json"
    )]
    pub output: PathBuf,

    /// Translation outputs to re-embed during the sweeps
    #[arg(long = "outputs-dir", value_name = "DIR")]
    pub outputs_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MetricsArgs {
    /// Directory with one noise_<level>/ folder per experiment run
    #[arg(long = "outputs-dir", value_name = "DIR", default_value = "outputs")]
    pub outputs_dir: PathBuf,

    /// Directory to write analysis_results_local.json into
    #[arg(long = "data-path", value_name = "DIR", default_value = "results")]
    pub data_path: PathBuf,
}
