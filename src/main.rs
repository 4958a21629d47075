use anyhow::{Context, Result};
use clap::Parser;
use deriva::cli::{Cli, Command, MetricsArgs, ReportArgs, SensitivityArgs};
use deriva::config::AnalysisConfig;
use deriva::metrics::{compute_results_bundle, TranslationCorpus};
use deriva::normalize::to_datum;
use deriva::report::write_report;
use deriva::results::results_file_path;
use deriva::{ComparativeAnalyzer, SensitivityAnalyzer};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` forces TRACE, otherwise RUST_LOG applies
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    match &cli.config {
        Some(path) => Ok(AnalysisConfig::from_toml_file(path)?),
        None => Ok(AnalysisConfig::default()),
    }
}

fn run_comparative(args: &ReportArgs, config: AnalysisConfig) -> Result<()> {
    let analyzer = ComparativeAnalyzer::with_config(&args.data_path, config)?;
    analyzer.generate_comparative_report(&args.output)?;
    println!("Comparative report written to {}", args.output.display());
    Ok(())
}

fn run_sensitivity(args: &SensitivityArgs, config: AnalysisConfig) -> Result<()> {
    let mut analyzer = SensitivityAnalyzer::with_config(&args.data_path, config)?;
    if let Some(outputs_dir) = &args.outputs_dir {
        analyzer = analyzer.with_corpus(TranslationCorpus::load(outputs_dir)?);
    }
    analyzer.generate_sensitivity_report(&args.output)?;
    println!("Sensitivity report written to {}", args.output.display());
    Ok(())
}

fn run_metrics(args: &MetricsArgs, config: &AnalysisConfig) -> Result<()> {
    let corpus = TranslationCorpus::load(&args.outputs_dir)?;
    let bundle = compute_results_bundle(&corpus)
        .with_context(|| format!("computing metrics for {}", args.outputs_dir.display()))?;
    let path = results_file_path(&args.data_path);
    write_report(
        "metrics",
        &path,
        &to_datum(&bundle)?,
        config.comparative_nan_policy,
    )?;
    println!(
        "Metrics for {} noise levels written to {}",
        corpus.len(),
        path.display()
    );
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    match &cli.command {
        Command::Comparative(args) => run_comparative(args, config),
        Command::Sensitivity(args) => run_sensitivity(args, config),
        Command::Metrics(args) => run_metrics(args, &config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
