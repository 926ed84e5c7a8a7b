//! # rai CLI entry point
//!
//! Parses command-line arguments, loads configuration and dispatches to
//! subcommand handlers. Handlers return the process exit code; errors are
//! logged and exit with 1.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rai_cli::analysis::{run_analyze, run_reanalyze, AnalyzeArgs, ReanalyzeArgs};
use rai_cli::config::{ApiOverrides, CliConfig};
use rai_cli::pipeline::{
    run_advance, run_preview, run_select, run_upload, run_validate, AdvanceArgs, PreviewArgs,
    SelectArgs, UploadArgs, ValidateArgs,
};
use rai_cli::review::{
    run_export, run_override, run_results, ExportArgs, OverrideArgs, ResultsArgs,
};
use rai_cli::session::{run_session, SessionArgs};
use rai_cli::standards::{run_standards, StandardsArgs};
use rai_cli::CliContext;

/// Compliance session engine CLI.
///
/// Drives a compliance session through upload, standards selection,
/// streaming analysis and review against the compliance API.
#[derive(Parser, Debug)]
#[command(name = "rai", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true, env = "RAI_CONFIG")]
    config: Option<PathBuf>,

    /// Compliance API root URL.
    #[arg(long, global = true, env = "RAI_API_URL")]
    api_url: Option<String>,

    /// Bearer token for the compliance API.
    #[arg(long, global = true, env = "RAI_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Per-request timeout in seconds (not applied to the analysis stream).
    #[arg(long, global = true, env = "RAI_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List, show, search or reload the standards catalog.
    Standards(StandardsArgs),

    /// Create, show or delete sessions.
    Session(SessionArgs),

    /// Upload the financial statements and notes.
    Upload(UploadArgs),

    /// Move a session to another stage.
    Advance(AdvanceArgs),

    /// Select and confirm the standards to assess.
    Select(SelectArgs),

    /// Page through the classified document chunks.
    Preview(PreviewArgs),

    /// Check that the documents cover the primary financial statements.
    Validate(ValidateArgs),

    /// Run the full streaming analysis.
    Analyze(AnalyzeArgs),

    /// Re-run selected questions.
    Reanalyze(ReanalyzeArgs),

    /// Override one determination.
    Override(OverrideArgs),

    /// List results with filters and the summary.
    Results(ResultsArgs),

    /// Export results as comma-separated text.
    Export(ExportArgs),
}

fn verbosity_filter(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<u8> {
    let config = CliConfig::load(cli.config.as_deref())?.finish(ApiOverrides {
        api_url: cli.api_url,
        api_token: cli.api_token,
        timeout_secs: cli.timeout_secs,
    })?;
    tracing::debug!(base_url = %config.api.base_url, "configuration loaded");
    let ctx = CliContext::connect(config)?;

    match &cli.command {
        Commands::Standards(args) => run_standards(args, &ctx).await,
        Commands::Session(args) => run_session(args, &ctx).await,
        Commands::Upload(args) => run_upload(args, &ctx).await,
        Commands::Advance(args) => run_advance(args, &ctx).await,
        Commands::Select(args) => run_select(args, &ctx).await,
        Commands::Preview(args) => run_preview(args, &ctx).await,
        Commands::Validate(args) => run_validate(args, &ctx).await,
        Commands::Analyze(args) => run_analyze(args, &ctx).await,
        Commands::Reanalyze(args) => run_reanalyze(args, &ctx).await,
        Commands::Override(args) => run_override(args, &ctx).await,
        Commands::Results(args) => run_results(args, &ctx).await,
        Commands::Export(args) => run_export(args, &ctx).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(verbosity_filter(cli.verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match dispatch(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
