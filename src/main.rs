use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use leads_scraper::config::Config;
use leads_scraper::infra::{RateLimiterAdapter, ReqwestFetcher};
use leads_scraper::observability::{self, metrics};
use leads_scraper::pipeline::ingestion::{FetchRetryPolicy, IdentityRotator, RateLimiter, RetrySettings};
use leads_scraper::pipeline::{PipelineOrchestrator, RunStatus};
use leads_scraper::storage;

#[derive(Parser)]
#[command(name = "leads_scraper")]
#[command(about = "Job leads cleaning, deduplication and quality scoring")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    metrics: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, deduplicate, validate and score a file of raw records
    Process {
        /// JSON array of raw records
        #[arg(long)]
        input: PathBuf,
        /// Directory for the processed output (defaults to data.processed_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Drop records scoring below this value
        #[arg(long)]
        min_quality: Option<f64>,
        /// Keep duplicate listings
        #[arg(long)]
        no_dedupe: bool,
    },
    /// Fetch URLs through the rate limiter and retry policy
    Fetch {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    if let Commands::Process { min_quality, no_dedupe, .. } = &cli.command {
        if let Some(min_quality) = min_quality {
            config.processing.min_quality_score = *min_quality;
        }
        if *no_dedupe {
            config.processing.deduplicate = false;
        }
        config.validate().context("Invalid command line options")?;
    }

    observability::init_logging(&config.logging);
    if cli.metrics {
        metrics::init()?;
    }

    let code = match cli.command {
        Commands::Process { input, output_dir, .. } => {
            let output_dir = output_dir.unwrap_or_else(|| PathBuf::from(&config.data.processed_dir));
            run_process(&config, &input, &output_dir)?
        }
        Commands::Fetch { urls } => run_fetch(&config, &urls).await?,
    };

    if cli.metrics {
        if let Some(rendered) = metrics::render() {
            println!("{}", rendered);
        }
    }
    Ok(code)
}

fn run_process(config: &Config, input: &Path, output_dir: &Path) -> anyhow::Result<ExitCode> {
    let loaded = storage::load_raw_records(input)
        .with_context(|| format!("Failed to read raw records from {}", input.display()))?;
    if !loaded.skipped.is_empty() {
        warn!("{} input records could not be read and were skipped", loaded.skipped.len());
    }

    let orchestrator = PipelineOrchestrator::with_tracing(config.processing.clone());
    let run = orchestrator.process(loaded.records);

    println!("{}", run.report);
    println!(
        "input: {}, duplicates removed: {}, rejected: {}, below threshold: {}, output: {}",
        run.counts.input,
        run.counts.duplicates_removed,
        run.counts.rejected,
        run.counts.below_threshold,
        run.counts.output
    );

    if run.status == RunStatus::NoSurvivors {
        warn!("No records survived processing");
        return Ok(ExitCode::from(2));
    }

    let records_path = storage::save_processed_records(&run.records, output_dir)
        .context("Failed to save processed records")?;
    let summary_path = storage::save_report_summary(&run.report, output_dir)
        .context("Failed to save processing summary")?;
    info!("Output written to {} and {}", records_path.display(), summary_path.display());
    println!("Saved {} records to {}", run.records.len(), records_path.display());
    Ok(ExitCode::SUCCESS)
}

async fn run_fetch(config: &Config, urls: &[String]) -> anyhow::Result<ExitCode> {
    let limiter = RateLimiter::from_config(&config.rate_limiting);
    let identities = IdentityRotator::or_default(config.identities.pool.clone());
    let fetcher = ReqwestFetcher::new(Duration::from_secs(config.retry.timeout_seconds))
        .context("Failed to build HTTP client")?;

    let mut policy = FetchRetryPolicy::new(RetrySettings::from(&config.retry), identities)
        .with_rate_limiter(Arc::new(RateLimiterAdapter(limiter.clone())));

    for url in urls {
        let outcome = policy.fetch(&fetcher, url).await;
        println!("{}: {}", url, outcome);
    }

    let status = serde_json::to_string_pretty(&limiter.get_status())?;
    println!("Rate limiter status: {}", status);
    Ok(ExitCode::SUCCESS)
}
