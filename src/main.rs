//! RU Events Hub scraper binary.
//! Runs the getINVOLVED pipeline once and prints a summary; exits non-zero when
//! the run reports an error so cron / CI can notice.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use events_hub_scraper::ingest::providers::{
    engage_api::EngageApiProvider, ical_feed::IcalFeedProvider,
};
use events_hub_scraper::state::ResetOutcome;
use events_hub_scraper::store::supabase::SupabaseStore;
use events_hub_scraper::{
    reset_kill_switch, telemetry, FetchVia, JsonFileStateStore, Pipeline, RunSummary,
    ScraperConfig,
};

#[derive(Debug, Parser)]
#[command(name = "events-hub-scraper", about = "RU Events Hub scraper runner")]
struct Cli {
    /// Clear the kill switch in the state file and exit.
    #[arg(long)]
    reset_kill_switch: bool,

    /// TOML config file (default: $SCRAPER_CONFIG_PATH, then config/scraper.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write Prometheus metrics to this file after the run.
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// Print the run summary as JSON instead of the text box.
    #[arg(long)]
    json: bool,
}

fn print_summary(result: &RunSummary, elapsed: Duration) {
    let rule = "=".repeat(55);
    println!();
    println!("{rule}");
    println!("  RU Events Hub — Scraper Summary");
    println!("{rule}");
    println!("  Timestamp : {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Source    : getINVOLVED ({})", result.source);
    println!("  Fetched   : {:>6} events", result.fetched);
    println!("  Inserted  : {:>6} new", result.inserted);
    println!("  Updated   : {:>6} existing", result.updated);
    println!("  Duration  : {:>6} ms", elapsed.as_millis());
    if let Some(err) = &result.error {
        println!("  ERROR     : {err}");
    }
    println!("{rule}");
    println!();
}

async fn run(cli: &Cli, cfg: &ScraperConfig) -> Result<RunSummary> {
    let store = SupabaseStore::new(cfg)?;

    let http = reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .timeout(Duration::from_secs(cfg.request_timeout_secs))
        .build()
        .context("building http client")?;
    let api = EngageApiProvider::from_url(http.clone(), cfg);
    let feed = IcalFeedProvider::from_url(http, cfg);
    let states = JsonFileStateStore::new(cfg.state_path.clone());

    let metrics = match &cli.metrics_file {
        Some(_) => Some(telemetry::install_prometheus()?),
        None => None,
    };

    let pipeline = Pipeline::new(&api, &feed, &store, cfg);
    let summary = pipeline.run_once(&states).await;

    if let (Some(handle), Some(path)) = (&metrics, &cli.metrics_file) {
        if let Err(e) = telemetry::write_metrics_textfile(handle, path) {
            tracing::warn!(error = %format!("{e:#}"), "metrics textfile not written");
        }
    }
    Ok(summary)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the variables come from the scheduler.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cli = Cli::parse();

    let cfg = match ScraperConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    if cli.reset_kill_switch {
        let states = JsonFileStateStore::new(cfg.state_path.clone());
        return match reset_kill_switch(&states).await {
            Ok(ResetOutcome::NothingToReset) => {
                println!("{} does not exist — nothing to reset.", states.path().display());
                ExitCode::SUCCESS
            }
            Ok(ResetOutcome::Reset { .. }) => {
                println!("Kill switch reset for all sources.");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "kill switch reset failed");
                ExitCode::FAILURE
            }
        };
    }

    tracing::info!("starting RU Events Hub scraper");
    let started = Instant::now();
    let result = match run(&cli, &cfg).await {
        Ok(summary) => summary,
        Err(e) => RunSummary {
            fetched: 0,
            inserted: 0,
            updated: 0,
            source: FetchVia::None,
            error: Some(format!("{e:#}")),
        },
    };
    let elapsed = started.elapsed();

    match &result.error {
        Some(err) => tracing::error!(error = %err, "scrape finished with error"),
        None => tracing::info!(
            fetched = result.fetched,
            inserted = result.inserted,
            updated = result.updated,
            "scrape complete"
        ),
    }

    if cli.json {
        match serde_json::to_string_pretty(&result) {
            Ok(s) => println!("{s}"),
            Err(e) => tracing::warn!(error = %e, "could not render summary as json"),
        }
    } else {
        print_summary(&result, elapsed);
    }

    if result.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
