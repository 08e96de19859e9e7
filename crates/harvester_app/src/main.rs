mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use clap::Parser;
use engine_logging::{engine_error, engine_info};
use harvester_core::WorkUnit;
use harvester_engine::{
    estimated_duration, Harvester, LogProgressSink, ReqwestSearchClient, UnitCache,
};
use log::LevelFilter;

use config::HarvestConfig;

/// Harvest quarterly news search results into a deduplicated dataset.
#[derive(Debug, Parser)]
#[command(name = "news-harvester", version, about)]
struct Cli {
    /// RON configuration file.
    #[arg(long, default_value = "harvest.ron")]
    config: PathBuf,
    /// Planning boundary (RFC 3339); defaults to the current time.
    #[arg(long)]
    now: Option<DateTime<Utc>>,
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Print the plan size and exit without touching the network.
    #[arg(long)]
    plan_only: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = HarvestConfig::load(&cli.config)?;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = cli.log_dir {
        config.log_dir = dir;
    }

    let now = cli.now.unwrap_or_else(Utc::now);
    let units = harvester_core::plan(config.queries.as_slice(), config.epoch_start()?, now)
        .context("building the work plan")?;

    if cli.plan_only {
        print_plan(&config, &units);
        return Ok(());
    }

    let stamps = RunStamps::at(Local::now().naive_local());
    let log_file = engine_logging::init_run_logger(&config.log_dir, &stamps.log, LevelFilter::Info);
    if let Some(path) = log_file {
        engine_info!("Log file: {}", path.display());
    }

    let result = harvest(&config, units, &stamps.dataset);
    if let Err(err) = &result {
        engine_error!("Harvest halted: {err:#}");
    }
    result
}

/// Dataset files carry the run date; each run gets its own log file.
#[derive(Debug, PartialEq, Eq)]
struct RunStamps {
    dataset: String,
    log: String,
}

impl RunStamps {
    fn at(started: NaiveDateTime) -> Self {
        Self {
            dataset: started.format("%Y%m%d").to_string(),
            log: started.format("%Y%m%d_%H%M%S").to_string(),
        }
    }
}

fn print_plan(config: &HarvestConfig, units: &[WorkUnit]) {
    let windows = units.len() / config.queries.len();
    let eta = estimated_duration(units.len(), Duration::from_secs(config.pause_secs));
    println!(
        "{} queries x {} windows = {} units",
        config.queries.len(),
        windows,
        units.len()
    );
    if let (Some(first), Some(last)) = (units.first(), units.last()) {
        println!("Windows: {} .. {}", first.label(), last.label());
    }
    println!("Estimated time: {} minutes", eta.as_secs() / 60);
}

fn harvest(config: &HarvestConfig, units: Vec<WorkUnit>, run_stamp: &str) -> Result<()> {
    let client = ReqwestSearchClient::new(config.fetch_settings())
        .context("configuring the search client")?;
    let cache = UnitCache::open(config.cache_dir.clone())
        .with_context(|| format!("opening checkpoint dir {}", config.cache_dir.display()))?;
    let harvester = Harvester::new(
        Arc::new(client),
        cache,
        Arc::new(LogProgressSink),
        config.harvest_settings(run_stamp),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting the async runtime")?;
    let outcome = runtime.block_on(harvester.run(units))?;

    let summary = &outcome.summary;
    engine_info!(
        "Done: {} unique records, {} from network, {} from checkpoints, {} degraded",
        summary.unique_records,
        summary.from_network,
        summary.from_cache,
        summary.degraded
    );
    Ok(())
}
