//! `tca-run`: match executions to prevailing quotes and score slippage.
//!
//! Configuration precedence: JSON config file, then environment variables
//! (`EXECUTIONS_FILE_PATH`, `REFDATA_FILE_PATH`, `MARKETDATA_FILE_PATH`,
//! `OUTPUT_FILE_PATH`, `TCA_WORKERS`, also read from `.env`), then flags.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tca_core::Config;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tca-run", version, about = "Post-trade quote matching and slippage scoring")]
struct Args {
    /// Optional JSON configuration file.
    #[arg(long, env = "TCA_CONFIG")]
    config: Option<PathBuf>,

    /// Executions parquet file.
    #[arg(long)]
    executions: Option<PathBuf>,

    /// Instrument reference data parquet file.
    #[arg(long)]
    refdata: Option<PathBuf>,

    /// Market data (quote ticks) parquet file.
    #[arg(long)]
    marketdata: Option<PathBuf>,

    /// Output parquet file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Matcher worker threads (0 = one per core).
    #[arg(long)]
    workers: Option<usize>,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn into_config(self) -> Result<(Config, bool)> {
        let base = match &self.config {
            Some(path) => Config::from_json_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => Config::default(),
        };
        let mut config = base.with_env_overrides().context("invalid environment configuration")?;

        if let Some(p) = self.executions {
            config.paths.executions = p;
        }
        if let Some(p) = self.refdata {
            config.paths.refdata = p;
        }
        if let Some(p) = self.marketdata {
            config.paths.marketdata = p;
        }
        if let Some(p) = self.output {
            config.paths.output = p;
        }
        if let Some(n) = self.workers {
            config.matching.workers = n;
        }
        config.validate().context("invalid configuration")?;
        Ok((config, self.json))
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let (config, json) = Args::parse().into_config()?;
    info!(
        executions = %config.paths.executions.display(),
        refdata = %config.paths.refdata.display(),
        marketdata = %config.paths.marketdata.display(),
        output = %config.paths.output.display(),
        workers = config.matching.workers,
        "Starting TCA run"
    );

    let report = tca_pipeline::run(&config).context("TCA run failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
