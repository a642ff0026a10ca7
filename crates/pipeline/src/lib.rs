//! Batch orchestration for the TCA job.
//!
//! Runs the stages end to end: load, profile, phase filter, enrichment,
//! snapshot build, match and score, summary, write. Each stage boundary logs
//! its row counts. Nothing is written unless every stage succeeds.

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tca_core::{Config, Result, Trade};
use tca_features::{SlippageSummary, TcaEngine};
use tca_ingestion::{
    enrich, filter_continuous, EnrichedExecution, EnrichmentStats, ExecutionProfile, QuoteProfile, ReferenceData,
};
use tca_store::{ParquetReader, ParquetWriter};
use tracing::info;

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub executions: ExecutionProfile,
    pub market_data: QuoteProfile,
    pub reference_listings: usize,
    /// Executions left after the continuous-trading filter.
    pub continuous_executions: usize,
    pub enrichment: EnrichmentStats,
    pub snapshots: usize,
    pub ticks_discarded: u64,
    pub slippage: SlippageSummary,
    pub output: PathBuf,
    pub elapsed_secs: f64,
}

/// Run the whole job for `config`.
pub fn run(config: &Config) -> Result<RunReport> {
    let started = Instant::now();
    let paths = &config.paths;

    info!("Loading data...");
    let reader = ParquetReader::new()?;
    let executions = reader.load_executions(&paths.executions)?;
    let listings = reader.load_listings(&paths.refdata)?;
    let ticks = reader.load_quote_ticks(&paths.marketdata)?;
    info!("Executions data count: {}", executions.len());
    info!("Refdata count: {}", listings.len());
    info!("Marketdata count: {}", ticks.len());

    info!("Starting analysis of executions data...");
    let execution_profile = ExecutionProfile::from_executions(&executions);
    execution_profile.log();
    let quote_profile = QuoteProfile::from_ticks(&ticks);
    quote_profile.log();

    info!("Starting data cleaning for CONTINUOUS_TRADING executions...");
    let continuous = filter_continuous(executions);
    let continuous_executions = continuous.len();
    info!("Filtered executions data count: {}", continuous_executions);

    info!("Starting data transformation and enrichment...");
    let reference_listings = listings.len();
    let refdata = ReferenceData::new(listings);
    let (enriched, enrichment) = enrich(continuous, &refdata);
    info!("Enriched executions data count: {}", enriched.len());

    info!("Starting calculation of metrics...");
    let engine = TcaEngine::from_ticks(&ticks, &config.matching)?;
    drop(ticks);
    let trades: Vec<Trade> = enriched.iter().map(EnrichedExecution::to_trade).collect();
    let scored = engine.score_trades(&trades);
    let slippage = SlippageSummary::from_scored(&scored);
    slippage.log();

    info!("Saving file to {}...", paths.output.display());
    ParquetWriter::new()?.write(&paths.output, &enriched, &scored)?;

    let elapsed_secs = started.elapsed().as_secs_f64();
    info!("Total execution time: {:.2} seconds.", elapsed_secs);

    let index_stats = engine.index().stats();
    Ok(RunReport {
        executions: execution_profile,
        market_data: quote_profile,
        reference_listings,
        continuous_executions,
        enrichment,
        snapshots: index_stats.snapshots,
        ticks_discarded: index_stats.ticks_discarded,
        slippage,
        output: paths.output.clone(),
        elapsed_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use duckdb::Connection;
    use std::path::Path;
    use tca_core::config::{MatchingConfig, PathsConfig};
    use tempfile::TempDir;

    fn write_parquet(path: &Path, select: &str) {
        let conn = Connection::open_in_memory().unwrap();
        let target = path.display().to_string().replace('\'', "''");
        conn.execute_batch(&format!("COPY ({select}) TO '{target}' (FORMAT PARQUET)"))
            .unwrap();
    }

    fn write_inputs(dir: &Path, market_rows: &str) -> Config {
        let paths = PathsConfig {
            executions: dir.join("executions.parquet"),
            refdata: dir.join("refdata.parquet"),
            marketdata: dir.join("marketdata.parquet"),
            output: dir.join("output").join("trading_metrics.parquet"),
        };

        write_parquet(
            &paths.executions,
            "SELECT * FROM (VALUES \
                (TIMESTAMP '2023-01-01 12:00:00.123456', 100, 10.5, 'ISIN123', 'NYSE', 'CONTINUOUS_TRADING'), \
                (TIMESTAMP '2023-01-01 12:00:00.500000', 10, 10.55, 'ISIN123', 'NYSE', 'AUCTION'), \
                (TIMESTAMP '2023-01-01 12:00:01.123789', -50, 10.7, 'ISIN123', 'NYSE', 'CONTINUOUS_TRADING'), \
                (TIMESTAMP '2023-01-01 12:00:01.200000', 20, 10.7, 'ISIN999', 'NYSE', 'CONTINUOUS_TRADING') \
             ) t(TradeTime, Quantity, Price, ISIN, Venue, Phase)",
        );
        write_parquet(
            &paths.refdata,
            "SELECT * FROM (VALUES \
                ('ISIN123', 'Ticker1', 'XNYS', 1), \
                ('ISIN456', 'Ticker2', 'XLON', 2) \
             ) t(ISIN, primary_ticker, primary_mic, id)",
        );
        write_parquet(&paths.marketdata, market_rows);

        Config {
            paths,
            matching: MatchingConfig { workers: 2 },
        }
    }

    fn read_output(path: &Path) -> Vec<(f64, Option<f64>, Option<f64>, Option<f64>, f64)> {
        let conn = Connection::open_in_memory().unwrap();
        let target = path.display().to_string().replace('\'', "''");
        let mut stmt = conn
            .prepare(&format!(
                "SELECT Quantity, best_bid, best_ask, mid_price, slippage FROM read_parquet('{target}')"
            ))
            .unwrap();
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)))
            .unwrap()
            .collect::<duckdb::Result<Vec<_>>>()
            .unwrap();
        rows
    }

    #[test]
    fn test_end_to_end() {
        let dir = TempDir::new().unwrap();
        let config = write_inputs(
            dir.path(),
            "SELECT * FROM (VALUES \
                (TIMESTAMP '2023-01-01 12:00:00', 1, 'XNYS', 10.4, 10.6, 'CONTINUOUS_TRADING'), \
                (TIMESTAMP '2023-01-01 12:00:00.700', 1, 'XNYS', 10.0, 10.2, 'AUCTION'), \
                (TIMESTAMP '2023-01-01 12:00:01', 1, 'XNYS', 10.6, 10.8, 'CONTINUOUS_TRADING') \
             ) t(event_timestamp, listing_id, primary_mic, best_bid_price, best_ask_price, market_state)",
        );

        let report = run(&config).unwrap();

        assert_eq!(report.executions.total_executions, 4);
        assert_eq!(report.continuous_executions, 3);
        assert_eq!(report.enrichment.enriched, 2);
        assert_eq!(report.enrichment.unmatched, 1);
        assert_eq!(report.snapshots, 2);
        assert_eq!(report.ticks_discarded, 1);
        assert_eq!(report.slippage.trades, 3);
        assert_eq!(report.slippage.scored_with_quote, 2);

        let rows = read_output(&config.paths.output);
        assert_eq!(rows.len(), 3);

        // Buy at 12:00:00.123456 against 10.4 / 10.6.
        assert_eq!(rows[0].0, 100.0);
        assert_relative_eq!(rows[0].1.unwrap(), 10.4);
        assert_relative_eq!(rows[0].2.unwrap(), 10.6);
        assert_relative_eq!(rows[0].3.unwrap(), 10.5, epsilon = 1e-9);
        assert_relative_eq!(rows[0].4, 0.5, epsilon = 1e-9);

        // Sell at 12:00:01.123789 against 10.6 / 10.8.
        assert_eq!(rows[1].0, -50.0);
        assert_relative_eq!(rows[1].4, 0.5, epsilon = 1e-9);

        // ISIN999 has no reference data: kept, never quoted, slippage 0.
        assert_eq!(rows[2].0, 20.0);
        assert!(rows[2].1.is_none());
        assert!(rows[2].2.is_none());
        assert!(rows[2].3.is_none());
        assert_eq!(rows[2].4, 0.0);
    }

    #[test]
    fn test_end_to_end_without_market_data() {
        let dir = TempDir::new().unwrap();
        let config = write_inputs(
            dir.path(),
            "SELECT * FROM (VALUES \
                (TIMESTAMP '2023-01-01 12:00:00', 1, 'XNYS', 10.4, 10.6, 'CONTINUOUS_TRADING') \
             ) t(event_timestamp, listing_id, primary_mic, best_bid_price, best_ask_price, market_state) \
             WHERE false",
        );

        let report = run(&config).unwrap();
        assert_eq!(report.snapshots, 0);

        let rows = read_output(&config.paths.output);
        assert_eq!(rows.len(), 3);
        for row in rows {
            assert!(row.1.is_none());
            assert!(row.2.is_none());
            assert!(row.3.is_none());
            assert_eq!(row.4, 0.0);
        }
    }

    #[test]
    fn test_missing_input_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut config = write_inputs(
            dir.path(),
            "SELECT * FROM (VALUES \
                (TIMESTAMP '2023-01-01 12:00:00', 1, 'XNYS', 10.4, 10.6, 'CONTINUOUS_TRADING') \
             ) t(event_timestamp, listing_id, primary_mic, best_bid_price, best_ask_price, market_state)",
        );
        config.paths.refdata = dir.path().join("missing.parquet");

        assert!(run(&config).is_err());
        assert!(!config.paths.output.exists());
    }
}
