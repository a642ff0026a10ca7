//! Scored trade output to parquet.
//!
//! Rows are staged in an in-memory DuckDB table through an appender and
//! copied out in input order. The file is written under a temporary name and
//! renamed into place, so a failed run leaves no partial output.

use std::path::{Path, PathBuf};

use duckdb::{params, Connection};
use tca_core::{Error, QuoteOffset, Result, ScoredTrade};
use tca_ingestion::EnrichedExecution;
use tracing::info;

use crate::{db_err, sql_path};

/// Quote column groups in output order.
const OUTPUT_OFFSETS: [QuoteOffset; 3] = [QuoteOffset::At, QuoteOffset::Before, QuoteOffset::After];

const STAGING_TABLE: &str = "scored_trades";

fn staging_ddl() -> String {
    let mut quote_columns = String::new();
    for offset in OUTPUT_OFFSETS {
        let suffix = offset.column_suffix();
        quote_columns.push_str(&format!(
            "best_bid{suffix} DOUBLE, best_ask{suffix} DOUBLE, mid_price{suffix} DOUBLE, "
        ));
    }
    format!(
        "CREATE TABLE {STAGING_TABLE} (\
            row_nr BIGINT, trade_time_us BIGINT, \"Quantity\" DOUBLE, \"Price\" DOUBLE, \
            \"ISIN\" VARCHAR, \"Venue\" VARCHAR, \"Phase\" VARCHAR, side BIGINT, \
            primary_ticker VARCHAR, primary_mic VARCHAR, listing_id BIGINT, \
            {quote_columns}slippage DOUBLE)"
    )
}

fn copy_sql(target: &Path) -> String {
    format!(
        "COPY (SELECT make_timestamp(trade_time_us) AS \"TradeTime\", \
                      * EXCLUDE (row_nr, trade_time_us) \
               FROM {STAGING_TABLE} ORDER BY row_nr) \
         TO {} (FORMAT PARQUET)",
        sql_path(target)
    )
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writer for the scored output file.
pub struct ParquetWriter {
    conn: Connection,
}

impl ParquetWriter {
    pub fn new() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Write executions and their scores, pairwise, to `path`.
    ///
    /// Both slices must come from the same run and have the same length.
    pub fn write(&self, path: &Path, executions: &[EnrichedExecution], scored: &[ScoredTrade]) -> Result<usize> {
        if executions.len() != scored.len() {
            return Err(Error::data(format!(
                "{} executions but {} scored trades",
                executions.len(),
                scored.len()
            )));
        }

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }

        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {STAGING_TABLE}; {}", staging_ddl()))
            .map_err(db_err)?;

        {
            // Dropping the appender flushes the staged rows.
            let mut appender = self.conn.appender(STAGING_TABLE).map_err(db_err)?;
            for (row_nr, (enriched, s)) in executions.iter().zip(scored).enumerate() {
                let e = &enriched.execution;
                let listing = enriched.listing.as_ref();
                let primary_ticker = listing.map(|l| l.primary_ticker.as_str());
                let primary_mic = listing.map(|l| l.primary_mic.as_str());
                let listing_id = listing.map(|l| l.listing_id);
                let row_nr = row_nr as i64;
                let phase = e.phase.as_str().to_string();
                let side = i64::from(enriched.side.code());
                let at = s.quote(QuoteOffset::At);
                let before = s.quote(QuoteOffset::Before);
                let after = s.quote(QuoteOffset::After);
                appender
                    .append_row(params![
                        row_nr,
                        e.trade_time,
                        e.quantity,
                        e.price,
                        e.isin,
                        e.venue,
                        phase,
                        side,
                        primary_ticker,
                        primary_mic,
                        listing_id,
                        at.best_bid,
                        at.best_ask,
                        at.mid_price,
                        before.best_bid,
                        before.best_ask,
                        before.mid_price,
                        after.best_bid,
                        after.best_ask,
                        after.mid_price,
                        s.slippage,
                    ])
                    .map_err(db_err)?;
            }
        }

        let tmp = temp_path(path);
        self.conn.execute_batch(&copy_sql(&tmp)).map_err(db_err)?;
        std::fs::rename(&tmp, path)?;

        info!("Output saved to '{}'.", path.display());
        Ok(scored.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tca_core::{Execution, Listing, MarketState, MatchedQuote, MatchedTrade, Side};
    use tempfile::TempDir;

    fn make_pair(trade_time: i64, quantity: f64, at: MatchedQuote, slippage: f64) -> (EnrichedExecution, ScoredTrade) {
        let enriched = EnrichedExecution {
            execution: Execution {
                trade_time,
                quantity,
                price: 10.5,
                isin: "ISIN123".to_string(),
                venue: "NYSE".to_string(),
                phase: MarketState::ContinuousTrading,
            },
            side: Side::from_quantity(quantity),
            listing: Some(Listing {
                isin: "ISIN123".to_string(),
                listing_id: 1,
                primary_ticker: "Ticker1".to_string(),
                primary_mic: "XNYS".to_string(),
            }),
        };
        let scored = ScoredTrade {
            matched: MatchedTrade {
                trade: enriched.to_trade(),
                quotes: [MatchedQuote::missing(), at, MatchedQuote::missing()],
            },
            slippage,
        };
        (enriched, scored)
    }

    #[test]
    fn test_write_round_trip_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output").join("trading_metrics.parquet");

        let (e1, s1) = make_pair(1_672_574_400_123_456, 100.0, MatchedQuote::from_sides(Some(10.4), Some(10.6)), 0.5);
        let (e2, s2) = make_pair(1_672_574_401_000_000, -50.0, MatchedQuote::missing(), 0.0);

        let writer = ParquetWriter::new().unwrap();
        let written = writer.write(&path, &[e1, e2], &[s1, s2]).unwrap();
        assert_eq!(written, 2);
        assert!(path.exists());
        assert!(!temp_path(&path).exists());

        let conn = Connection::open_in_memory().unwrap();
        let sql = format!(
            "SELECT epoch_us(\"TradeTime\"), side, best_bid, mid_price, best_bid_min_1s, slippage \
             FROM read_parquet({})",
            sql_path(&path)
        );
        let mut stmt = conn.prepare(&sql).unwrap();
        let rows: Vec<(i64, i64, Option<f64>, Option<f64>, Option<f64>, f64)> = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
            })
            .unwrap()
            .collect::<duckdb::Result<Vec<_>>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 1_672_574_400_123_456);
        assert_eq!(rows[0].1, 1);
        assert_relative_eq!(rows[0].2.unwrap(), 10.4);
        assert_relative_eq!(rows[0].3.unwrap(), 10.5, epsilon = 1e-9);
        assert_eq!(rows[0].4, None);
        assert_relative_eq!(rows[0].5, 0.5);

        assert_eq!(rows[1].1, 2);
        assert_eq!(rows[1].2, None);
        assert_eq!(rows[1].3, None);
        assert_eq!(rows[1].5, 0.0);
    }

    #[test]
    fn test_output_column_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.parquet");
        let (e, s) = make_pair(0, 1.0, MatchedQuote::missing(), 0.0);

        ParquetWriter::new().unwrap().write(&path, &[e], &[s]).unwrap();

        let conn = Connection::open_in_memory().unwrap();
        let sql = format!("SELECT column_name FROM (DESCRIBE SELECT * FROM read_parquet({}))", sql_path(&path));
        let mut stmt = conn.prepare(&sql).unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<duckdb::Result<Vec<_>>>()
            .unwrap();

        let expected = [
            "TradeTime",
            "Quantity",
            "Price",
            "ISIN",
            "Venue",
            "Phase",
            "side",
            "primary_ticker",
            "primary_mic",
            "listing_id",
            "best_bid",
            "best_ask",
            "mid_price",
            "best_bid_min_1s",
            "best_ask_min_1s",
            "mid_price_min_1s",
            "best_bid_1s",
            "best_ask_1s",
            "mid_price_1s",
            "slippage",
        ];
        assert_eq!(names, expected);
    }

    #[test]
    fn test_execution_without_listing_writes_nulls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.parquet");
        let (mut e, _) = make_pair(0, 20.0, MatchedQuote::missing(), 0.0);
        e.listing = None;
        e.execution.isin = "ISIN999".to_string();
        let s = ScoredTrade {
            matched: MatchedTrade {
                trade: e.to_trade(),
                quotes: [MatchedQuote::missing(); 3],
            },
            slippage: 0.0,
        };

        ParquetWriter::new().unwrap().write(&path, &[e], &[s]).unwrap();

        let conn = Connection::open_in_memory().unwrap();
        let sql = format!(
            "SELECT \"ISIN\", primary_ticker, primary_mic, listing_id, best_bid, slippage FROM read_parquet({})",
            sql_path(&path)
        );
        let row: (String, Option<String>, Option<String>, Option<i64>, Option<f64>, f64) = conn
            .query_row(&sql, [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
            })
            .unwrap();

        assert_eq!(row.0, "ISIN999");
        assert_eq!(row.1, None);
        assert_eq!(row.2, None);
        assert_eq!(row.3, None);
        assert_eq!(row.4, None);
        assert_eq!(row.5, 0.0);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.parquet");
        let (e, _) = make_pair(0, 1.0, MatchedQuote::missing(), 0.0);

        let err = ParquetWriter::new().unwrap().write(&path, &[e], &[]).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
        assert!(!path.exists());
    }
}
