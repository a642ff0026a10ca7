//! Parquet input loading through an in-memory DuckDB connection.
//!
//! Column names follow the upstream files. Timestamps are converted to epoch
//! microseconds in SQL. Timestamp columns, tz-aware or naive, are converted
//! directly so no session time zone is applied; string columns are parsed as
//! naive UTC.

use std::path::Path;

use duckdb::Connection;
use tca_core::{Error, Execution, Listing, MarketState, QuoteTick, Result};
use tracing::info;

use crate::{db_err, sql_path};

/// Required value or an input-shape error.
fn required<T>(value: Option<T>, source: &str, row: usize, column: &str) -> Result<T> {
    value.ok_or_else(|| Error::missing_field(source, row, column))
}

fn parse_state(raw: &str) -> MarketState {
    raw.parse().unwrap_or(MarketState::Other)
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file not found: {}", path.display()),
        )))
    }
}

type ExecutionRow = (
    Option<i64>,
    Option<f64>,
    Option<f64>,
    Option<String>,
    Option<String>,
    Option<String>,
);

type ListingRow = (Option<String>, Option<i64>, Option<String>, Option<String>);

type TickRow = (
    Option<i64>,
    Option<i64>,
    Option<String>,
    Option<f64>,
    Option<f64>,
    Option<String>,
);

/// Reader for the three batch inputs.
pub struct ParquetReader {
    conn: Connection,
}

impl ParquetReader {
    /// Create a reader backed by an in-memory database.
    pub fn new() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Load raw executions.
    pub fn load_executions(&self, path: &Path) -> Result<Vec<Execution>> {
        ensure_exists(path)?;
        let sql = format!(
            "SELECT {}, \
                    CAST(Quantity AS DOUBLE), \
                    CAST(Price AS DOUBLE), \
                    CAST(ISIN AS VARCHAR), \
                    CAST(Venue AS VARCHAR), \
                    CAST(Phase AS VARCHAR) \
             FROM read_parquet({})",
            self.epoch_us_expr(path, "TradeTime")?,
            sql_path(path)
        );
        let rows: Vec<ExecutionRow> = self.query(&sql, |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
        })?;

        let source = "executions";
        let executions = rows
            .into_iter()
            .enumerate()
            .map(|(i, (trade_time, quantity, price, isin, venue, phase))| {
                Ok(Execution {
                    trade_time: required(trade_time, source, i, "TradeTime")?,
                    quantity: required(quantity, source, i, "Quantity")?,
                    price: required(price, source, i, "Price")?,
                    isin: required(isin, source, i, "ISIN")?,
                    venue: required(venue, source, i, "Venue")?,
                    phase: parse_state(&required(phase, source, i, "Phase")?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(rows = executions.len(), path = %path.display(), "Loaded executions");
        Ok(executions)
    }

    /// Load instrument reference data. The `id` column becomes `listing_id`.
    pub fn load_listings(&self, path: &Path) -> Result<Vec<Listing>> {
        ensure_exists(path)?;
        let sql = format!(
            "SELECT CAST(ISIN AS VARCHAR), \
                    CAST(id AS BIGINT), \
                    CAST(primary_ticker AS VARCHAR), \
                    CAST(primary_mic AS VARCHAR) \
             FROM read_parquet({})",
            sql_path(path)
        );
        let rows: Vec<ListingRow> =
            self.query(&sql, |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?;

        let source = "refdata";
        let listings = rows
            .into_iter()
            .enumerate()
            .map(|(i, (isin, id, ticker, mic))| {
                Ok(Listing {
                    isin: required(isin, source, i, "ISIN")?,
                    listing_id: required(id, source, i, "id")?,
                    primary_ticker: required(ticker, source, i, "primary_ticker")?,
                    primary_mic: required(mic, source, i, "primary_mic")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(rows = listings.len(), path = %path.display(), "Loaded reference data");
        Ok(listings)
    }

    /// Load raw quote ticks.
    pub fn load_quote_ticks(&self, path: &Path) -> Result<Vec<QuoteTick>> {
        ensure_exists(path)?;
        let sql = format!(
            "SELECT {}, \
                    CAST(listing_id AS BIGINT), \
                    CAST(primary_mic AS VARCHAR), \
                    CAST(best_bid_price AS DOUBLE), \
                    CAST(best_ask_price AS DOUBLE), \
                    CAST(market_state AS VARCHAR) \
             FROM read_parquet({})",
            self.epoch_us_expr(path, "event_timestamp")?,
            sql_path(path)
        );
        let rows: Vec<TickRow> = self.query(&sql, |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
        })?;

        let source = "marketdata";
        let ticks = rows
            .into_iter()
            .enumerate()
            .map(|(i, (event_time, listing_id, mic, bid, ask, state))| {
                Ok(QuoteTick {
                    event_time: required(event_time, source, i, "event_timestamp")?,
                    instrument_id: required(listing_id, source, i, "listing_id")?,
                    venue: required(mic, source, i, "primary_mic")?,
                    bid_price: required(bid, source, i, "best_bid_price")?,
                    ask_price: required(ask, source, i, "best_ask_price")?,
                    market_state: parse_state(&required(state, source, i, "market_state")?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(rows = ticks.len(), path = %path.display(), "Loaded market data");
        Ok(ticks)
    }

    /// SQL expression yielding `column` as epoch microseconds.
    fn epoch_us_expr(&self, path: &Path, column: &str) -> Result<String> {
        let sql = format!(
            "SELECT column_type FROM (DESCRIBE SELECT \"{column}\" FROM read_parquet({}))",
            sql_path(path)
        );
        let types: Vec<String> = self.query(&sql, |row| row.get(0))?;
        let column_type = types
            .first()
            .ok_or_else(|| Error::data(format!("column {column} not found in {}", path.display())))?;

        if column_type.starts_with("TIMESTAMP") {
            Ok(format!("epoch_us(\"{column}\")"))
        } else {
            Ok(format!("epoch_us(CAST(\"{column}\" AS TIMESTAMP))"))
        }
    }

    fn query<T, F>(&self, sql: &str, f: F) -> Result<Vec<T>>
    where
        F: FnMut(&duckdb::Row<'_>) -> duckdb::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let rows = stmt.query_map([], f).map_err(db_err)?;
        let collected = rows.collect::<duckdb::Result<Vec<T>>>().map_err(db_err)?;
        Ok(collected)
    }
}
