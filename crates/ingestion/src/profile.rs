//! Descriptive statistics of the raw inputs, logged before processing.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tca_core::{ts_to_datetime, ts_to_date, Execution, QuoteTick, TimestampUs};
use tracing::info;

/// Summary of the raw execution set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionProfile {
    pub total_executions: usize,
    pub unique_venues: usize,
    pub unique_dates: usize,
    pub min_trade_time: Option<TimestampUs>,
    pub max_trade_time: Option<TimestampUs>,
}

impl ExecutionProfile {
    pub fn from_executions(executions: &[Execution]) -> Self {
        let venues: HashSet<&str> = executions.iter().map(|e| e.venue.as_str()).collect();
        let dates: HashSet<NaiveDate> = executions.iter().filter_map(|e| ts_to_date(e.trade_time)).collect();

        Self {
            total_executions: executions.len(),
            unique_venues: venues.len(),
            unique_dates: dates.len(),
            min_trade_time: executions.iter().map(|e| e.trade_time).min(),
            max_trade_time: executions.iter().map(|e| e.trade_time).max(),
        }
    }

    pub fn log(&self) {
        info!("Total number of executions: {}", self.total_executions);
        info!("Unique number of venues: {}", self.unique_venues);
        info!("Unique dates of executions: {}", self.unique_dates);
        info!(
            "Executions TradeTime ranges from {} to {}",
            format_ts(self.min_trade_time),
            format_ts(self.max_trade_time)
        );
    }
}

/// Summary of the raw quote tick set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteProfile {
    pub total_ticks: usize,
    pub min_event_time: Option<TimestampUs>,
    pub max_event_time: Option<TimestampUs>,
}

impl QuoteProfile {
    pub fn from_ticks(ticks: &[QuoteTick]) -> Self {
        Self {
            total_ticks: ticks.len(),
            min_event_time: ticks.iter().map(|t| t.event_time).min(),
            max_event_time: ticks.iter().map(|t| t.event_time).max(),
        }
    }

    pub fn log(&self) {
        info!(
            "Market data event_timestamp ranges from {} to {}",
            format_ts(self.min_event_time),
            format_ts(self.max_event_time)
        );
    }
}

/// Render an optional timestamp for log output.
pub fn format_ts(ts_us: Option<TimestampUs>) -> String {
    match ts_us.and_then(ts_to_datetime) {
        Some(dt) => format_datetime(dt),
        None => "n/a".to_string(),
    }
}

fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}
