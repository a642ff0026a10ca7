//! Match-and-score engine.
//!
//! Owns the snapshot index for a run and fans the per-trade work out over a
//! rayon pool. Each trade is scored independently against the read-only
//! index; output order equals input order.

use rayon::prelude::*;
use tca_core::config::MatchingConfig;
use tca_core::{Error, QuoteTick, Result, ScoredTrade, Trade};
use tca_ingestion::SnapshotIndex;
use tracing::{debug, info};

use crate::matcher::QuoteMatcher;
use crate::slippage::score;

/// Trade-to-quote enrichment engine.
pub struct TcaEngine {
    index: SnapshotIndex,
    /// Dedicated pool when a worker count is configured.
    pool: Option<rayon::ThreadPool>,
}

impl TcaEngine {
    /// Create an engine over an already built index.
    pub fn new(index: SnapshotIndex, config: &MatchingConfig) -> Result<Self> {
        let pool = match config.workers {
            0 => None,
            n => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("tca-match-{i}"))
                    .build()
                    .map_err(|e| Error::config(format!("failed to build matcher pool: {e}")))?,
            ),
        };
        Ok(Self { index, pool })
    }

    /// Build the snapshot index from raw ticks and create an engine over it.
    pub fn from_ticks(ticks: &[QuoteTick], config: &MatchingConfig) -> Result<Self> {
        Self::new(SnapshotIndex::build(ticks), config)
    }

    pub fn index(&self) -> &SnapshotIndex {
        &self.index
    }

    /// Match and score a single trade.
    pub fn score_trade(&self, trade: &Trade) -> ScoredTrade {
        score(QuoteMatcher::new(&self.index).match_trade(trade))
    }

    /// Match and score every trade, preserving input order.
    pub fn score_trades(&self, trades: &[Trade]) -> Vec<ScoredTrade> {
        let matcher = QuoteMatcher::new(&self.index);
        let run = || -> Vec<ScoredTrade> {
            trades
                .par_iter()
                .map(|trade| score(matcher.match_trade(trade)))
                .collect()
        };

        let scored = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        debug!(
            workers = self.pool.as_ref().map_or_else(rayon::current_num_threads, |p| p.current_num_threads()),
            "parallel scoring finished"
        );
        info!(trades = scored.len(), "Calculation of metrics completed successfully.");
        scored
    }
}
