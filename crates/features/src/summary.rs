//! Run-level slippage statistics.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};
use tca_core::{QuoteOffset, ScoredTrade};
use tracing::info;

/// Distribution of slippage over a scored trade set.
///
/// Location statistics are computed only over trades with a usable quote at
/// the trade's own second; defaulted zeros would otherwise bias them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlippageSummary {
    /// Trades scored.
    pub trades: usize,
    /// Trades with a bid and ask at 0s and a non-zero spread.
    pub scored_with_quote: usize,
    /// Share of trades with a quote at -1s, 0s and +1s.
    pub coverage: [f64; 3],
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SlippageSummary {
    pub fn from_scored(scored: &[ScoredTrade]) -> Self {
        let mut summary = SlippageSummary {
            trades: scored.len(),
            ..Default::default()
        };
        if scored.is_empty() {
            return summary;
        }

        for offset in QuoteOffset::ALL {
            let hits = scored.iter().filter(|s| s.quote(offset).is_present()).count();
            summary.coverage[offset.index()] = hits as f64 / scored.len() as f64;
        }

        let values: Vec<f64> = scored
            .iter()
            .filter(|s| has_usable_quote(s))
            .map(|s| s.slippage)
            .collect();
        summary.scored_with_quote = values.len();
        if values.is_empty() {
            return summary;
        }

        summary.mean = values.iter().mean();
        summary.std_dev = if values.len() > 1 { values.iter().std_dev() } else { 0.0 };
        summary.median = Data::new(values.clone()).median();
        summary.min = Iterator::min(values.iter().copied().map(OrderedFloat)).map_or(0.0, |v| v.0);
        summary.max = Iterator::max(values.iter().copied().map(OrderedFloat)).map_or(0.0, |v| v.0);
        summary
    }

    pub fn log(&self) {
        info!(
            trades = self.trades,
            with_quote = self.scored_with_quote,
            coverage_min_1s = self.coverage[QuoteOffset::Before.index()],
            coverage_0s = self.coverage[QuoteOffset::At.index()],
            coverage_1s = self.coverage[QuoteOffset::After.index()],
            "Quote coverage"
        );
        info!(
            mean = self.mean,
            median = self.median,
            std_dev = self.std_dev,
            min = self.min,
            max = self.max,
            "Slippage distribution"
        );
    }
}

fn has_usable_quote(scored: &ScoredTrade) -> bool {
    let quote = scored.quote(QuoteOffset::At);
    match (quote.best_bid, quote.best_ask) {
        (Some(bid), Some(ask)) => ask != bid && scored.matched.trade.quantity != 0.0,
        _ => false,
    }
}
