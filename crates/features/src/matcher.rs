//! Trade-to-quote matching.
//!
//! Looks up the snapshot for a trade's second and its neighbours. A miss is
//! an ordinary outcome and yields an empty [`MatchedQuote`].

use tca_core::{ts_to_second, MatchedQuote, MatchedTrade, QuoteOffset, Trade, US_PER_SECOND};
use tca_ingestion::SnapshotIndex;

/// Matches trades against a read-only snapshot index.
#[derive(Clone, Copy)]
pub struct QuoteMatcher<'a> {
    index: &'a SnapshotIndex,
}

impl<'a> QuoteMatcher<'a> {
    pub fn new(index: &'a SnapshotIndex) -> Self {
        Self { index }
    }

    /// Quote for a trade at one offset.
    ///
    /// The trade time is floored to the second before the offset is applied.
    /// A trade without quote keys always misses.
    pub fn lookup_at(&self, trade: &Trade, offset: QuoteOffset) -> MatchedQuote {
        let (Some(instrument_id), Some(venue)) = (trade.instrument_id, trade.venue.as_deref()) else {
            return MatchedQuote::missing();
        };
        let second = ts_to_second(trade.trade_time) + offset.seconds() * US_PER_SECOND;
        self.index
            .lookup(second, instrument_id, venue)
            .map(MatchedQuote::from_snapshot)
            .unwrap_or_else(MatchedQuote::missing)
    }

    /// Match a trade at every offset.
    pub fn match_trade(&self, trade: &Trade) -> MatchedTrade {
        MatchedTrade {
            trade: trade.clone(),
            quotes: QuoteOffset::ALL.map(|offset| self.lookup_at(trade, offset)),
        }
    }
}
