//! Core data types for the TCA workspace.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp in microseconds since Unix epoch (UTC).
pub type TimestampUs = i64;

/// Instrument identifier (the reference-data listing id).
pub type InstrumentId = i64;

/// Microseconds per second.
pub const US_PER_SECOND: i64 = 1_000_000;

/// Truncate a timestamp to its whole-second boundary.
///
/// Always floors, including for timestamps before the epoch.
#[inline]
pub fn ts_to_second(ts_us: TimestampUs) -> TimestampUs {
    ts_us.div_euclid(US_PER_SECOND) * US_PER_SECOND
}

/// Convert a timestamp to a UTC datetime, if representable.
pub fn ts_to_datetime(ts_us: TimestampUs) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(ts_us)
}

/// Calendar date (UTC) of a timestamp.
pub fn ts_to_date(ts_us: TimestampUs) -> Option<NaiveDate> {
    ts_to_datetime(ts_us).map(|dt| dt.date_naive())
}

/// Trading phase / market state as published upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketState {
    /// Continuous order matching.
    ContinuousTrading,
    /// Opening, closing or intraday auction.
    Auction,
    /// Pre-open order entry.
    PreOpen,
    /// Market closed.
    Closed,
    /// Any state string we do not recognise.
    Other,
}

impl MarketState {
    /// Upstream string form.
    pub fn as_str(self) -> &'static str {
        match self {
            MarketState::ContinuousTrading => "CONTINUOUS_TRADING",
            MarketState::Auction => "AUCTION",
            MarketState::PreOpen => "PRE_OPEN",
            MarketState::Closed => "CLOSED",
            MarketState::Other => "OTHER",
        }
    }

    #[inline]
    pub fn is_continuous(self) -> bool {
        self == MarketState::ContinuousTrading
    }
}

impl FromStr for MarketState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONTINUOUS_TRADING" => MarketState::ContinuousTrading,
            "AUCTION" => MarketState::Auction,
            "PRE_OPEN" => MarketState::PreOpen,
            "CLOSED" => MarketState::Closed,
            _ => MarketState::Other,
        })
    }
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw quote update from the market data feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteTick {
    /// Event timestamp in microseconds.
    pub event_time: TimestampUs,
    /// Listing id of the quoted instrument.
    pub instrument_id: InstrumentId,
    /// Venue MIC.
    pub venue: String,
    /// Best bid price.
    pub bid_price: f64,
    /// Best ask price.
    pub ask_price: f64,
    /// Market state the quote was published in.
    pub market_state: MarketState,
}

/// Best bid/ask attributed to one (second, instrument, venue).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    /// Second boundary timestamp (us).
    pub second: TimestampUs,
    pub instrument_id: InstrumentId,
    pub venue: String,
    /// Highest bid seen in the second.
    pub best_bid: f64,
    /// Lowest ask seen in the second.
    pub best_ask: f64,
}

impl QuoteSnapshot {
    #[inline]
    pub fn mid(&self) -> f64 {
        (self.best_bid + self.best_ask) / 2.0
    }
}

/// A raw execution record as delivered by the order management system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    /// Trade timestamp in microseconds.
    pub trade_time: TimestampUs,
    /// Signed quantity (positive = buy, negative = sell).
    pub quantity: f64,
    /// Execution price.
    pub price: f64,
    /// Security identifier used for the reference-data join.
    pub isin: String,
    /// Venue reported on the execution.
    pub venue: String,
    /// Trading phase the execution happened in.
    pub phase: MarketState,
}

/// Reference-data listing for a security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub isin: String,
    pub listing_id: InstrumentId,
    pub primary_ticker: String,
    /// Primary market MIC, the venue quotes are keyed on.
    pub primary_mic: String,
}

/// Execution side using the FIX `Side` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    Buy = 1,
    Sell = 2,
}

impl Side {
    /// Negative quantities are sells; everything else reports as a buy.
    #[inline]
    pub fn from_quantity(quantity: f64) -> Self {
        if quantity < 0.0 {
            Side::Sell
        } else {
            Side::Buy
        }
    }

    /// FIX side code.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// A trade ready for quote matching.
///
/// The quote keys are `None` when the trade has no reference data; such a
/// trade misses at every offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Trade timestamp in microseconds.
    pub trade_time: TimestampUs,
    /// Signed quantity; the sign gives the side.
    pub quantity: f64,
    pub price: f64,
    pub instrument_id: Option<InstrumentId>,
    pub venue: Option<String>,
}

/// Time offset applied to a trade before snapshot lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteOffset {
    /// One second before the trade.
    Before,
    /// The trade's own second.
    At,
    /// One second after the trade.
    After,
}

impl QuoteOffset {
    /// Offsets in storage order.
    pub const ALL: [QuoteOffset; 3] = [QuoteOffset::Before, QuoteOffset::At, QuoteOffset::After];

    /// Offset in whole seconds.
    #[inline]
    pub fn seconds(self) -> i64 {
        match self {
            QuoteOffset::Before => -1,
            QuoteOffset::At => 0,
            QuoteOffset::After => 1,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        match self {
            QuoteOffset::Before => 0,
            QuoteOffset::At => 1,
            QuoteOffset::After => 2,
        }
    }

    /// Column suffix used in the output file.
    pub fn column_suffix(self) -> &'static str {
        match self {
            QuoteOffset::Before => "_min_1s",
            QuoteOffset::At => "",
            QuoteOffset::After => "_1s",
        }
    }
}

/// Quote matched to a trade at one offset. All fields are `None` on a miss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchedQuote {
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
    pub mid_price: Option<f64>,
}

impl MatchedQuote {
    /// Quote with no data.
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &QuoteSnapshot) -> Self {
        Self {
            best_bid: Some(snapshot.best_bid),
            best_ask: Some(snapshot.best_ask),
            mid_price: Some(snapshot.mid()),
        }
    }

    /// Build from nullable sides; mid is only defined when both are present.
    pub fn from_sides(best_bid: Option<f64>, best_ask: Option<f64>) -> Self {
        let mid_price = match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        };
        Self {
            best_bid,
            best_ask,
            mid_price,
        }
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.best_bid.is_some() && self.best_ask.is_some()
    }
}

/// A trade with the quotes prevailing at each offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedTrade {
    pub trade: Trade,
    /// Indexed by `QuoteOffset::index`.
    pub quotes: [MatchedQuote; 3],
}

impl MatchedTrade {
    #[inline]
    pub fn quote(&self, offset: QuoteOffset) -> &MatchedQuote {
        &self.quotes[offset.index()]
    }
}

/// A matched trade with its slippage score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredTrade {
    pub matched: MatchedTrade,
    /// Fraction of the 0s spread given up; 0 when undefined.
    pub slippage: f64,
}

impl ScoredTrade {
    #[inline]
    pub fn quote(&self, offset: QuoteOffset) -> &MatchedQuote {
        self.matched.quote(offset)
    }
}
