//! Per-second quote snapshot building.
//!
//! Collapses raw quote ticks into one best bid / best ask per
//! (second, instrument, venue), keeping only continuous-trading quotes.

use std::collections::HashMap;

use tca_core::{ts_to_second, InstrumentId, QuoteSnapshot, QuoteTick, TimestampUs};
use tracing::{debug, info};

/// Venue strings are interned so lookups never allocate.
type VenueId = u32;

/// Composite key of a snapshot.
type SnapshotKey = (TimestampUs, InstrumentId, VenueId);

/// Statistics gathered while building an index.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStats {
    /// Ticks offered to the builder.
    pub ticks_seen: u64,
    /// Ticks dropped because the market was not in continuous trading.
    pub ticks_discarded: u64,
    /// Snapshots in the finished index.
    pub snapshots: usize,
    /// Earliest snapshot second.
    pub first_second: Option<TimestampUs>,
    /// Latest snapshot second.
    pub last_second: Option<TimestampUs>,
}

/// A snapshot that's currently being aggregated.
#[derive(Debug, Clone)]
struct SnapshotInProgress {
    best_bid: f64,
    best_ask: f64,
}

impl SnapshotInProgress {
    fn new() -> Self {
        Self {
            best_bid: f64::NEG_INFINITY,
            best_ask: f64::INFINITY,
        }
    }

    fn add_tick(&mut self, bid: f64, ask: f64) {
        self.best_bid = self.best_bid.max(bid);
        self.best_ask = self.best_ask.min(ask);
    }
}

/// Builder for a [`SnapshotIndex`] from raw quote ticks.
pub struct SnapshotBuilder {
    /// Snapshots being aggregated, keyed by (second, instrument, venue).
    buckets: HashMap<SnapshotKey, SnapshotInProgress>,
    /// Interned venue names.
    venues: HashMap<String, VenueId>,
    stats: SnapshotStats,
}

impl SnapshotBuilder {
    /// Create a new snapshot builder.
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            venues: HashMap::new(),
            stats: SnapshotStats::default(),
        }
    }

    /// Create a builder sized for roughly `ticks` input ticks.
    pub fn with_capacity(ticks: usize) -> Self {
        Self {
            buckets: HashMap::with_capacity(ticks / 4),
            venues: HashMap::new(),
            stats: SnapshotStats::default(),
        }
    }

    fn intern_venue(&mut self, venue: &str) -> VenueId {
        if let Some(&id) = self.venues.get(venue) {
            return id;
        }
        let id = self.venues.len() as VenueId;
        self.venues.insert(venue.to_string(), id);
        id
    }

    /// Add a quote tick. Ticks outside continuous trading are ignored.
    pub fn add_tick(&mut self, tick: &QuoteTick) {
        self.stats.ticks_seen += 1;
        if !tick.market_state.is_continuous() {
            self.stats.ticks_discarded += 1;
            return;
        }

        let venue_id = self.intern_venue(&tick.venue);
        let key = (ts_to_second(tick.event_time), tick.instrument_id, venue_id);
        self.buckets
            .entry(key)
            .or_insert_with(SnapshotInProgress::new)
            .add_tick(tick.bid_price, tick.ask_price);
    }

    /// Add multiple quote ticks.
    pub fn add_ticks(&mut self, ticks: &[QuoteTick]) {
        for tick in ticks {
            self.add_tick(tick);
        }
    }

    /// Finalize into a read-only index.
    pub fn finish(self) -> SnapshotIndex {
        let mut stats = self.stats;
        let mut names: Vec<&str> = vec![""; self.venues.len()];
        for (name, &id) in &self.venues {
            names[id as usize] = name.as_str();
        }

        let mut snapshots = HashMap::with_capacity(self.buckets.len());
        for ((second, instrument_id, venue_id), agg) in self.buckets {
            stats.first_second = Some(stats.first_second.map_or(second, |s| s.min(second)));
            stats.last_second = Some(stats.last_second.map_or(second, |s| s.max(second)));
            snapshots.insert(
                (second, instrument_id, venue_id),
                QuoteSnapshot {
                    second,
                    instrument_id,
                    venue: names[venue_id as usize].to_string(),
                    best_bid: agg.best_bid,
                    best_ask: agg.best_ask,
                },
            );
        }
        stats.snapshots = snapshots.len();

        debug!(
            ticks_seen = stats.ticks_seen,
            ticks_discarded = stats.ticks_discarded,
            venues = self.venues.len(),
            "snapshot aggregation finished"
        );

        SnapshotIndex {
            snapshots,
            venues: self.venues,
            stats,
        }
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only index of quote snapshots with O(1) keyed lookup.
#[derive(Debug, Clone, Default)]
pub struct SnapshotIndex {
    snapshots: HashMap<SnapshotKey, QuoteSnapshot>,
    venues: HashMap<String, VenueId>,
    stats: SnapshotStats,
}

impl SnapshotIndex {
    /// Build an index from a full tick set.
    pub fn build(ticks: &[QuoteTick]) -> Self {
        let mut builder = SnapshotBuilder::with_capacity(ticks.len());
        builder.add_ticks(ticks);
        let index = builder.finish();

        let stats = index.stats();
        info!(
            ticks = stats.ticks_seen,
            discarded = stats.ticks_discarded,
            snapshots = stats.snapshots,
            "Built quote snapshot index"
        );
        index
    }

    /// Snapshot for a second boundary, instrument and venue.
    ///
    /// `second` must already be truncated to a whole second.
    pub fn lookup(&self, second: TimestampUs, instrument_id: InstrumentId, venue: &str) -> Option<&QuoteSnapshot> {
        let venue_id = *self.venues.get(venue)?;
        self.snapshots.get(&(second, instrument_id, venue_id))
    }

    /// Number of snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Iterate over all snapshots (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &QuoteSnapshot> {
        self.snapshots.values()
    }

    /// Build statistics.
    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }
}
