//! Execution cleaning and reference-data enrichment.
//!
//! Restricts executions to the continuous trading phase, infers the FIX side
//! from the quantity sign and attaches listing id / primary MIC from the
//! instrument reference table. Executions with no listing are kept with empty
//! reference fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tca_core::{Execution, Listing, Side, Trade};
use tracing::{info, warn};

/// Statistics about reference-data enrichment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentStats {
    /// Executions offered for enrichment.
    pub total: usize,
    /// Executions matched to a listing.
    pub enriched: usize,
    /// Executions kept without reference data.
    pub unmatched: usize,
    pub buys: usize,
    pub sells: usize,
}

/// An execution with side and listing attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedExecution {
    pub execution: Execution,
    pub side: Side,
    /// `None` when the ISIN is not in the reference data.
    pub listing: Option<Listing>,
}

impl EnrichedExecution {
    /// Trade keyed on the listing id and primary MIC. Without a listing the
    /// trade has no quote keys.
    pub fn to_trade(&self) -> Trade {
        Trade {
            trade_time: self.execution.trade_time,
            quantity: self.execution.quantity,
            price: self.execution.price,
            instrument_id: self.listing.as_ref().map(|l| l.listing_id),
            venue: self.listing.as_ref().map(|l| l.primary_mic.clone()),
        }
    }
}

/// Keep only executions from the continuous trading phase, in input order.
pub fn filter_continuous(executions: Vec<Execution>) -> Vec<Execution> {
    let total = executions.len();
    let kept: Vec<Execution> = executions
        .into_iter()
        .filter(|e| e.phase.is_continuous())
        .collect();
    info!(
        total,
        kept = kept.len(),
        "Number of CONTINUOUS_TRADING executions: {}",
        kept.len()
    );
    kept
}

/// Instrument reference data keyed by ISIN.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    by_isin: HashMap<String, Listing>,
}

impl ReferenceData {
    /// Index listings by ISIN. On duplicate ISINs the first listing wins.
    pub fn new(listings: Vec<Listing>) -> Self {
        let mut by_isin = HashMap::with_capacity(listings.len());
        let mut duplicates = 0usize;
        for listing in listings {
            if by_isin.contains_key(&listing.isin) {
                duplicates += 1;
                continue;
            }
            by_isin.insert(listing.isin.clone(), listing);
        }
        if duplicates > 0 {
            warn!(duplicates, "Reference data contains duplicate ISINs; keeping the first listing");
        }
        Self { by_isin }
    }

    pub fn get(&self, isin: &str) -> Option<&Listing> {
        self.by_isin.get(isin)
    }

    pub fn len(&self) -> usize {
        self.by_isin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_isin.is_empty()
    }
}

/// Attach side and listing to each execution.
///
/// Every execution is kept, in input order. Those whose ISIN is missing from
/// the reference data get no listing and therefore never match a quote.
pub fn enrich(executions: Vec<Execution>, refdata: &ReferenceData) -> (Vec<EnrichedExecution>, EnrichmentStats) {
    let mut stats = EnrichmentStats {
        total: executions.len(),
        ..Default::default()
    };
    let mut enriched = Vec::with_capacity(executions.len());

    for execution in executions {
        let listing = refdata.get(&execution.isin).cloned();
        if listing.is_some() {
            stats.enriched += 1;
        } else {
            stats.unmatched += 1;
        }
        let side = Side::from_quantity(execution.quantity);
        match side {
            Side::Buy => stats.buys += 1,
            Side::Sell => stats.sells += 1,
        }
        enriched.push(EnrichedExecution {
            execution,
            side,
            listing,
        });
    }

    if stats.unmatched > 0 {
        warn!(
            unmatched = stats.unmatched,
            "Executions without reference data; their listing and quote fields will be empty"
        );
    }
    info!(
        total = stats.total,
        enriched = stats.enriched,
        buys = stats.buys,
        sells = stats.sells,
        "Data transformation and enrichment completed successfully."
    );

    (enriched, stats)
}
