//! Data ingestion and normalization for the TCA workspace.
//!
//! This crate handles:
//! - Per-second quote snapshot building (max bid / min ask)
//! - Execution phase filtering
//! - Side inference and reference-data enrichment
//! - Input profiling

pub mod enrichment;
pub mod profile;
pub mod snapshot;

pub use enrichment::{enrich, filter_continuous, EnrichedExecution, EnrichmentStats, ReferenceData};
pub use profile::{ExecutionProfile, QuoteProfile};
pub use snapshot::{SnapshotBuilder, SnapshotIndex, SnapshotStats};
