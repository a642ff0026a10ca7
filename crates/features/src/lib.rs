//! Quote matching and execution-quality metrics for the TCA workspace.
//!
//! This crate handles:
//! - Trade-to-quote matching at -1s / 0s / +1s
//! - Slippage scoring against the 0s quote
//! - Parallel, order-preserving scoring of a trade batch
//! - Run-level slippage statistics

pub mod engine;
pub mod matcher;
pub mod slippage;
pub mod summary;

pub use engine::TcaEngine;
pub use matcher::QuoteMatcher;
pub use slippage::{score, slippage};
pub use summary::SlippageSummary;
