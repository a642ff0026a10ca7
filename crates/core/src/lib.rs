//! Core types and configuration for the TCA workspace.
//!
//! This crate provides shared types used across all other crates:
//! - Market data and execution types (quote ticks, snapshots, trades)
//! - Matched and scored trade records
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
