//! Error handling and processing statistics.
//!
//! This module provides:
//! - Error type definitions for initialization, storage, scanning and configuration
//! - Failure categories for probe and policy outcomes
//! - Processing statistics tracking (failures and info metrics)

mod stats;
mod types;

// Re-export public API
pub use stats::ProcessingStats;
pub use types::{
    ConfigError, DnsError, FailureType, InfoType, InitializationError, ScanError, StoreError,
};
