//! Main application helpers.
//!
//! This module provides statistics printing and result summaries used by the
//! command-line entry points.

pub mod statistics;

// Re-export public API
pub use statistics::{log_domain_result, print_failure_statistics, print_scan_summary};
