//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, defaults)
//! - The library [`Config`] struct and its validation
//! - CLI option types and parsing

mod cli;
mod constants;
mod types;

// Re-export all constants
pub use cli::{Cli, Command, GlobalArgs, OutputFormat};
pub use constants::*;
pub use types::{pool_size_or_default, Config, LogFormat, LogLevel};
