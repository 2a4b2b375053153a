//! Chain configuration errors

use thiserror::Error;

/// Invalid fork schedule in a single configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A later fork is scheduled while an earlier one is not
    #[error("unsupported fork ordering: {prev} not enabled, but {next} enabled at {next_block}")]
    MissingFork {
        /// Earlier fork name
        prev: &'static str,
        /// Later fork name
        next: &'static str,
        /// Height of the later fork
        next_block: u64,
    },

    /// A later fork is scheduled below an earlier one
    #[error("unsupported fork ordering: {prev} enabled at {prev_block}, but {next} enabled at {next_block}")]
    OutOfOrder {
        /// Earlier fork name
        prev: &'static str,
        /// Height of the earlier fork
        prev_block: u64,
        /// Later fork name
        next: &'static str,
        /// Height of the later fork
        next_block: u64,
    },
}
