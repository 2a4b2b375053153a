//! # vesta-chainspec
//!
//! Chain configuration for the Vesta execution engine.
//!
//! This crate provides:
//! - [`ChainConfig`]: fork activation heights, serializable to the JSON chain-config format
//! - [`Rules`]: the fork flags in effect at one block
//! - fork-order validation and the stored/new configuration compatibility check
//! - immutable named network configurations
//! - [`TrustedCheckpoint`]

#![warn(missing_docs)]
#![warn(clippy::all)]

mod checkpoint;
mod compat;
mod config;
mod error;
mod networks;

pub use checkpoint::TrustedCheckpoint;
pub use compat::CompatError;
pub use config::{ChainConfig, CliqueConfig, EthashConfig, Rules};
pub use error::ConfigError;
pub use networks::{
    network_name, CLAUDE_CHAIN_CONFIG, CLIQUE_CHAIN_CONFIG, ETHASH_CHAIN_CONFIG,
    MAINNET_CHAIN_CONFIG,
};
