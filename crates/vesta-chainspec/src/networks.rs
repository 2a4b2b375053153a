//! Named network configurations
//!
//! Immutable values; pass them (or a copy) to whatever needs fork awareness.

use crate::config::{ChainConfig, CliqueConfig, EthashConfig};

const HOMESTEAD_BLOCK: u64 = 1_150_000;
const EIP150_BLOCK: u64 = 2_463_000;
const LONDON_BLOCK: u64 = 12_965_000;

/// Proof-of-work network (chain id 1)
pub const ETHASH_CHAIN_CONFIG: ChainConfig = ChainConfig {
    chain_id: 1,
    homestead_block: Some(HOMESTEAD_BLOCK),
    eip150_block: Some(EIP150_BLOCK),
    london_block: Some(LONDON_BLOCK),
    terminal_total_difficulty: None,
    ethash: Some(EthashConfig {}),
    clique: None,
};

/// Proof-of-authority network (chain id 2)
pub const CLIQUE_CHAIN_CONFIG: ChainConfig = ChainConfig {
    chain_id: 2,
    homestead_block: Some(HOMESTEAD_BLOCK),
    eip150_block: Some(EIP150_BLOCK),
    london_block: Some(LONDON_BLOCK),
    terminal_total_difficulty: None,
    ethash: None,
    clique: Some(CliqueConfig { period: 15, epoch: 30_000 }),
};

/// Delegated proof-of-stake network (chain id 3)
pub const CLAUDE_CHAIN_CONFIG: ChainConfig = ChainConfig {
    chain_id: 3,
    homestead_block: Some(HOMESTEAD_BLOCK),
    eip150_block: Some(EIP150_BLOCK),
    london_block: Some(LONDON_BLOCK),
    terminal_total_difficulty: None,
    ethash: None,
    clique: None,
};

/// The main network runs the proof-of-work configuration
pub const MAINNET_CHAIN_CONFIG: ChainConfig = ETHASH_CHAIN_CONFIG;

/// Human-friendly name for a known chain id
pub fn network_name(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        id if id == MAINNET_CHAIN_CONFIG.chain_id => Some("mainNet"),
        id if id == CLIQUE_CHAIN_CONFIG.chain_id => Some("cliqueNet"),
        id if id == CLAUDE_CHAIN_CONFIG.chain_id => Some("claudeNet"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_configs_are_well_ordered() {
        for cfg in [ETHASH_CHAIN_CONFIG, CLIQUE_CHAIN_CONFIG, CLAUDE_CHAIN_CONFIG] {
            assert!(cfg.check_config_fork_order().is_ok());
        }
    }

    #[test]
    fn test_named_configs_share_schedule() {
        assert_eq!(ETHASH_CHAIN_CONFIG.check_compatible(&CLIQUE_CHAIN_CONFIG, u64::MAX), None);
        assert_eq!(ETHASH_CHAIN_CONFIG.check_compatible(&CLAUDE_CHAIN_CONFIG, u64::MAX), None);
    }

    #[test]
    fn test_mainnet_rules() {
        let rules = MAINNET_CHAIN_CONFIG.rules(2_463_000, false);
        assert!(rules.is_homestead);
        assert!(rules.is_eip150);
        assert!(!rules.is_london);
        assert!(MAINNET_CHAIN_CONFIG.rules(12_965_000, false).is_london);
    }

    #[test]
    fn test_engines() {
        assert_eq!(ETHASH_CHAIN_CONFIG.consensus_engine().as_deref(), Some("ethash"));
        assert_eq!(CLIQUE_CHAIN_CONFIG.consensus_engine().as_deref(), Some("clique"));
        assert_eq!(CLAUDE_CHAIN_CONFIG.consensus_engine(), None);
    }

    #[test]
    fn test_network_names() {
        assert_eq!(network_name(1), Some("mainNet"));
        assert_eq!(network_name(2), Some("cliqueNet"));
        assert_eq!(network_name(3), Some("claudeNet"));
        assert_eq!(network_name(1337), None);
    }
}
