//! Chain configuration and per-block fork rules

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use vesta_primitives::{BlockHeight, U256};

/// Fork activation heights and consensus parameters of one chain.
///
/// Absent heights mean the fork never activates. A config is never mutated
/// after construction; a replacement is compared with
/// [`ChainConfig::check_compatible`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Chain identifier (replay protection, `CHAINID`)
    pub chain_id: u64,

    /// Homestead switch block (0 = already homestead)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homestead_block: Option<BlockHeight>,
    /// EIP-150 gas repricing block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip150_block: Option<BlockHeight>,
    /// London switch block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub london_block: Option<BlockHeight>,

    /// Total difficulty at which the chain leaves proof-of-work
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_total_difficulty: Option<U256>,

    /// Proof-of-work engine parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethash: Option<EthashConfig>,
    /// Proof-of-authority engine parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clique: Option<CliqueConfig>,
}

/// Proof-of-work sealing (no parameters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EthashConfig {}

impl fmt::Display for EthashConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ethash")
    }
}

/// Proof-of-authority sealing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CliqueConfig {
    /// Seconds between blocks
    pub period: u64,
    /// Blocks after which votes reset and a checkpoint is taken
    pub epoch: u64,
}

impl fmt::Display for CliqueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("clique")
    }
}

/// Fork flags in effect for one block.
///
/// Derived once per message from a [`ChainConfig`]; everything that prices
/// or gates an opcode consults this instead of the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rules {
    /// Chain identifier
    pub chain_id: u64,
    /// Homestead active
    pub is_homestead: bool,
    /// EIP-150 active
    pub is_eip150: bool,
    /// London active
    pub is_london: bool,
    /// Past the proof-of-stake transition
    pub is_merge: bool,
}

/// Whether a fork scheduled at `fork` is active at `head`.
pub(crate) fn is_forked(fork: Option<BlockHeight>, head: BlockHeight) -> bool {
    matches!(fork, Some(block) if block <= head)
}

impl ChainConfig {
    /// Whether `number` is at or past the Homestead block
    pub fn is_homestead(&self, number: BlockHeight) -> bool {
        is_forked(self.homestead_block, number)
    }

    /// Whether `number` is at or past the EIP-150 block
    pub fn is_eip150(&self, number: BlockHeight) -> bool {
        is_forked(self.eip150_block, number)
    }

    /// Whether `number` is at or past the London block
    pub fn is_london(&self, number: BlockHeight) -> bool {
        is_forked(self.london_block, number)
    }

    /// Whether a block with total difficulty `total_diff` whose parent had
    /// `parent_total_diff` is the last proof-of-work block.
    pub fn is_terminal_pow_block(&self, parent_total_diff: U256, total_diff: U256) -> bool {
        match self.terminal_total_difficulty {
            Some(ttd) => parent_total_diff < ttd && total_diff >= ttd,
            None => false,
        }
    }

    /// Fork flags at block `number`
    pub fn rules(&self, number: BlockHeight, is_merge: bool) -> Rules {
        Rules {
            chain_id: self.chain_id,
            is_homestead: self.is_homestead(number),
            is_eip150: self.is_eip150(number),
            is_london: self.is_london(number),
            is_merge,
        }
    }

    /// Name of the configured sealing engine, if any
    pub fn consensus_engine(&self) -> Option<String> {
        match (&self.ethash, &self.clique) {
            (Some(ethash), _) => Some(ethash.to_string()),
            (None, Some(clique)) => Some(clique.to_string()),
            (None, None) => None,
        }
    }

    /// Check that forks are not skipped and activate in protocol order.
    pub fn check_config_fork_order(&self) -> Result<(), ConfigError> {
        struct Fork {
            name: &'static str,
            block: Option<BlockHeight>,
            // may be unset while later forks are set
            optional: bool,
        }

        let forks = [
            Fork { name: "homesteadBlock", block: self.homestead_block, optional: false },
            Fork { name: "eip150Block", block: self.eip150_block, optional: false },
            Fork { name: "londonBlock", block: self.london_block, optional: false },
        ];

        let mut last: Option<&Fork> = None;
        for cur in &forks {
            if let Some(prev) = last {
                match (prev.block, cur.block) {
                    (None, Some(block)) => {
                        return Err(ConfigError::MissingFork {
                            prev: prev.name,
                            next: cur.name,
                            next_block: block,
                        });
                    }
                    (Some(prev_block), Some(block)) if prev_block > block => {
                        return Err(ConfigError::OutOfOrder {
                            prev: prev.name,
                            prev_block,
                            next: cur.name,
                            next_block: block,
                        });
                    }
                    _ => {}
                }
            }
            if !cur.optional || cur.block.is_some() {
                last = Some(cur);
            }
        }
        Ok(())
    }
}
