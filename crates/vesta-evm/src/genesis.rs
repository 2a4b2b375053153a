//! Genesis allocation loading

use crate::memory_state::{Account, MemoryState};
use crate::state::StateDB;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use vesta_primitives::{parse_quantity, Address, PrimitiveError, H256};

/// Genesis error types
#[derive(Debug, Error)]
pub enum GenesisError {
    /// Malformed JSON
    #[error("invalid genesis json: {0}")]
    Json(#[from] serde_json::Error),
    /// Malformed address, balance or storage entry
    #[error("invalid genesis value: {0}")]
    Value(#[from] PrimitiveError),
    /// Code is not hex
    #[error("invalid code for {address}: {reason}")]
    Code {
        /// Account holding the code
        address: String,
        /// Decoder message
        reason: String,
    },
}

/// Genesis account allocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Account balance, hex (`0x` prefixed) or decimal
    #[serde(default)]
    pub balance: String,
    /// Account nonce
    #[serde(default)]
    pub nonce: u64,
    /// Contract code (hex string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Storage (slot -> value mapping)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub storage: HashMap<String, String>,
}

/// Address (hex) to allocation
pub type GenesisAlloc = BTreeMap<String, GenesisAccount>;

impl GenesisAccount {
    fn code_bytes(&self, address: &str) -> Result<Bytes, GenesisError> {
        let Some(code) = &self.code else {
            return Ok(Bytes::new());
        };
        let code = code.trim();
        let code = code.strip_prefix("0x").unwrap_or(code);
        hex::decode(code).map(Bytes::from).map_err(|e| GenesisError::Code {
            address: address.to_string(),
            reason: e.to_string(),
        })
    }
}

impl MemoryState {
    /// Build a state holding exactly the given allocation
    pub fn from_genesis(alloc: &GenesisAlloc) -> Result<Self, GenesisError> {
        let mut state = MemoryState::new();
        for (addr_str, genesis) in alloc {
            let address: Address = addr_str.parse().map_err(PrimitiveError::from)?;

            let mut account = Account {
                balance: parse_quantity(&genesis.balance)?,
                nonce: genesis.nonce,
                ..Default::default()
            };
            for (key, value) in &genesis.storage {
                let key = H256::from_word(parse_quantity(key)?);
                let value = H256::from_word(parse_quantity(value)?);
                if !value.is_zero() {
                    account.committed_storage.insert(key, value);
                }
            }

            tracing::debug!(
                "Genesis allocation: {} balance={}, nonce={}",
                addr_str,
                account.balance,
                account.nonce
            );
            state.insert_account(address, account);

            let code = genesis.code_bytes(addr_str)?;
            if !code.is_empty() {
                state.set_code(&address, code);
            }
        }
        tracing::info!("Loaded genesis allocation with {} accounts", state.len());
        Ok(state)
    }

    /// Parse a JSON object of allocations and build a state from it
    pub fn from_genesis_json(json: &str) -> Result<Self, GenesisError> {
        let alloc: GenesisAlloc = serde_json::from_str(json)?;
        Self::from_genesis(&alloc)
    }
}
