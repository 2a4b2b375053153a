//! Run code without assembling a block or transaction by hand

use crate::context::{BlockContext, GetHashFn, TxContext};
use crate::evm::{CallOutcome, CreateOutcome, Evm};
use crate::gas::cost::INITIAL_BASE_FEE;
use crate::state::StateDB;
use bytes::Bytes;
use primitive_types::U256;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use vesta_chainspec::ChainConfig;
use vesta_crypto::keccak256;
use vesta_primitives::Address;

/// Environment for [`execute`], [`create`] and [`call`]
#[derive(Clone)]
pub struct Config {
    /// Fork schedule; every fork active from block 0 by default
    pub chain_config: ChainConfig,
    /// Block difficulty
    pub difficulty: U256,
    /// Transaction sender, also the caller of the top frame
    pub origin: Address,
    /// Block coinbase
    pub coinbase: Address,
    /// Block number
    pub block_number: u64,
    /// Block timestamp
    pub time: u64,
    /// Block gas limit, also the gas given to the top frame
    pub gas_limit: u64,
    /// Gas price
    pub gas_price: U256,
    /// Value sent with the top frame
    pub value: U256,
    /// Block base fee
    pub base_fee: U256,
    /// Ancestor hash lookup
    pub get_hash_fn: GetHashFn,
}

impl Default for Config {
    fn default() -> Self {
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            chain_config: ChainConfig {
                chain_id: 1,
                homestead_block: Some(0),
                eip150_block: Some(0),
                london_block: Some(0),
                ..Default::default()
            },
            difficulty: U256::zero(),
            origin: Address::ZERO,
            coinbase: Address::ZERO,
            block_number: 0,
            time,
            gas_limit: u64::MAX,
            gas_price: U256::zero(),
            value: U256::zero(),
            base_fee: U256::from(INITIAL_BASE_FEE),
            get_hash_fn: Arc::new(|n| keccak256(n.to_string().as_bytes())),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("chain_config", &self.chain_config)
            .field("origin", &self.origin)
            .field("block_number", &self.block_number)
            .field("gas_limit", &self.gas_limit)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

/// Build an engine for `cfg` over `state`
pub fn new_env<'a>(cfg: &Config, state: &'a mut dyn StateDB) -> Evm<'a> {
    let block = BlockContext {
        coinbase: cfg.coinbase,
        number: cfg.block_number,
        time: cfg.time,
        difficulty: cfg.difficulty,
        random: None,
        gas_limit: cfg.gas_limit,
        base_fee: cfg.base_fee,
        get_hash: Arc::clone(&cfg.get_hash_fn),
    };
    let tx = TxContext {
        origin: cfg.origin,
        gas_price: cfg.gas_price,
    };
    Evm::new(block, tx, cfg.chain_config.clone(), state)
}

/// Address [`execute`] installs its code at
pub fn contract_address() -> Address {
    Address::from_tail(b"contract")
}

/// Install `code` at [`contract_address`] and call it with `input`
pub fn execute(code: &[u8], input: &[u8], cfg: &Config, state: &mut dyn StateDB) -> CallOutcome {
    let address = contract_address();
    state.create_account(address);
    state.set_code(&address, Bytes::copy_from_slice(code));

    let mut evm = new_env(cfg, state);
    evm.call(cfg.origin, address, Bytes::copy_from_slice(input), cfg.gas_limit, cfg.value)
}

/// Run `input` as init code and deploy the result
pub fn create(input: &[u8], cfg: &Config, state: &mut dyn StateDB) -> CreateOutcome {
    let mut evm = new_env(cfg, state);
    evm.create(cfg.origin, Bytes::copy_from_slice(input), cfg.gas_limit, cfg.value)
}

/// Call the code already deployed at `address`
pub fn call(address: Address, input: &[u8], cfg: &Config, state: &mut dyn StateDB) -> CallOutcome {
    let mut evm = new_env(cfg, state);
    evm.call(cfg.origin, address, Bytes::copy_from_slice(input), cfg.gas_limit, cfg.value)
}
