//! Execution context for EVM

use crate::opcode::Opcode;
use bytes::Bytes;
use primitive_types::U256;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use vesta_primitives::{Address, H256};

/// Block hash lookup by number
pub type GetHashFn = Arc<dyn Fn(u64) -> H256 + Send + Sync>;

/// Block environment information
#[derive(Clone)]
pub struct BlockContext {
    /// Block coinbase (miner/validator)
    pub coinbase: Address,
    /// Block number
    pub number: u64,
    /// Block timestamp
    pub time: u64,
    /// Block difficulty
    pub difficulty: U256,
    /// Beacon randomness, present once the chain has merged
    pub random: Option<H256>,
    /// Block gas limit
    pub gas_limit: u64,
    /// Base fee (EIP-1559)
    pub base_fee: U256,
    /// Hash of an ancestor block
    pub get_hash: GetHashFn,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            coinbase: Address::ZERO,
            number: 0,
            time: 0,
            difficulty: U256::zero(),
            random: None,
            gas_limit: 30_000_000,
            base_fee: U256::zero(),
            get_hash: Arc::new(|_| H256::ZERO),
        }
    }
}

impl fmt::Debug for BlockContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockContext")
            .field("coinbase", &self.coinbase)
            .field("number", &self.number)
            .field("time", &self.time)
            .field("difficulty", &self.difficulty)
            .field("random", &self.random)
            .field("gas_limit", &self.gas_limit)
            .field("base_fee", &self.base_fee)
            .finish_non_exhaustive()
    }
}

/// Transaction environment information
#[derive(Clone, Debug, Default)]
pub struct TxContext {
    /// Transaction origin (original sender)
    pub origin: Address,
    /// Gas price
    pub gas_price: U256,
}

/// One executing frame: the code, who runs it, and the gas it holds.
#[derive(Clone, Debug)]
pub struct CallFrame {
    /// Account that initiated this frame
    pub caller: Address,
    /// Account whose storage and balance the code acts on
    pub address: Address,
    /// Account the code was loaded from
    pub code_address: Address,
    /// Bytecode being executed
    pub code: Bytes,
    /// Hash of `code`
    pub code_hash: H256,
    /// Call data
    pub input: Bytes,
    /// Call value in wei
    pub value: U256,
    /// Gas remaining
    pub gas: u64,
    jump_dests: HashSet<usize>,
}

impl CallFrame {
    /// Frame with no code yet
    pub fn new(caller: Address, address: Address, value: U256, gas: u64) -> Self {
        Self {
            caller,
            address,
            code_address: address,
            code: Bytes::new(),
            code_hash: H256::ZERO,
            input: Bytes::new(),
            value,
            gas,
            jump_dests: HashSet::new(),
        }
    }

    /// Attach the code to run
    pub fn with_code(mut self, code_address: Address, code_hash: H256, code: Bytes) -> Self {
        self.jump_dests = analyze_jump_dests(&code);
        self.code_address = code_address;
        self.code_hash = code_hash;
        self.code = code;
        self
    }

    /// Attach call data
    pub fn with_input(mut self, input: Bytes) -> Self {
        self.input = input;
        self
    }

    /// Take `amount` gas, or leave the frame untouched if it holds less
    pub fn use_gas(&mut self, amount: u64) -> bool {
        if self.gas < amount {
            return false;
        }
        self.gas -= amount;
        true
    }

    /// Give back gas unused by a sub-call
    pub fn refund_gas(&mut self, amount: u64) {
        self.gas += amount;
    }

    /// Whether `dest` is a JUMPDEST outside PUSH data
    pub fn is_valid_jump(&self, dest: &U256) -> bool {
        if dest.bits() > 64 {
            return false;
        }
        self.jump_dests.contains(&(dest.low_u64() as usize))
    }
}

/// Analyze bytecode for valid jump destinations
fn analyze_jump_dests(code: &[u8]) -> HashSet<usize> {
    let mut dests = HashSet::new();
    let mut i = 0;

    while i < code.len() {
        let byte = code[i];
        if byte == Opcode::JUMPDEST as u8 {
            dests.insert(i);
        }
        // Skip PUSH operands
        if let Some(op) = Opcode::from_byte(byte) {
            i += op.push_size();
        }
        i += 1;
    }

    dests
}
