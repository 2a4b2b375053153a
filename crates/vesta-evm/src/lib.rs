//! # vesta-evm
//!
//! Fork-aware EVM execution engine.
//!
//! This crate provides:
//! - Bytecode interpreter with stack, memory and per-fork gas schedule
//! - Call engine (CALL, CALLCODE, DELEGATECALL, STATICCALL, CREATE, CREATE2)
//!   with snapshot/revert semantics
//! - [`StateDB`] world-state trait and the in-memory [`MemoryState`]
//! - Genesis allocation loading
//! - [`runtime`] helpers for running code in a default environment

#![warn(missing_docs)]
#![warn(clippy::all)]

mod context;
mod error;
mod evm;
mod gas;
mod gas_table;
mod genesis;
mod interpreter;
mod memory;
mod memory_state;
mod opcode;
mod stack;
mod state;
pub mod runtime;
pub mod word;

pub use context::{BlockContext, CallFrame, GetHashFn, TxContext};
pub use error::{EvmError, EvmResult};
pub use evm::{
    can_transfer, create2_address, create_address, transfer, CallOutcome, CreateOutcome, Evm,
};
pub use gas::{call_gas, constant_gas, cost};
pub use gas_table::{memory_size, DynamicCost, DynamicGas};
pub use genesis::{GenesisAccount, GenesisAlloc, GenesisError};
pub use interpreter::{FrameState, Interpreter};
pub use memory::{Memory, MAX_MEMORY_SIZE};
pub use memory_state::{Account, MemoryState};
pub use opcode::Opcode;
pub use stack::Stack;
pub use state::{Log, StateDB};
