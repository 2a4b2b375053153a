//! Gas cost calculations

use crate::error::{EvmError, EvmResult};
use crate::opcode::Opcode;
use crate::word::as_u64;
use primitive_types::U256;
use vesta_chainspec::Rules;

/// Gas costs and protocol limits
pub mod cost {
    /// Zero gas
    pub const ZERO: u64 = 0;
    /// Base gas
    pub const BASE: u64 = 2;
    /// Very low gas
    pub const VERYLOW: u64 = 3;
    /// Low gas
    pub const LOW: u64 = 5;
    /// Mid gas
    pub const MID: u64 = 8;
    /// High gas
    pub const HIGH: u64 = 10;

    /// Jump dest gas
    pub const JUMPDEST: u64 = 1;
    /// Exp gas
    pub const EXP: u64 = 10;
    /// Exp gas per exponent byte before EIP-150
    pub const EXP_BYTE_FRONTIER: u64 = 10;
    /// Exp gas per exponent byte from EIP-150 on
    pub const EXP_BYTE_EIP158: u64 = 50;
    /// KECCAK256 base gas
    pub const KECCAK256: u64 = 30;
    /// KECCAK256 gas per word
    pub const KECCAK256_WORD: u64 = 6;
    /// Blockhash gas
    pub const BLOCKHASH: u64 = 20;

    /// Memory gas per word
    pub const MEMORY: u64 = 3;
    /// Divisor of the quadratic memory term
    pub const QUAD_COEFF_DIV: u64 = 512;
    /// Copy gas per word
    pub const COPY: u64 = 3;

    /// Balance gas before EIP-150
    pub const BALANCE_FRONTIER: u64 = 20;
    /// Balance gas from EIP-150
    pub const BALANCE_EIP150: u64 = 400;
    /// Balance gas from London (EIP-1884)
    pub const BALANCE_EIP1884: u64 = 700;
    /// EXTCODESIZE / EXTCODECOPY before EIP-150
    pub const EXTCODE_FRONTIER: u64 = 20;
    /// EXTCODESIZE / EXTCODECOPY from EIP-150
    pub const EXTCODE_EIP150: u64 = 700;
    /// EXTCODEHASH before London
    pub const EXTCODEHASH_CONSTANTINOPLE: u64 = 400;
    /// EXTCODEHASH from London (EIP-1884)
    pub const EXTCODEHASH_EIP1884: u64 = 700;

    /// Sload gas before EIP-150
    pub const SLOAD_FRONTIER: u64 = 50;
    /// Sload gas from EIP-150
    pub const SLOAD_EIP150: u64 = 200;
    /// Sload gas from London (EIP-2200)
    pub const SLOAD_EIP2200: u64 = 800;

    /// Net-metered SSTORE: value unchanged
    pub const NET_SSTORE_NOOP: u64 = 200;
    /// Net-metered SSTORE: zero slot set
    pub const NET_SSTORE_INIT: u64 = 20000;
    /// Net-metered SSTORE: clean slot changed
    pub const NET_SSTORE_CLEAN: u64 = 5000;
    /// Net-metered SSTORE: dirty slot changed
    pub const NET_SSTORE_DIRTY: u64 = 200;
    /// Net-metered SSTORE: slot cleared
    pub const NET_SSTORE_CLEAR_REFUND: u64 = 15000;
    /// Net-metered SSTORE: slot reset to original value
    pub const NET_SSTORE_RESET_REFUND: u64 = 4800;
    /// Net-metered SSTORE: slot reset to original zero
    pub const NET_SSTORE_RESET_CLEAR_REFUND: u64 = 19800;

    /// EIP-2200 SSTORE fails when no more than this is left
    pub const SSTORE_SENTRY_EIP2200: u64 = 2300;
    /// EIP-2200 zero slot set
    pub const SSTORE_SET_EIP2200: u64 = 20000;
    /// EIP-2200 clean slot changed
    pub const SSTORE_RESET_EIP2200: u64 = 5000;
    /// EIP-2200 slot cleared
    pub const SSTORE_CLEARS_SCHEDULE_REFUND_EIP2200: u64 = 15000;

    /// Log gas
    pub const LOG: u64 = 375;
    /// Log topic gas
    pub const LOG_TOPIC: u64 = 375;
    /// Log data gas (per byte)
    pub const LOG_DATA: u64 = 8;

    /// Create gas
    pub const CREATE: u64 = 32000;
    /// Create2 gas
    pub const CREATE2: u64 = 32000;
    /// Deployed code gas (per byte)
    pub const CREATE_DATA: u64 = 200;
    /// Call gas before EIP-150
    pub const CALL_FRONTIER: u64 = 40;
    /// Call gas from EIP-150
    pub const CALL_EIP150: u64 = 700;
    /// Call value transfer gas
    pub const CALL_VALUE_TRANSFER: u64 = 9000;
    /// Call new account gas
    pub const CALL_NEW_ACCOUNT: u64 = 25000;
    /// Free gas given to the callee of a value transfer
    pub const CALL_STIPEND: u64 = 2300;

    /// Selfdestruct gas from EIP-150
    pub const SELFDESTRUCT_EIP150: u64 = 5000;
    /// Selfdestruct surcharge for a new beneficiary
    pub const CREATE_BY_SELFDESTRUCT: u64 = 25000;
    /// Selfdestruct refund
    pub const SELFDESTRUCT_REFUND: u64 = 24000;

    /// Max stack size
    pub const STACK_LIMIT: usize = 1024;
    /// Max call depth
    pub const CALL_CREATE_DEPTH: usize = 1024;
    /// Max deployed code size (EIP-170)
    pub const MAX_CODE_SIZE: usize = 24576;
    /// Base fee of the first London block
    pub const INITIAL_BASE_FEE: u64 = 1_000_000_000;
}

/// Fixed gas charged before an opcode runs
pub fn constant_gas(op: Opcode, rules: &Rules) -> u64 {
    use Opcode::*;
    match op {
        STOP | RETURN | REVERT | INVALID => cost::ZERO,

        ADDRESS | ORIGIN | CALLER | CALLVALUE | CALLDATASIZE | CODESIZE | GASPRICE | COINBASE
        | TIMESTAMP | NUMBER | DIFFICULTY | GASLIMIT | CHAINID | RETURNDATASIZE | POP | PC
        | MSIZE | GAS | BASEFEE => cost::BASE,

        ADD | SUB | NOT | LT | GT | SLT | SGT | EQ | ISZERO | AND | OR | XOR | BYTE | SHL
        | SHR | SAR | CALLDATALOAD | MLOAD | MSTORE | MSTORE8 | CALLDATACOPY | CODECOPY
        | RETURNDATACOPY => cost::VERYLOW,

        MUL | DIV | SDIV | MOD | SMOD | SIGNEXTEND | SELFBALANCE => cost::LOW,
        ADDMOD | MULMOD | JUMP => cost::MID,
        JUMPI => cost::HIGH,
        JUMPDEST => cost::JUMPDEST,

        KECCAK256 => cost::KECCAK256,
        BLOCKHASH => cost::BLOCKHASH,
        CREATE => cost::CREATE,
        CREATE2 => cost::CREATE2,

        // fully dynamic
        EXP | SSTORE | SELFDESTRUCT => cost::ZERO,

        BALANCE if rules.is_london => cost::BALANCE_EIP1884,
        BALANCE if rules.is_eip150 => cost::BALANCE_EIP150,
        BALANCE => cost::BALANCE_FRONTIER,

        EXTCODESIZE | EXTCODECOPY if rules.is_eip150 => cost::EXTCODE_EIP150,
        EXTCODESIZE | EXTCODECOPY => cost::EXTCODE_FRONTIER,

        EXTCODEHASH if rules.is_london => cost::EXTCODEHASH_EIP1884,
        EXTCODEHASH => cost::EXTCODEHASH_CONSTANTINOPLE,

        SLOAD if rules.is_london => cost::SLOAD_EIP2200,
        SLOAD if rules.is_eip150 => cost::SLOAD_EIP150,
        SLOAD => cost::SLOAD_FRONTIER,

        CALL | CALLCODE | DELEGATECALL | STATICCALL if rules.is_eip150 => cost::CALL_EIP150,
        CALL | CALLCODE | DELEGATECALL | STATICCALL => cost::CALL_FRONTIER,

        _ if op.is_log() => cost::ZERO,
        // PUSH, DUP and SWAP
        _ => cost::VERYLOW,
    }
}

/// Gas forwarded to a sub-call.
///
/// From EIP-150 the callee gets at most all but one 64th of what is left
/// after `base` is paid; a larger request is silently capped. Before
/// EIP-150 the request is forwarded as is and must fit in u64.
pub fn call_gas(is_eip150: bool, available: u64, base: u64, requested: U256) -> EvmResult<u64> {
    if is_eip150 {
        let available = available.saturating_sub(base);
        let cap = available - available / 64;
        return Ok(match as_u64(&requested) {
            Some(requested) if requested <= cap => requested,
            _ => cap,
        });
    }
    as_u64(&requested).ok_or(EvmError::GasUintOverflow)
}
