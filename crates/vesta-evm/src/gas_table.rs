//! Dynamic gas: memory expansion and state-dependent costs
//!
//! Each opcode with a variable price maps to one [`DynamicGas`] variant.
//! Costs are computed against the stack as it stands before the opcode
//! pops anything; some variants also touch the refund counter.

use crate::context::CallFrame;
use crate::error::{EvmError, EvmResult};
use crate::gas::{call_gas, cost};
use crate::memory::Memory;
use crate::opcode::Opcode;
use crate::stack::Stack;
use crate::state::StateDB;
use crate::word::{as_u64, to_word_size};
use primitive_types::U256;
use vesta_chainspec::Rules;
use vesta_primitives::{Address, H256};

/// Charge for one opcode beyond its constant gas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DynamicCost {
    /// Total to deduct from the frame, `call_gas` included
    pub gas: u64,
    /// Portion forwarded to a sub-call (CALL family only)
    pub call_gas: u64,
}

impl DynamicCost {
    fn plain(gas: u64) -> Self {
        Self { gas, call_gas: 0 }
    }
}

/// Dynamic pricing rule of an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicGas {
    /// Memory expansion only
    PureMemory,
    /// Memory expansion plus 3 per copied word; length at stack `size_pos`
    MemoryCopier {
        /// Stack position of the copy length
        size_pos: usize,
    },
    /// KECCAK256: memory plus 6 per hashed word
    Keccak256,
    /// LOGn
    Log {
        /// Topic count
        topics: u64,
    },
    /// CREATE2: memory plus 6 per hashed init-code word
    Create2,
    /// EXP: per-byte exponent charge
    Exp,
    /// SSTORE net metering
    SStore,
    /// CALL
    Call,
    /// CALLCODE
    CallCode,
    /// DELEGATECALL
    DelegateCall,
    /// STATICCALL
    StaticCall,
    /// SELFDESTRUCT
    SelfDestruct,
}

impl DynamicGas {
    /// Rule for `op`, or `None` if it only has constant gas
    pub fn for_opcode(op: Opcode) -> Option<Self> {
        use Opcode::*;
        let rule = match op {
            MLOAD | MSTORE | MSTORE8 | RETURN | REVERT | CREATE => Self::PureMemory,
            CALLDATACOPY | CODECOPY | RETURNDATACOPY => Self::MemoryCopier { size_pos: 2 },
            EXTCODECOPY => Self::MemoryCopier { size_pos: 3 },
            KECCAK256 => Self::Keccak256,
            CREATE2 => Self::Create2,
            EXP => Self::Exp,
            SSTORE => Self::SStore,
            CALL => Self::Call,
            CALLCODE => Self::CallCode,
            DELEGATECALL => Self::DelegateCall,
            STATICCALL => Self::StaticCall,
            SELFDESTRUCT => Self::SelfDestruct,
            _ if op.is_log() => Self::Log { topics: op.log_topics() as u64 },
            _ => return None,
        };
        Some(rule)
    }

    /// Price the opcode about to run in `frame`.
    ///
    /// `memory_size` is the word-aligned size the opcode needs.
    pub fn cost(
        self,
        rules: &Rules,
        state: &mut dyn StateDB,
        frame: &CallFrame,
        stack: &Stack,
        memory: &mut Memory,
        memory_size: u64,
    ) -> EvmResult<DynamicCost> {
        let gas = match self {
            Self::PureMemory => memory.cost(memory_size)?,
            Self::MemoryCopier { size_pos } => {
                let words = word_count(stack.back(size_pos)?)?;
                let copy = words.checked_mul(cost::COPY).ok_or(EvmError::GasUintOverflow)?;
                safe_add(memory.cost(memory_size)?, copy)?
            }
            Self::Keccak256 => {
                let words = word_count(stack.back(1)?)?;
                let hash = words.checked_mul(cost::KECCAK256_WORD).ok_or(EvmError::GasUintOverflow)?;
                safe_add(memory.cost(memory_size)?, hash)?
            }
            Self::Create2 => {
                let words = word_count(stack.back(2)?)?;
                let hash = words.checked_mul(cost::KECCAK256_WORD).ok_or(EvmError::GasUintOverflow)?;
                safe_add(memory.cost(memory_size)?, hash)?
            }
            Self::Log { topics } => log_gas(stack, memory, memory_size, topics)?,
            Self::Exp => exp_gas(rules, stack)?,
            Self::SStore => sstore_gas(rules, state, frame, stack)?,
            Self::SelfDestruct => selfdestruct_gas(rules, state, frame, stack)?,
            Self::Call | Self::CallCode | Self::DelegateCall | Self::StaticCall => {
                return self.call_cost(rules, state, frame, stack, memory, memory_size);
            }
        };
        Ok(DynamicCost::plain(gas))
    }

    fn call_cost(
        self,
        rules: &Rules,
        state: &dyn StateDB,
        frame: &CallFrame,
        stack: &Stack,
        memory: &mut Memory,
        memory_size: u64,
    ) -> EvmResult<DynamicCost> {
        let mut gas = 0u64;
        match self {
            Self::Call => {
                let target = Address::from_word(*stack.back(1)?);
                if !state.exist(&target) {
                    gas += cost::CALL_NEW_ACCOUNT;
                }
                if !stack.back(2)?.is_zero() {
                    gas += cost::CALL_VALUE_TRANSFER;
                }
            }
            Self::CallCode => {
                if !stack.back(2)?.is_zero() {
                    gas += cost::CALL_VALUE_TRANSFER;
                }
            }
            _ => {}
        }
        gas = safe_add(gas, memory.cost(memory_size)?)?;

        let forwarded = call_gas(rules.is_eip150, frame.gas, gas, *stack.back(0)?)?;
        Ok(DynamicCost {
            gas: safe_add(gas, forwarded)?,
            call_gas: forwarded,
        })
    }
}

fn safe_add(a: u64, b: u64) -> EvmResult<u64> {
    a.checked_add(b).ok_or(EvmError::GasUintOverflow)
}

fn word_count(size: &U256) -> EvmResult<u64> {
    as_u64(size).map(to_word_size).ok_or(EvmError::GasUintOverflow)
}

fn log_gas(stack: &Stack, memory: &mut Memory, memory_size: u64, topics: u64) -> EvmResult<u64> {
    let data_size = as_u64(stack.back(1)?).ok_or(EvmError::GasUintOverflow)?;
    let mut gas = safe_add(memory.cost(memory_size)?, cost::LOG)?;
    gas = safe_add(gas, topics * cost::LOG_TOPIC)?;
    let data = data_size.checked_mul(cost::LOG_DATA).ok_or(EvmError::GasUintOverflow)?;
    safe_add(gas, data)
}

fn exp_gas(rules: &Rules, stack: &Stack) -> EvmResult<u64> {
    let exponent_bytes = (stack.back(1)?.bits() as u64 + 7) / 8;
    let per_byte = if rules.is_eip150 {
        cost::EXP_BYTE_EIP158
    } else {
        cost::EXP_BYTE_FRONTIER
    };
    safe_add(exponent_bytes * per_byte, cost::EXP)
}

/// Prices and refunds of one net-metering SSTORE variant
struct SstoreSchedule {
    noop: u64,
    init: u64,
    clean: u64,
    dirty: u64,
    clear_refund: u64,
    reset_refund: u64,
    reset_clear_refund: u64,
}

/// EIP-1283
const NET_SSTORE: SstoreSchedule = SstoreSchedule {
    noop: cost::NET_SSTORE_NOOP,
    init: cost::NET_SSTORE_INIT,
    clean: cost::NET_SSTORE_CLEAN,
    dirty: cost::NET_SSTORE_DIRTY,
    clear_refund: cost::NET_SSTORE_CLEAR_REFUND,
    reset_refund: cost::NET_SSTORE_RESET_REFUND,
    reset_clear_refund: cost::NET_SSTORE_RESET_CLEAR_REFUND,
};

/// EIP-2200
const SSTORE_EIP2200: SstoreSchedule = SstoreSchedule {
    noop: cost::SLOAD_EIP2200,
    init: cost::SSTORE_SET_EIP2200,
    clean: cost::SSTORE_RESET_EIP2200,
    dirty: cost::SLOAD_EIP2200,
    clear_refund: cost::SSTORE_CLEARS_SCHEDULE_REFUND_EIP2200,
    reset_refund: cost::SSTORE_RESET_EIP2200 - cost::SLOAD_EIP2200,
    reset_clear_refund: cost::SSTORE_SET_EIP2200 - cost::SLOAD_EIP2200,
};

fn sstore_gas(
    rules: &Rules,
    state: &mut dyn StateDB,
    frame: &CallFrame,
    stack: &Stack,
) -> EvmResult<u64> {
    let schedule = if rules.is_london {
        if frame.gas <= cost::SSTORE_SENTRY_EIP2200 {
            return Err(EvmError::ReentrancySentry);
        }
        &SSTORE_EIP2200
    } else {
        &NET_SSTORE
    };

    let key = H256::from_word(*stack.back(0)?);
    let value = H256::from_word(*stack.back(1)?);
    let current = state.get_state(&frame.address, &key);
    if current == value {
        return Ok(schedule.noop);
    }

    let original = state.get_committed_state(&frame.address, &key);
    if original == current {
        if original.is_zero() {
            return Ok(schedule.init);
        }
        if value.is_zero() {
            state.add_refund(schedule.clear_refund);
        }
        return Ok(schedule.clean);
    }

    if !original.is_zero() {
        if current.is_zero() {
            state.sub_refund(schedule.clear_refund);
        } else if value.is_zero() {
            state.add_refund(schedule.clear_refund);
        }
    }
    if original == value {
        if original.is_zero() {
            state.add_refund(schedule.reset_clear_refund);
        } else {
            state.add_refund(schedule.reset_refund);
        }
    }
    Ok(schedule.dirty)
}

fn selfdestruct_gas(
    rules: &Rules,
    state: &mut dyn StateDB,
    frame: &CallFrame,
    stack: &Stack,
) -> EvmResult<u64> {
    let mut gas = 0;
    if rules.is_eip150 {
        gas = cost::SELFDESTRUCT_EIP150;
        let beneficiary = Address::from_word(*stack.back(0)?);
        if !state.exist(&beneficiary) {
            gas += cost::CREATE_BY_SELFDESTRUCT;
        }
    }
    if !state.has_suicided(&frame.address) {
        state.add_refund(cost::SELFDESTRUCT_REFUND);
    }
    Ok(gas)
}

fn mem_region(offset: &U256, length: &U256) -> EvmResult<u64> {
    if length.is_zero() {
        return Ok(0);
    }
    let offset = as_u64(offset).ok_or(EvmError::GasUintOverflow)?;
    let length = as_u64(length).ok_or(EvmError::GasUintOverflow)?;
    safe_add(offset, length)
}

/// Highest memory byte `op` touches, before word alignment.
///
/// `None` for opcodes that never touch memory.
pub fn memory_size(op: Opcode, stack: &Stack) -> EvmResult<Option<u64>> {
    use Opcode::*;
    let size = match op {
        KECCAK256 | RETURN | REVERT => mem_region(stack.back(0)?, stack.back(1)?)?,
        CALLDATACOPY | CODECOPY | RETURNDATACOPY => mem_region(stack.back(0)?, stack.back(2)?)?,
        EXTCODECOPY => mem_region(stack.back(1)?, stack.back(3)?)?,
        MLOAD | MSTORE => mem_region(stack.back(0)?, &U256::from(32))?,
        MSTORE8 => mem_region(stack.back(0)?, &U256::one())?,
        CREATE | CREATE2 => mem_region(stack.back(1)?, stack.back(2)?)?,
        CALL | CALLCODE => {
            let args = mem_region(stack.back(3)?, stack.back(4)?)?;
            let ret = mem_region(stack.back(5)?, stack.back(6)?)?;
            args.max(ret)
        }
        DELEGATECALL | STATICCALL => {
            let args = mem_region(stack.back(2)?, stack.back(3)?)?;
            let ret = mem_region(stack.back(4)?, stack.back(5)?)?;
            args.max(ret)
        }
        _ if op.is_log() => mem_region(stack.back(0)?, stack.back(1)?)?,
        _ => return Ok(None),
    };
    Ok(Some(size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_state::MemoryState;
    use bytes::Bytes;

    fn rules(eip150: bool, london: bool) -> Rules {
        Rules {
            chain_id: 1,
            is_homestead: true,
            is_eip150: eip150,
            is_london: london,
            is_merge: false,
        }
    }

    fn contract() -> Address {
        Address::from_bytes([0xcc; 20])
    }

    fn frame(gas: u64) -> CallFrame {
        CallFrame::new(Address::ZERO, contract(), U256::zero(), gas)
    }

    /// Stack with `items` listed top first
    fn stack(items: &[u64]) -> Stack {
        let mut stack = Stack::new();
        for item in items.iter().rev() {
            stack.push(U256::from(*item)).unwrap();
        }
        stack
    }

    fn slot(v: u64) -> H256 {
        H256::from_word(U256::from(v))
    }

    /// State where slot 1 was committed as `original` and now holds `current`
    fn storage_state(original: u64, current: u64) -> MemoryState {
        let mut state = MemoryState::new();
        state.set_state(&contract(), slot(1), slot(original));
        state.finalise();
        state.set_state(&contract(), slot(1), slot(current));
        state
    }

    fn sstore(rules: &Rules, state: &mut MemoryState, gas: u64, value: u64) -> EvmResult<u64> {
        let stack = stack(&[1, value]);
        let mut memory = Memory::new();
        DynamicGas::SStore
            .cost(rules, state, &frame(gas), &stack, &mut memory, 0)
            .map(|c| c.gas)
    }

    // ==================== Memory sizes ====================

    #[test]
    fn test_memory_size_positions() {
        let s = stack(&[10, 20, 30, 40]);
        assert_eq!(memory_size(Opcode::MLOAD, &s).unwrap(), Some(42));
        assert_eq!(memory_size(Opcode::MSTORE8, &s).unwrap(), Some(11));
        assert_eq!(memory_size(Opcode::KECCAK256, &s).unwrap(), Some(30));
        assert_eq!(memory_size(Opcode::CALLDATACOPY, &s).unwrap(), Some(40));
        assert_eq!(memory_size(Opcode::EXTCODECOPY, &s).unwrap(), Some(60));
        assert_eq!(memory_size(Opcode::CREATE, &s).unwrap(), Some(50));
        assert_eq!(memory_size(Opcode::ADD, &s).unwrap(), None);
    }

    #[test]
    fn test_memory_size_zero_length_ignores_offset() {
        let mut s = Stack::new();
        s.push(U256::zero()).unwrap();
        s.push(U256::MAX).unwrap();
        assert_eq!(memory_size(Opcode::RETURN, &s).unwrap(), Some(0));
    }

    #[test]
    fn test_memory_size_overflow() {
        let mut s = Stack::new();
        s.push(U256::one()).unwrap();
        s.push(U256::from(u64::MAX)).unwrap();
        assert_eq!(memory_size(Opcode::RETURN, &s), Err(EvmError::GasUintOverflow));
    }

    #[test]
    fn test_memory_size_call_takes_larger_region() {
        // gas, addr, value, in_off, in_len, out_off, out_len
        let s = stack(&[0, 0, 0, 0, 64, 100, 32]);
        assert_eq!(memory_size(Opcode::CALL, &s).unwrap(), Some(132));
        // gas, addr, in_off, in_len, out_off, out_len
        let s = stack(&[0, 0, 200, 10, 0, 0]);
        assert_eq!(memory_size(Opcode::STATICCALL, &s).unwrap(), Some(210));
    }

    // ==================== Simple formulas ====================

    #[test]
    fn test_copier_gas() {
        let r = rules(true, true);
        let mut state = MemoryState::new();
        let mut memory = Memory::new();
        // mem_off 0, data_off 0, len 33
        let s = stack(&[0, 0, 33]);
        let c = DynamicGas::MemoryCopier { size_pos: 2 }
            .cost(&r, &mut state, &frame(1000), &s, &mut memory, 64)
            .unwrap();
        // 2 words of memory (6) + 2 words copied (6)
        assert_eq!(c, DynamicCost { gas: 12, call_gas: 0 });
    }

    #[test]
    fn test_log_gas() {
        let r = rules(true, true);
        let mut state = MemoryState::new();
        let mut memory = Memory::new();
        let s = stack(&[0, 10, 1, 2]);
        let c = DynamicGas::Log { topics: 2 }
            .cost(&r, &mut state, &frame(10_000), &s, &mut memory, 32)
            .unwrap();
        assert_eq!(c.gas, 3 + 375 + 2 * 375 + 10 * 8);
    }

    #[test]
    fn test_exp_gas_by_fork() {
        let mut state = MemoryState::new();
        let mut memory = Memory::new();
        // base 2, exponent 0x1ff (2 bytes)
        let s = stack(&[2, 0x1ff]);
        let old = DynamicGas::Exp
            .cost(&rules(false, false), &mut state, &frame(0), &s, &mut memory, 0)
            .unwrap();
        let new = DynamicGas::Exp
            .cost(&rules(true, false), &mut state, &frame(0), &s, &mut memory, 0)
            .unwrap();
        assert_eq!(old.gas, 10 + 2 * 10);
        assert_eq!(new.gas, 10 + 2 * 50);

        let zero = stack(&[2, 0]);
        let c = DynamicGas::Exp
            .cost(&rules(true, false), &mut state, &frame(0), &zero, &mut memory, 0)
            .unwrap();
        assert_eq!(c.gas, 10);
    }

    // ==================== SSTORE (EIP-1283) ====================

    #[test]
    fn test_net_sstore_noop() {
        let mut state = storage_state(5, 5);
        assert_eq!(sstore(&rules(true, false), &mut state, 100_000, 5).unwrap(), 200);
        assert_eq!(state.get_refund(), 0);
    }

    #[test]
    fn test_net_sstore_init() {
        let mut state = storage_state(0, 0);
        assert_eq!(sstore(&rules(true, false), &mut state, 100_000, 1).unwrap(), 20000);
        assert_eq!(state.get_refund(), 0);
    }

    #[test]
    fn test_net_sstore_clean_clear() {
        let mut state = storage_state(5, 5);
        assert_eq!(sstore(&rules(true, false), &mut state, 100_000, 0).unwrap(), 5000);
        assert_eq!(state.get_refund(), 15000);
    }

    #[test]
    fn test_net_sstore_dirty_recreate() {
        // original 5, cleared earlier in the transaction, now set again
        let mut state = storage_state(5, 0);
        state.add_refund(15000);
        assert_eq!(sstore(&rules(true, false), &mut state, 100_000, 7).unwrap(), 200);
        assert_eq!(state.get_refund(), 0);
    }

    #[test]
    fn test_net_sstore_dirty_reset_to_original() {
        let mut state = storage_state(5, 6);
        assert_eq!(sstore(&rules(true, false), &mut state, 100_000, 5).unwrap(), 200);
        assert_eq!(state.get_refund(), 4800);
    }

    #[test]
    fn test_net_sstore_dirty_reset_to_zero_original() {
        let mut state = storage_state(0, 6);
        assert_eq!(sstore(&rules(true, false), &mut state, 100_000, 0).unwrap(), 200);
        assert_eq!(state.get_refund(), 19800);
    }

    // ==================== SSTORE (EIP-2200) ====================

    #[test]
    fn test_sstore_sentry() {
        let mut state = storage_state(0, 0);
        assert_eq!(
            sstore(&rules(true, true), &mut state, 2300, 1),
            Err(EvmError::ReentrancySentry)
        );
        assert_eq!(sstore(&rules(true, true), &mut state, 2301, 1).unwrap(), 20000);
    }

    #[test]
    fn test_sstore_eip2200_prices() {
        let r = rules(true, true);
        assert_eq!(sstore(&r, &mut storage_state(5, 5), 10_000, 5).unwrap(), 800);

        let mut state = storage_state(5, 5);
        assert_eq!(sstore(&r, &mut state, 10_000, 0).unwrap(), 5000);
        assert_eq!(state.get_refund(), 15000);

        let mut state = storage_state(5, 6);
        assert_eq!(sstore(&r, &mut state, 10_000, 5).unwrap(), 800);
        assert_eq!(state.get_refund(), 4200);

        let mut state = storage_state(0, 6);
        assert_eq!(sstore(&r, &mut state, 10_000, 0).unwrap(), 800);
        assert_eq!(state.get_refund(), 19200);
    }

    // ==================== Calls ====================

    #[test]
    fn test_call_new_account_and_value() {
        let r = rules(true, true);
        let mut state = MemoryState::new();
        let mut memory = Memory::new();
        // gas 1000, target 0xaa (missing), value 1, no memory
        let s = stack(&[1000, 0xaa, 1, 0, 0, 0, 0]);
        let c = DynamicGas::Call
            .cost(&r, &mut state, &frame(100_000), &s, &mut memory, 0)
            .unwrap();
        assert_eq!(c.call_gas, 1000);
        assert_eq!(c.gas, 25000 + 9000 + 1000);
    }

    #[test]
    fn test_call_existing_account_no_value() {
        let r = rules(true, true);
        let mut state = MemoryState::new();
        state.set_code(&Address::from_word(U256::from(0xaa)), Bytes::from_static(&[0x00]));
        let mut memory = Memory::new();
        let s = stack(&[1000, 0xaa, 0, 0, 0, 0, 0]);
        let c = DynamicGas::Call
            .cost(&r, &mut state, &frame(100_000), &s, &mut memory, 0)
            .unwrap();
        assert_eq!(c.gas, 1000);
    }

    #[test]
    fn test_call_gas_capped_after_surcharges() {
        let r = rules(true, true);
        let mut state = MemoryState::new();
        let mut memory = Memory::new();
        // CALLCODE with value: 9000 surcharge, 6400 left for the callee cap
        let s = stack(&[u64::MAX, 0xaa, 1, 0, 0, 0, 0]);
        let c = DynamicGas::CallCode
            .cost(&r, &mut state, &frame(15_400), &s, &mut memory, 0)
            .unwrap();
        assert_eq!(c.call_gas, 6300);
        assert_eq!(c.gas, 9000 + 6300);
    }

    #[test]
    fn test_delegatecall_memory_only() {
        let r = rules(true, true);
        let mut state = MemoryState::new();
        let mut memory = Memory::new();
        let s = stack(&[500, 0xaa, 0, 32, 0, 0]);
        let c = DynamicGas::DelegateCall
            .cost(&r, &mut state, &frame(100_000), &s, &mut memory, 32)
            .unwrap();
        assert_eq!(c, DynamicCost { gas: 3 + 500, call_gas: 500 });
    }

    // ==================== Selfdestruct ====================

    #[test]
    fn test_selfdestruct_pricing() {
        let mut memory = Memory::new();
        let s = stack(&[0xbb]);

        let mut state = MemoryState::new();
        state.add_balance(&contract(), U256::one());
        let c = DynamicGas::SelfDestruct
            .cost(&rules(false, false), &mut state, &frame(0), &s, &mut memory, 0)
            .unwrap();
        assert_eq!(c.gas, 0);

        let c = DynamicGas::SelfDestruct
            .cost(&rules(true, false), &mut state, &frame(0), &s, &mut memory, 0)
            .unwrap();
        assert_eq!(c.gas, 5000 + 25000);

        state.add_balance(&Address::from_word(U256::from(0xbb)), U256::one());
        let c = DynamicGas::SelfDestruct
            .cost(&rules(true, false), &mut state, &frame(0), &s, &mut memory, 0)
            .unwrap();
        assert_eq!(c.gas, 5000);
    }

    #[test]
    fn test_selfdestruct_refund_once() {
        let r = rules(true, true);
        let mut memory = Memory::new();
        let s = stack(&[0xbb]);
        let mut state = MemoryState::new();
        state.add_balance(&contract(), U256::one());

        DynamicGas::SelfDestruct
            .cost(&r, &mut state, &frame(0), &s, &mut memory, 0)
            .unwrap();
        assert_eq!(state.get_refund(), 24000);

        state.suicide(&contract());
        DynamicGas::SelfDestruct
            .cost(&r, &mut state, &frame(0), &s, &mut memory, 0)
            .unwrap();
        assert_eq!(state.get_refund(), 24000);
    }
}
