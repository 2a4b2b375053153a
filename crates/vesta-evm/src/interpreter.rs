//! EVM bytecode interpreter

use crate::context::CallFrame;
use crate::error::{EvmError, EvmResult};
use crate::evm::Evm;
use crate::gas::{constant_gas, cost};
use crate::gas_table::{self, DynamicGas};
use crate::memory::Memory;
use crate::opcode::Opcode;
use crate::stack::Stack;
use crate::state::Log;
use crate::word::{self, as_u64, bool_word, saturating_u64, to_word_size};
use bytes::Bytes;
use primitive_types::U256;
use vesta_crypto::keccak256;
use vesta_primitives::{Address, H256};

/// Lifecycle of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Created, not started
    Ready,
    /// Executing opcodes
    Running,
    /// Finished by STOP, RETURN, SELFDESTRUCT or end of code
    Halted,
    /// Finished by REVERT
    Reverted,
    /// Stopped by an error, all gas consumed
    Faulted,
}

/// Executes the code of one [`CallFrame`].
///
/// Stack, memory and return buffer live and die with the interpreter;
/// sub-calls get a fresh one through [`Evm`].
#[derive(Debug)]
pub struct Interpreter<'f> {
    frame: &'f mut CallFrame,
    pc: usize,
    stack: Stack,
    memory: Memory,
    return_data: Bytes,
    state: FrameState,
}

impl<'f> Interpreter<'f> {
    /// Create an interpreter for `frame`
    pub fn new(frame: &'f mut CallFrame) -> Self {
        Self {
            frame,
            pc: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            return_data: Bytes::new(),
            state: FrameState::Ready,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Program counter
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Operand stack
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Frame memory
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Execute until the frame halts, reverts or faults.
    ///
    /// Gas left is read from the frame afterwards; on revert the error
    /// carries the revert payload.
    pub fn run(&mut self, evm: &mut Evm<'_>) -> EvmResult<Bytes> {
        self.state = FrameState::Running;
        let result = loop {
            match self.step(evm) {
                Ok(Some(output)) => break Ok(output),
                Ok(None) => {}
                Err(err) => break Err(err),
            }
        };

        self.state = match &result {
            Ok(_) => FrameState::Halted,
            Err(err) if err.is_revert() => FrameState::Reverted,
            Err(err) => {
                tracing::trace!(
                    "Frame {} faulted at pc {}: {}",
                    self.frame.address,
                    self.pc,
                    err
                );
                FrameState::Faulted
            }
        };
        result
    }

    /// Execute one opcode, returning the output if the frame halted
    fn step(&mut self, evm: &mut Evm<'_>) -> EvmResult<Option<Bytes>> {
        let byte = self
            .frame
            .code
            .get(self.pc)
            .copied()
            .unwrap_or(Opcode::STOP as u8);
        let op = Opcode::from_byte(byte)
            .filter(|op| op.is_enabled(&evm.rules))
            .ok_or(EvmError::InvalidOpcode(byte))?;

        let (min, max) = op.stack_bounds();
        if self.stack.len() < min {
            return Err(EvmError::StackUnderflow);
        }
        if self.stack.len() > max {
            return Err(EvmError::StackOverflow);
        }
        if evm.read_only && self.writes_state(op)? {
            return Err(EvmError::WriteProtection);
        }

        if !self.frame.use_gas(constant_gas(op, &evm.rules)) {
            return Err(EvmError::OutOfGas);
        }

        let mut call_gas = 0;
        if let Some(dynamic) = DynamicGas::for_opcode(op) {
            let memory_size = match gas_table::memory_size(op, &self.stack)? {
                Some(size) => to_word_size(size)
                    .checked_mul(32)
                    .ok_or(EvmError::GasUintOverflow)?,
                None => 0,
            };
            let charge = dynamic.cost(
                &evm.rules,
                &mut *evm.state,
                &*self.frame,
                &self.stack,
                &mut self.memory,
                memory_size,
            )?;
            if !self.frame.use_gas(charge.gas) {
                return Err(EvmError::OutOfGas);
            }
            call_gas = charge.call_gas;
            if memory_size > 0 {
                self.memory.resize(memory_size as usize);
            }
        }

        self.execute(op, evm, call_gas)
    }

    fn writes_state(&self, op: Opcode) -> EvmResult<bool> {
        Ok(match op {
            Opcode::SSTORE | Opcode::CREATE | Opcode::CREATE2 | Opcode::SELFDESTRUCT => true,
            Opcode::CALL => !self.stack.back(2)?.is_zero(),
            _ => op.is_log(),
        })
    }

    fn unary(&mut self, f: impl FnOnce(U256) -> U256) -> EvmResult<()> {
        let a = self.stack.pop()?;
        self.stack.push(f(a))
    }

    fn binary(&mut self, f: impl FnOnce(U256, U256) -> U256) -> EvmResult<()> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        self.stack.push(f(a, b))
    }

    fn ternary(&mut self, f: impl FnOnce(U256, U256, U256) -> U256) -> EvmResult<()> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        let c = self.stack.pop()?;
        self.stack.push(f(a, b, c))
    }

    /// Pop a memory offset or length; already bounded by the memory charge
    fn pop_u64(&mut self) -> EvmResult<u64> {
        Ok(saturating_u64(&self.stack.pop()?))
    }

    fn jump(&mut self, dest: U256) -> EvmResult<()> {
        if !self.frame.is_valid_jump(&dest) {
            return Err(EvmError::InvalidJump(dest));
        }
        self.pc = dest.low_u64() as usize;
        Ok(())
    }

    /// Execute an opcode
    fn execute(&mut self, op: Opcode, evm: &mut Evm<'_>, call_gas: u64) -> EvmResult<Option<Bytes>> {
        use Opcode::*;
        match op {
            STOP => return Ok(Some(Bytes::new())),

            // Arithmetic
            ADD => self.binary(|a, b| a.overflowing_add(b).0)?,
            MUL => self.binary(|a, b| a.overflowing_mul(b).0)?,
            SUB => self.binary(|a, b| a.overflowing_sub(b).0)?,
            DIV => self.binary(|a, b| if b.is_zero() { U256::zero() } else { a / b })?,
            SDIV => self.binary(word::sdiv)?,
            MOD => self.binary(|a, b| if b.is_zero() { U256::zero() } else { a % b })?,
            SMOD => self.binary(word::smod)?,
            ADDMOD => self.ternary(word::addmod)?,
            MULMOD => self.ternary(word::mulmod)?,
            EXP => self.binary(word::exp)?,
            SIGNEXTEND => self.binary(word::signextend)?,

            // Comparison
            LT => self.binary(|a, b| bool_word(a < b))?,
            GT => self.binary(|a, b| bool_word(a > b))?,
            SLT => self.binary(|a, b| bool_word(word::slt(&a, &b)))?,
            SGT => self.binary(|a, b| bool_word(word::sgt(&a, &b)))?,
            EQ => self.binary(|a, b| bool_word(a == b))?,
            ISZERO => self.unary(|a| bool_word(a.is_zero()))?,

            // Bitwise
            AND => self.binary(|a, b| a & b)?,
            OR => self.binary(|a, b| a | b)?,
            XOR => self.binary(|a, b| a ^ b)?,
            NOT => self.unary(|a| !a)?,
            BYTE => self.binary(word::byte)?,
            SHL => self.binary(word::shl)?,
            SHR => self.binary(word::shr)?,
            SAR => self.binary(word::sar)?,

            KECCAK256 => {
                let offset = self.pop_u64()?;
                let size = self.pop_u64()?;
                let hash = keccak256(self.memory.slice(offset, size));
                self.stack.push(hash.to_word())?;
            }

            // Environment
            ADDRESS => self.stack.push(self.frame.address.to_word())?,
            BALANCE => {
                let address = Address::from_word(self.stack.pop()?);
                self.stack.push(evm.state.get_balance(&address))?;
            }
            ORIGIN => self.stack.push(evm.tx.origin.to_word())?,
            CALLER => self.stack.push(self.frame.caller.to_word())?,
            CALLVALUE => self.stack.push(self.frame.value)?,
            CALLDATALOAD => {
                let offset = self.stack.pop()?;
                let value = match as_u64(&offset) {
                    Some(offset) => U256::from_big_endian(&padded_slice(&self.frame.input, offset, 32)),
                    None => U256::zero(),
                };
                self.stack.push(value)?;
            }
            CALLDATASIZE => self.stack.push(U256::from(self.frame.input.len()))?,
            CALLDATACOPY => {
                let mem_offset = self.pop_u64()?;
                let data_offset = self.pop_u64()?;
                let size = self.pop_u64()?;
                let data = padded_slice(&self.frame.input, data_offset, size);
                self.memory.set(mem_offset, size, &data);
            }
            CODESIZE => self.stack.push(U256::from(self.frame.code.len()))?,
            CODECOPY => {
                let mem_offset = self.pop_u64()?;
                let code_offset = self.pop_u64()?;
                let size = self.pop_u64()?;
                let data = padded_slice(&self.frame.code, code_offset, size);
                self.memory.set(mem_offset, size, &data);
            }
            GASPRICE => self.stack.push(evm.tx.gas_price)?,
            EXTCODESIZE => {
                let address = Address::from_word(self.stack.pop()?);
                self.stack.push(U256::from(evm.state.get_code_size(&address)))?;
            }
            EXTCODECOPY => {
                let address = Address::from_word(self.stack.pop()?);
                let mem_offset = self.pop_u64()?;
                let code_offset = self.pop_u64()?;
                let size = self.pop_u64()?;
                let code = evm.state.get_code(&address);
                self.memory.set(mem_offset, size, &padded_slice(&code, code_offset, size));
            }
            RETURNDATASIZE => self.stack.push(U256::from(self.return_data.len()))?,
            RETURNDATACOPY => {
                let mem_offset = self.pop_u64()?;
                let data_offset = self.stack.pop()?;
                let size = self.pop_u64()?;
                let start = as_u64(&data_offset).ok_or(EvmError::ReturnDataOutOfBounds)?;
                let end = start.checked_add(size).ok_or(EvmError::ReturnDataOutOfBounds)?;
                if (self.return_data.len() as u64) < end {
                    return Err(EvmError::ReturnDataOutOfBounds);
                }
                let data = self.return_data.slice(start as usize..end as usize);
                self.memory.set(mem_offset, size, &data);
            }
            EXTCODEHASH => {
                let address = Address::from_word(self.stack.pop()?);
                let hash = if evm.state.empty(&address) {
                    U256::zero()
                } else {
                    evm.state.get_code_hash(&address).to_word()
                };
                self.stack.push(hash)?;
            }

            // Block info
            BLOCKHASH => {
                let number = self.stack.pop()?;
                let upper = evm.block.number;
                let lower = upper.saturating_sub(256);
                let hash = match as_u64(&number) {
                    Some(n) if n >= lower && n < upper => (evm.block.get_hash)(n).to_word(),
                    _ => U256::zero(),
                };
                self.stack.push(hash)?;
            }
            COINBASE => self.stack.push(evm.block.coinbase.to_word())?,
            TIMESTAMP => self.stack.push(U256::from(evm.block.time))?,
            NUMBER => self.stack.push(U256::from(evm.block.number))?,
            DIFFICULTY => {
                let value = match evm.block.random {
                    Some(random) if evm.rules.is_merge => random.to_word(),
                    _ => evm.block.difficulty,
                };
                self.stack.push(value)?;
            }
            GASLIMIT => self.stack.push(U256::from(evm.block.gas_limit))?,
            CHAINID => self.stack.push(U256::from(evm.rules.chain_id))?,
            SELFBALANCE => self.stack.push(evm.state.get_balance(&self.frame.address))?,
            BASEFEE => self.stack.push(evm.block.base_fee)?,

            // Stack, memory, storage and flow
            POP => {
                self.stack.pop()?;
            }
            MLOAD => {
                let offset = self.pop_u64()?;
                self.stack.push(self.memory.get32(offset))?;
            }
            MSTORE => {
                let offset = self.pop_u64()?;
                let value = self.stack.pop()?;
                self.memory.set32(offset, value);
            }
            MSTORE8 => {
                let offset = self.pop_u64()?;
                let value = self.stack.pop()?;
                self.memory.set_byte(offset, value);
            }
            SLOAD => {
                let key = H256::from_word(self.stack.pop()?);
                let value = evm.state.get_state(&self.frame.address, &key);
                self.stack.push(value.to_word())?;
            }
            SSTORE => {
                let key = H256::from_word(self.stack.pop()?);
                let value = H256::from_word(self.stack.pop()?);
                evm.state.set_state(&self.frame.address, key, value);
            }
            JUMP => {
                let dest = self.stack.pop()?;
                self.jump(dest)?;
                return Ok(None);
            }
            JUMPI => {
                let dest = self.stack.pop()?;
                let cond = self.stack.pop()?;
                if !cond.is_zero() {
                    self.jump(dest)?;
                    return Ok(None);
                }
            }
            PC => self.stack.push(U256::from(self.pc))?,
            MSIZE => self.stack.push(U256::from(self.memory.len()))?,
            GAS => self.stack.push(U256::from(self.frame.gas))?,
            JUMPDEST => {}

            // System
            CREATE | CREATE2 => self.create(op, evm)?,
            CALL | CALLCODE | DELEGATECALL | STATICCALL => self.call(op, evm, call_gas)?,
            RETURN => {
                let offset = self.pop_u64()?;
                let size = self.pop_u64()?;
                return Ok(Some(Bytes::from(self.memory.get_copy(offset, size))));
            }
            REVERT => {
                let offset = self.pop_u64()?;
                let size = self.pop_u64()?;
                return Err(EvmError::Revert(Bytes::from(self.memory.get_copy(offset, size))));
            }
            INVALID => return Err(EvmError::InvalidOpcode(INVALID as u8)),
            SELFDESTRUCT => {
                let beneficiary = Address::from_word(self.stack.pop()?);
                let balance = evm.state.get_balance(&self.frame.address);
                evm.state.add_balance(&beneficiary, balance);
                evm.state.suicide(&self.frame.address);
                return Ok(Some(Bytes::new()));
            }

            _ if op.is_push() => {
                let size = op.push_size();
                let value = U256::from_big_endian(&padded_slice(
                    &self.frame.code,
                    self.pc as u64 + 1,
                    size as u64,
                ));
                self.stack.push(value)?;
                self.pc += size;
            }
            _ if op.dup_depth() > 0 => self.stack.dup(op.dup_depth())?,
            _ if op.swap_depth() > 0 => self.stack.swap(op.swap_depth())?,
            _ if op.is_log() => {
                let offset = self.pop_u64()?;
                let size = self.pop_u64()?;
                let mut topics = Vec::with_capacity(op.log_topics());
                for _ in 0..op.log_topics() {
                    topics.push(H256::from_word(self.stack.pop()?));
                }
                evm.state.add_log(Log {
                    address: self.frame.address,
                    topics,
                    data: Bytes::from(self.memory.get_copy(offset, size)),
                });
            }
            _ => return Err(EvmError::InvalidOpcode(op as u8)),
        }

        self.pc += 1;
        Ok(None)
    }

    #[inline(never)]
    fn create(&mut self, op: Opcode, evm: &mut Evm<'_>) -> EvmResult<()> {
        let value = self.stack.pop()?;
        let offset = self.pop_u64()?;
        let size = self.pop_u64()?;
        let salt = if op == Opcode::CREATE2 {
            Some(H256::from_word(self.stack.pop()?))
        } else {
            None
        };
        let init_code = Bytes::from(self.memory.get_copy(offset, size));

        let mut gas = self.frame.gas;
        if op == Opcode::CREATE2 || evm.rules.is_eip150 {
            gas -= gas / 64;
        }
        self.frame.gas -= gas;

        let caller = self.frame.address;
        let outcome = match salt {
            Some(salt) => evm.create2(caller, init_code, gas, value, salt),
            None => evm.create(caller, init_code, gas, value),
        };

        let created = match &outcome.result {
            Ok(_) => true,
            Err(EvmError::CodeStoreOutOfGas) => !evm.rules.is_homestead,
            Err(_) => false,
        };
        let pushed = if created {
            outcome.address.to_word()
        } else {
            U256::zero()
        };
        self.stack.push(pushed)?;
        self.frame.refund_gas(outcome.gas_left);
        self.return_data = match outcome.result {
            Err(EvmError::Revert(data)) => data,
            _ => Bytes::new(),
        };
        Ok(())
    }

    #[inline(never)]
    fn call(&mut self, op: Opcode, evm: &mut Evm<'_>, call_gas: u64) -> EvmResult<()> {
        // requested gas, already priced into call_gas
        self.stack.pop()?;
        let to = Address::from_word(self.stack.pop()?);
        let value = match op {
            Opcode::CALL | Opcode::CALLCODE => self.stack.pop()?,
            _ => U256::zero(),
        };
        let in_offset = self.pop_u64()?;
        let in_size = self.pop_u64()?;
        let ret_offset = self.pop_u64()?;
        let ret_size = self.pop_u64()?;
        let input = Bytes::from(self.memory.get_copy(in_offset, in_size));

        let mut gas = call_gas;
        if !value.is_zero() {
            gas = gas.saturating_add(cost::CALL_STIPEND);
        }

        let caller = self.frame.address;
        let outcome = match op {
            Opcode::CALL => evm.call(caller, to, input, gas, value),
            Opcode::CALLCODE => evm.call_code(caller, to, input, gas, value),
            Opcode::DELEGATECALL => evm.delegate_call(&*self.frame, to, input, gas),
            _ => evm.static_call(caller, to, input, gas),
        };

        let output = outcome.output();
        let success = outcome.result.is_ok();
        self.stack.push(bool_word(success))?;
        if success || outcome.is_revert() {
            self.memory.set(ret_offset, ret_size, &output);
        }
        self.frame.refund_gas(outcome.gas_left);
        self.return_data = output;
        Ok(())
    }
}

/// `size` bytes of `data` from `start`, zero-padded past the end
fn padded_slice(data: &[u8], start: u64, size: u64) -> Vec<u8> {
    let len = data.len() as u64;
    let start = start.min(len);
    let end = start.saturating_add(size).min(len);
    let mut out = vec![0u8; size as usize];
    out[..(end - start) as usize].copy_from_slice(&data[start as usize..end as usize]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BlockContext, TxContext};
    use crate::memory_state::MemoryState;
    use crate::state::StateDB;
    use std::sync::Arc;
    use vesta_chainspec::ChainConfig;

    fn contract() -> Address {
        Address::from_bytes([0xcc; 20])
    }

    fn config(homestead: Option<u64>, eip150: Option<u64>, london: Option<u64>) -> ChainConfig {
        ChainConfig {
            chain_id: 1,
            homestead_block: homestead,
            eip150_block: eip150,
            london_block: london,
            ..Default::default()
        }
    }

    fn london() -> ChainConfig {
        config(Some(0), Some(0), Some(0))
    }

    struct Run {
        result: EvmResult<Bytes>,
        gas_left: u64,
        stack: Vec<U256>,
        state: FrameState,
        world: MemoryState,
    }

    fn run_with(cfg: &ChainConfig, block: BlockContext, world: MemoryState, code: &[u8], input: &[u8], gas: u64) -> Run {
        let mut world = world;
        let mut frame = CallFrame::new(Address::ZERO, contract(), U256::zero(), gas)
            .with_code(contract(), keccak256(code), Bytes::copy_from_slice(code))
            .with_input(Bytes::copy_from_slice(input));
        let (result, stack, state) = {
            let mut evm = Evm::new(block, TxContext::default(), cfg.clone(), &mut world);
            let mut interp = Interpreter::new(&mut frame);
            assert_eq!(interp.state(), FrameState::Ready);
            let result = interp.run(&mut evm);
            (result, interp.stack().data().to_vec(), interp.state())
        };
        Run {
            result,
            gas_left: frame.gas,
            stack,
            state,
            world,
        }
    }

    fn run_code(code: &[u8], gas: u64) -> Run {
        run_with(&london(), BlockContext::default(), MemoryState::new(), code, &[], gas)
    }

    fn top(run: &Run) -> U256 {
        *run.stack.last().unwrap()
    }

    #[test]
    fn test_stop() {
        let run = run_code(&[0x00], 100);
        assert_eq!(run.result, Ok(Bytes::new()));
        assert_eq!(run.state, FrameState::Halted);
        assert_eq!(run.gas_left, 100);
    }

    #[test]
    fn test_empty_code_halts() {
        let run = run_code(&[], 100);
        assert_eq!(run.result, Ok(Bytes::new()));
        assert_eq!(run.gas_left, 100);
    }

    #[test]
    fn test_push_add() {
        // PUSH1 3, PUSH1 5, ADD, STOP
        let run = run_code(&[0x60, 0x03, 0x60, 0x05, 0x01, 0x00], 100);
        assert_eq!(top(&run), U256::from(8));
        assert_eq!(run.gas_left, 100 - 9);
    }

    #[test]
    fn test_sub_operand_order() {
        // PUSH1 3, PUSH1 10, SUB -> 10 - 3
        let run = run_code(&[0x60, 0x03, 0x60, 0x0a, 0x03], 100);
        assert_eq!(top(&run), U256::from(7));
    }

    #[test]
    fn test_sub_wraps() {
        // PUSH1 1, PUSH1 0, SUB -> 0 - 1
        let run = run_code(&[0x60, 0x01, 0x60, 0x00, 0x03], 100);
        assert_eq!(top(&run), U256::MAX);
    }

    #[test]
    fn test_div_by_zero() {
        // PUSH1 0, PUSH1 10, DIV
        let run = run_code(&[0x60, 0x00, 0x60, 0x0a, 0x04], 100);
        assert_eq!(top(&run), U256::zero());
    }

    #[test]
    fn test_push_past_end_is_right_padded() {
        // PUSH2 0x12 (code ends)
        let run = run_code(&[0x61, 0x12], 100);
        assert_eq!(top(&run), U256::from(0x1200));
    }

    // ==================== Flow ====================

    #[test]
    fn test_jump() {
        // PUSH1 4, JUMP, INVALID, JUMPDEST, STOP
        let run = run_code(&[0x60, 0x04, 0x56, 0xfe, 0x5b, 0x00], 100);
        assert!(run.result.is_ok());
    }

    #[test]
    fn test_jumpi_not_taken() {
        // PUSH1 0, PUSH1 6, JUMPI, STOP, INVALID, JUMPDEST
        let run = run_code(&[0x60, 0x00, 0x60, 0x06, 0x57, 0x00, 0xfe, 0x5b], 100);
        assert!(run.result.is_ok());
    }

    #[test]
    fn test_invalid_jump_consumes_gas() {
        // PUSH1 10, JUMP
        let run = run_code(&[0x60, 0x0a, 0x56], 100);
        assert_eq!(run.result, Err(EvmError::InvalidJump(U256::from(10))));
        assert_eq!(run.state, FrameState::Faulted);
    }

    #[test]
    fn test_jump_into_push_data() {
        // PUSH1 3, JUMP, PUSH1 0x5b
        let run = run_code(&[0x60, 0x03, 0x56, 0x60, 0x5b], 100);
        assert!(matches!(run.result, Err(EvmError::InvalidJump(_))));
    }

    // ==================== Faults ====================

    #[test]
    fn test_out_of_gas() {
        // PUSH1 1 with only 2 gas
        let run = run_code(&[0x60, 0x01], 2);
        assert_eq!(run.result, Err(EvmError::OutOfGas));
        assert_eq!(run.gas_left, 2);
    }

    #[test]
    fn test_stack_underflow() {
        let run = run_code(&[0x01], 100);
        assert_eq!(run.result, Err(EvmError::StackUnderflow));
        // checked before any gas is taken
        assert_eq!(run.gas_left, 100);
    }

    #[test]
    fn test_stack_overflow() {
        // 1025 x PUSH1 0
        let code: Vec<u8> = std::iter::repeat([0x60, 0x00]).take(1025).flatten().collect();
        let run = run_code(&code, 1_000_000);
        assert_eq!(run.result, Err(EvmError::StackOverflow));
        assert_eq!(run.stack.len(), 1024);
    }

    #[test]
    fn test_undefined_opcode() {
        let run = run_code(&[0x0c], 100);
        assert_eq!(run.result, Err(EvmError::InvalidOpcode(0x0c)));
        let run = run_code(&[0xfe], 100);
        assert_eq!(run.result, Err(EvmError::InvalidOpcode(0xfe)));
    }

    #[test]
    fn test_opcode_not_yet_active() {
        let frontier = config(None, None, None);
        // PUSH1 0, PUSH1 0, REVERT
        let run = run_with(&frontier, BlockContext::default(), MemoryState::new(), &[0x60, 0x00, 0x60, 0x00, 0xfd], &[], 100);
        assert_eq!(run.result, Err(EvmError::InvalidOpcode(0xfd)));

        let run = run_with(&config(Some(0), Some(0), None), BlockContext::default(), MemoryState::new(), &[0x46], &[], 100);
        assert_eq!(run.result, Err(EvmError::InvalidOpcode(0x46)));
    }

    // ==================== Memory ====================

    #[test]
    fn test_mstore_mload() {
        // PUSH1 42, PUSH1 0, MSTORE, PUSH1 0, MLOAD, STOP
        let run = run_code(&[0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x00, 0x51, 0x00], 100);
        assert_eq!(top(&run), U256::from(42));
        // 4 pushes, MSTORE, MLOAD, one word of memory
        assert_eq!(run.gas_left, 100 - (4 * 3 + 3 + 3 + 3));
    }

    #[test]
    fn test_msize_word_aligned() {
        // PUSH1 1, PUSH1 33, MSTORE8, MSIZE
        let run = run_code(&[0x60, 0x01, 0x60, 0x21, 0x53, 0x59], 100);
        assert_eq!(top(&run), U256::from(64));
    }

    #[test]
    fn test_huge_memory_offset() {
        // PUSH1 0, PUSH32 MAX, MSTORE
        let mut code = vec![0x60, 0x00, 0x7f];
        code.extend_from_slice(&[0xff; 32]);
        code.push(0x52);
        let run = run_code(&code, 1_000_000);
        assert_eq!(run.result, Err(EvmError::GasUintOverflow));
    }

    #[test]
    fn test_return() {
        // PUSH1 4, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
        let run = run_code(&[0x60, 0x04, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3], 100);
        let output = run.result.unwrap();
        assert_eq!(output.len(), 32);
        assert_eq!(output[31], 4);
    }

    #[test]
    fn test_revert_keeps_gas() {
        // PUSH1 0xaa, PUSH1 0, MSTORE8, PUSH1 1, PUSH1 0, REVERT
        let run = run_code(&[0x60, 0xaa, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xfd], 100);
        assert_eq!(run.result, Err(EvmError::Revert(Bytes::from_static(&[0xaa]))));
        assert_eq!(run.state, FrameState::Reverted);
        assert_eq!(run.gas_left, 100 - (4 * 3 + 3 + 3));
    }

    #[test]
    fn test_create_keeps_one_64th() {
        // MSTORE8(0, INVALID), CREATE(0, 0, 1), STOP
        let code = [0x60, 0xfe, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0x60, 0x00, 0xf0, 0x00];
        let run = run_code(&code, 100_000);
        assert_eq!(run.result, Ok(Bytes::new()));
        assert_eq!(top(&run), U256::zero());
        // the init code faults and burns everything it was given
        let before = 100_000 - (3 * 3 + 3 + 3 * 3 + 32_000);
        assert_eq!(run.gas_left, before / 64);
        assert_eq!(run.world.get_nonce(&contract()), 1);
    }

    #[test]
    fn test_keccak256() {
        // KECCAK256(0, 0)
        let run = run_code(&[0x60, 0x00, 0x60, 0x00, 0x20], 100);
        assert_eq!(top(&run), vesta_crypto::EMPTY_CODE_HASH.to_word());
        assert_eq!(run.gas_left, 100 - 6 - 30);
    }

    // ==================== Environment ====================

    #[test]
    fn test_calldataload_pads() {
        // PUSH1 1, CALLDATALOAD
        let run = run_with(&london(), BlockContext::default(), MemoryState::new(), &[0x60, 0x01, 0x35], &[0x00, 0xab], 100);
        assert_eq!(top(&run), U256::from(0xab) << 248);
    }

    #[test]
    fn test_returndatacopy_out_of_bounds() {
        // PUSH1 1, PUSH1 0, PUSH1 0, RETURNDATACOPY
        let run = run_code(&[0x60, 0x01, 0x60, 0x00, 0x60, 0x00, 0x3e], 100);
        assert_eq!(run.result, Err(EvmError::ReturnDataOutOfBounds));
    }

    #[test]
    fn test_blockhash_window() {
        let block = BlockContext {
            number: 300,
            get_hash: Arc::new(|n| H256::from_word(U256::from(n + 1))),
            ..Default::default()
        };
        let query = |n: u8| {
            run_with(&london(), block.clone(), MemoryState::new(), &[0x60, n, 0x40], &[], 100)
        };
        // 300 - 256 = 44 is the oldest visible block
        assert_eq!(top(&query(44)), U256::from(45));
        assert_eq!(top(&query(43)), U256::zero());
        let run = run_with(&london(), block.clone(), MemoryState::new(), &[0x61, 0x01, 0x2b, 0x40], &[], 100);
        assert_eq!(top(&run), U256::from(300));
        let run = run_with(&london(), block, MemoryState::new(), &[0x61, 0x01, 0x2c, 0x40], &[], 100);
        assert_eq!(top(&run), U256::zero());
    }

    #[test]
    fn test_difficulty_after_merge() {
        let random = H256::from_bytes([0x42; 32]);
        let block = BlockContext {
            difficulty: U256::from(7),
            ..Default::default()
        };
        let run = run_with(&london(), block.clone(), MemoryState::new(), &[0x44], &[], 100);
        assert_eq!(top(&run), U256::from(7));

        let merged = BlockContext {
            random: Some(random),
            ..block
        };
        let run = run_with(&london(), merged, MemoryState::new(), &[0x44], &[], 100);
        assert_eq!(top(&run), random.to_word());
    }

    #[test]
    fn test_chainid_and_selfbalance() {
        let mut world = MemoryState::new();
        world.add_balance(&contract(), U256::from(99));
        let cfg = ChainConfig { chain_id: 7, ..london() };
        let run = run_with(&cfg, BlockContext::default(), world, &[0x46, 0x47], &[], 100);
        assert_eq!(run.stack, vec![U256::from(7), U256::from(99)]);
    }

    // ==================== State ====================

    #[test]
    fn test_sstore_sload() {
        // PUSH1 0x2a, PUSH1 1, SSTORE, PUSH1 1, SLOAD
        let run = run_code(&[0x60, 0x2a, 0x60, 0x01, 0x55, 0x60, 0x01, 0x54], 100_000);
        assert_eq!(top(&run), U256::from(42));
        let key = H256::from_word(U256::one());
        assert_eq!(run.world.get_state(&contract(), &key).to_word(), U256::from(42));
        // 3 pushes, SSTORE init, SLOAD
        assert_eq!(run.gas_left, 100_000 - (3 * 3 + 20000 + 800));
    }

    #[test]
    fn test_log() {
        // PUSH1 0xbb (topic), PUSH1 0, PUSH1 0, LOG1
        let run = run_code(&[0x60, 0xbb, 0x60, 0x00, 0x60, 0x00, 0xa1], 10_000);
        assert!(run.result.is_ok());
        let logs = run.world.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].address, contract());
        assert_eq!(logs[0].topics, vec![H256::from_word(U256::from(0xbb))]);
        assert!(logs[0].data.is_empty());
    }

    #[test]
    fn test_write_protection() {
        let mut world = MemoryState::new();
        let mut frame = CallFrame::new(Address::ZERO, contract(), U256::zero(), 100_000)
            .with_code(contract(), H256::ZERO, Bytes::from_static(&[0x60, 0x01, 0x60, 0x01, 0x55]));
        let mut evm = Evm::new(BlockContext::default(), TxContext::default(), london(), &mut world);
        evm.read_only = true;
        let result = Interpreter::new(&mut frame).run(&mut evm);
        assert_eq!(result, Err(EvmError::WriteProtection));
    }

    #[test]
    fn test_selfdestruct_moves_balance() {
        let mut world = MemoryState::new();
        world.add_balance(&contract(), U256::from(500));
        // PUSH1 0xbb, SELFDESTRUCT
        let run = run_with(&london(), BlockContext::default(), world, &[0x60, 0xbb, 0xff], &[], 100_000);
        assert!(run.result.is_ok());
        let beneficiary = Address::from_word(U256::from(0xbb));
        assert_eq!(run.world.get_balance(&beneficiary), U256::from(500));
        assert!(run.world.has_suicided(&contract()));
        assert_eq!(run.world.get_refund(), 24000);
        assert_eq!(run.gas_left, 100_000 - 3 - 5000 - 25000);
    }
}
