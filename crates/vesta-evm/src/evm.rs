//! Call and create engine

use crate::context::{BlockContext, CallFrame, TxContext};
use crate::error::{EvmError, EvmResult};
use crate::gas::cost;
use crate::interpreter::Interpreter;
use crate::state::StateDB;
use bytes::Bytes;
use primitive_types::U256;
use rlp::RlpStream;
use vesta_chainspec::{ChainConfig, Rules};
use vesta_crypto::{keccak256, keccak256_concat, EMPTY_CODE_HASH};
use vesta_primitives::{Address, H256};

/// Native stack that must remain before entering a nested frame in place
const STACK_RED_ZONE: usize = 256 * 1024;
/// Size of each extra native stack segment for nested frames
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// Result of a message call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    /// Return data, or the error that ended the call
    pub result: EvmResult<Bytes>,
    /// Gas handed back to the caller
    pub gas_left: u64,
}

impl CallOutcome {
    fn aborted(err: EvmError, gas_left: u64) -> Self {
        Self {
            result: Err(err),
            gas_left,
        }
    }

    /// Returned bytes; the revert payload for a reverted call, empty on fault
    pub fn output(&self) -> Bytes {
        match &self.result {
            Ok(output) | Err(EvmError::Revert(output)) => output.clone(),
            Err(_) => Bytes::new(),
        }
    }

    /// Whether the call succeeded
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether the call ended with REVERT
    pub fn is_revert(&self) -> bool {
        matches!(self.result, Err(EvmError::Revert(_)))
    }
}

/// Result of a contract creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    /// Deployed code, or the error that ended the creation
    pub result: EvmResult<Bytes>,
    /// Address of the (attempted) contract
    pub address: Address,
    /// Gas handed back to the creator
    pub gas_left: u64,
}

impl CreateOutcome {
    fn aborted(err: EvmError, address: Address, gas_left: u64) -> Self {
        Self {
            result: Err(err),
            address,
            gas_left,
        }
    }
}

/// Address of a contract created with CREATE: `keccak256(rlp([sender, nonce]))[12..]`
pub fn create_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(sender);
    stream.append(&nonce);
    Address::from_tail(keccak256(&stream.out()).as_bytes())
}

/// Address of a contract created with CREATE2:
/// `keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))[12..]`
pub fn create2_address(sender: &Address, salt: &H256, init_code_hash: &H256) -> Address {
    let hash = keccak256_concat(&[
        &[0xff][..],
        &sender.as_bytes()[..],
        &salt.as_bytes()[..],
        &init_code_hash.as_bytes()[..],
    ]);
    Address::from_tail(hash.as_bytes())
}

/// Whether `address` holds at least `amount`
pub fn can_transfer(state: &dyn StateDB, address: &Address, amount: U256) -> bool {
    state.get_balance(address) >= amount
}

/// Move `amount` from `sender` to `recipient`
pub fn transfer(state: &mut dyn StateDB, sender: &Address, recipient: &Address, amount: U256) {
    state.sub_balance(sender, amount);
    state.add_balance(recipient, amount);
}

/// Execution engine for one transaction.
///
/// Holds the block and transaction environment, the fork rules derived
/// from the chain config at the block number, and the world state.
/// Every call or create takes a state snapshot first and reverts to it
/// if the frame fails.
pub struct Evm<'a> {
    /// Block environment
    pub block: BlockContext,
    /// Transaction environment
    pub tx: TxContext,
    /// Chain configuration
    pub chain_config: ChainConfig,
    /// Fork rules in effect for `block`
    pub rules: Rules,
    pub(crate) state: &'a mut dyn StateDB,
    pub(crate) depth: usize,
    pub(crate) read_only: bool,
}

impl<'a> Evm<'a> {
    /// Create an engine over `state`
    pub fn new(
        block: BlockContext,
        tx: TxContext,
        chain_config: ChainConfig,
        state: &'a mut dyn StateDB,
    ) -> Self {
        let rules = chain_config.rules(block.number, block.random.is_some());
        Self {
            block,
            tx,
            chain_config,
            rules,
            state,
            depth: 0,
            read_only: false,
        }
    }

    /// World state
    pub fn state(&self) -> &(dyn StateDB + 'a) {
        &*self.state
    }

    /// Mutable world state
    pub fn state_mut(&mut self) -> &mut (dyn StateDB + 'a) {
        &mut *self.state
    }

    /// Current call depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Execute the code at `to` with `to` as the executing account,
    /// moving `value` from `caller` first.
    ///
    /// A missing `to` account is created. On error all state changes are
    /// undone and, unless the callee reverted, the gas is consumed.
    pub fn call(
        &mut self,
        caller: Address,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallOutcome {
        if self.depth > cost::CALL_CREATE_DEPTH {
            return CallOutcome::aborted(EvmError::CallDepthExceeded, gas);
        }
        if !value.is_zero() && !can_transfer(&*self.state, &caller, value) {
            return CallOutcome::aborted(EvmError::InsufficientBalance, gas);
        }

        let snapshot = self.state.snapshot();
        if !self.state.exist(&to) {
            self.state.create_account(to);
        }
        transfer(&mut *self.state, &caller, &to, value);

        let code = self.state.get_code(&to);
        if code.is_empty() {
            self.state.commit_snapshot(snapshot);
            return CallOutcome {
                result: Ok(Bytes::new()),
                gas_left: gas,
            };
        }

        tracing::debug!("CALL {} -> {} value={} gas={}", caller, to, value, gas);
        let mut frame = CallFrame::new(caller, to, value, gas)
            .with_code(to, self.state.get_code_hash(&to), code)
            .with_input(input);
        let result = self.run(&mut frame);
        self.settle(snapshot, result, frame.gas)
    }

    /// Execute the code at `to` in the context of `caller`
    pub fn call_code(
        &mut self,
        caller: Address,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallOutcome {
        if self.depth > cost::CALL_CREATE_DEPTH {
            return CallOutcome::aborted(EvmError::CallDepthExceeded, gas);
        }
        if !can_transfer(&*self.state, &caller, value) {
            return CallOutcome::aborted(EvmError::InsufficientBalance, gas);
        }

        let snapshot = self.state.snapshot();
        tracing::debug!("CALLCODE {} code={} gas={}", caller, to, gas);
        let mut frame = CallFrame::new(caller, caller, value, gas)
            .with_code(to, self.state.get_code_hash(&to), self.state.get_code(&to))
            .with_input(input);
        let result = self.run(&mut frame);
        self.settle(snapshot, result, frame.gas)
    }

    /// Execute the code at `to` keeping the caller, address and value of
    /// `parent`
    pub fn delegate_call(
        &mut self,
        parent: &CallFrame,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallOutcome {
        if self.depth > cost::CALL_CREATE_DEPTH {
            return CallOutcome::aborted(EvmError::CallDepthExceeded, gas);
        }

        let snapshot = self.state.snapshot();
        tracing::debug!("DELEGATECALL {} code={} gas={}", parent.address, to, gas);
        let mut frame = CallFrame::new(parent.caller, parent.address, parent.value, gas)
            .with_code(to, self.state.get_code_hash(&to), self.state.get_code(&to))
            .with_input(input);
        let result = self.run(&mut frame);
        self.settle(snapshot, result, frame.gas)
    }

    /// Execute the code at `to` with state modification forbidden for
    /// this frame and everything it calls
    pub fn static_call(&mut self, caller: Address, to: Address, input: Bytes, gas: u64) -> CallOutcome {
        if self.depth > cost::CALL_CREATE_DEPTH {
            return CallOutcome::aborted(EvmError::CallDepthExceeded, gas);
        }

        let snapshot = self.state.snapshot();
        tracing::debug!("STATICCALL {} -> {} gas={}", caller, to, gas);
        let mut frame = CallFrame::new(caller, to, U256::zero(), gas)
            .with_code(to, self.state.get_code_hash(&to), self.state.get_code(&to))
            .with_input(input);

        let was_read_only = std::mem::replace(&mut self.read_only, true);
        let result = self.run(&mut frame);
        self.read_only = was_read_only;

        self.settle(snapshot, result, frame.gas)
    }

    /// Deploy a contract at the CREATE address of `caller`
    pub fn create(&mut self, caller: Address, init_code: Bytes, gas: u64, value: U256) -> CreateOutcome {
        let address = create_address(&caller, self.state.get_nonce(&caller));
        self.create_at(caller, init_code, gas, value, address)
    }

    /// Deploy a contract at the CREATE2 address given by `salt`
    pub fn create2(
        &mut self,
        caller: Address,
        init_code: Bytes,
        gas: u64,
        value: U256,
        salt: H256,
    ) -> CreateOutcome {
        let address = create2_address(&caller, &salt, &keccak256(&init_code));
        self.create_at(caller, init_code, gas, value, address)
    }

    fn create_at(
        &mut self,
        caller: Address,
        init_code: Bytes,
        gas: u64,
        value: U256,
        address: Address,
    ) -> CreateOutcome {
        if self.depth > cost::CALL_CREATE_DEPTH {
            return CreateOutcome::aborted(EvmError::CallDepthExceeded, address, gas);
        }
        if !can_transfer(&*self.state, &caller, value) {
            return CreateOutcome::aborted(EvmError::InsufficientBalance, address, gas);
        }
        let Some(nonce) = self.state.get_nonce(&caller).checked_add(1) else {
            return CreateOutcome::aborted(EvmError::NonceUintOverflow, address, gas);
        };
        self.state.set_nonce(&caller, nonce);

        let code_hash = self.state.get_code_hash(&address);
        if self.state.get_nonce(&address) != 0
            || !(code_hash.is_zero() || code_hash == EMPTY_CODE_HASH)
        {
            tracing::debug!("CREATE collision at {}", address);
            return CreateOutcome::aborted(EvmError::ContractAddressCollision, address, 0);
        }

        let snapshot = self.state.snapshot();
        self.state.create_account(address);
        if self.rules.is_eip150 {
            self.state.set_nonce(&address, 1);
        }
        transfer(&mut *self.state, &caller, &address, value);

        tracing::debug!("CREATE {} -> {} value={} gas={}", caller, address, value, gas);
        let mut frame = CallFrame::new(caller, address, value, gas).with_code(
            address,
            keccak256(&init_code),
            init_code,
        );
        let result = self.run(&mut frame).and_then(|code| self.deposit(&mut frame, &address, code));

        let gas_left = match &result {
            Ok(_) => {
                self.state.commit_snapshot(snapshot);
                frame.gas
            }
            Err(err) if self.rules.is_homestead || *err != EvmError::CodeStoreOutOfGas => {
                self.state.revert_to_snapshot(snapshot);
                if err.is_revert() {
                    frame.gas
                } else {
                    0
                }
            }
            // frontier keeps the account and the gas
            Err(_) => {
                self.state.commit_snapshot(snapshot);
                frame.gas
            }
        };

        CreateOutcome {
            result,
            address,
            gas_left,
        }
    }

    /// Validate returned runtime code, charge for it and install it
    fn deposit(&mut self, frame: &mut CallFrame, address: &Address, code: Bytes) -> EvmResult<Bytes> {
        if self.rules.is_eip150 && code.len() > cost::MAX_CODE_SIZE {
            return Err(EvmError::MaxCodeSizeExceeded);
        }
        if self.rules.is_london && code.first() == Some(&0xef) {
            return Err(EvmError::InvalidCode);
        }
        if !frame.use_gas(code.len() as u64 * cost::CREATE_DATA) {
            return Err(EvmError::CodeStoreOutOfGas);
        }
        self.state.set_code(address, code.clone());
        Ok(code)
    }

    fn run(&mut self, frame: &mut CallFrame) -> EvmResult<Bytes> {
        self.depth += 1;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            Interpreter::new(frame).run(self)
        });
        self.depth -= 1;
        result
    }

    fn settle(&mut self, snapshot: usize, result: EvmResult<Bytes>, gas_left: u64) -> CallOutcome {
        match result {
            Ok(output) => {
                self.state.commit_snapshot(snapshot);
                CallOutcome {
                    result: Ok(output),
                    gas_left,
                }
            }
            Err(err) => {
                self.state.revert_to_snapshot(snapshot);
                let gas_left = if err.is_revert() { gas_left } else { 0 };
                CallOutcome {
                    result: Err(err),
                    gas_left,
                }
            }
        }
    }
}

impl std::fmt::Debug for Evm<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evm")
            .field("block", &self.block)
            .field("tx", &self.tx)
            .field("rules", &self.rules)
            .field("depth", &self.depth)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}
