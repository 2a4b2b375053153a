//! In-memory world state with snapshot/revert

use crate::state::{Log, StateDB};
use bytes::Bytes;
use primitive_types::U256;
use std::collections::HashMap;
use vesta_crypto::{keccak256, EMPTY_CODE_HASH};
use vesta_primitives::{Address, H256};

/// One account as held by [`MemoryState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Balance in wei
    pub balance: U256,
    /// Nonce
    pub nonce: u64,
    /// Code
    pub code: Bytes,
    /// keccak256 of `code`
    pub code_hash: H256,
    /// Slots written during the current transaction
    pub dirty_storage: HashMap<H256, H256>,
    /// Slots as of the start of the current transaction
    pub committed_storage: HashMap<H256, H256>,
    /// Scheduled for deletion at [`MemoryState::finalise`]
    pub suicided: bool,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            balance: U256::zero(),
            nonce: 0,
            code: Bytes::new(),
            code_hash: EMPTY_CODE_HASH,
            dirty_storage: HashMap::new(),
            committed_storage: HashMap::new(),
            suicided: false,
        }
    }
}

impl Account {
    /// Current value of a slot
    pub fn storage(&self, key: &H256) -> H256 {
        self.dirty_storage
            .get(key)
            .or_else(|| self.committed_storage.get(key))
            .copied()
            .unwrap_or(H256::ZERO)
    }

    fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code.is_empty()
    }
}

/// Undo record for one state mutation
#[derive(Debug, Clone)]
enum JournalEntry {
    /// Account did not exist before
    Touched(Address),
    /// Account was replaced wholesale
    Replaced {
        address: Address,
        prev: Option<Account>,
    },
    Balance {
        address: Address,
        prev: U256,
    },
    Nonce {
        address: Address,
        prev: u64,
    },
    Code {
        address: Address,
        prev: Bytes,
        prev_hash: H256,
    },
    Storage {
        address: Address,
        key: H256,
        prev: Option<H256>,
    },
    Suicide {
        address: Address,
        prev: bool,
        prev_balance: U256,
    },
    Refund(u64),
    Log,
}

/// Hash-map backed [`StateDB`].
///
/// Every mutation appends an undo entry to a journal. A snapshot is the
/// journal length at the time it was taken; reverting replays the entries
/// recorded since then in reverse.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    accounts: HashMap<Address, Account>,
    refund: u64,
    logs: Vec<Log>,
    journal: Vec<JournalEntry>,
    snapshots: Vec<usize>,
}

impl MemoryState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an account
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether no account exists
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Logs recorded so far
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Drain recorded logs
    pub fn take_logs(&mut self) -> Vec<Log> {
        std::mem::take(&mut self.logs)
    }

    /// Number of undo entries recorded since the last [`MemoryState::finalise`]
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Close the current transaction.
    ///
    /// Deletes suicided accounts, makes written slots the committed values,
    /// resets the refund counter and drops the journal with all snapshots.
    pub fn finalise(&mut self) {
        self.accounts.retain(|address, account| {
            if account.suicided {
                tracing::debug!("Deleting suicided account {}", address);
            }
            !account.suicided
        });
        for account in self.accounts.values_mut() {
            for (key, value) in account.dirty_storage.drain() {
                if value.is_zero() {
                    account.committed_storage.remove(&key);
                } else {
                    account.committed_storage.insert(key, value);
                }
            }
        }
        self.refund = 0;
        self.journal.clear();
        self.snapshots.clear();
    }

    pub(crate) fn insert_account(&mut self, address: Address, account: Account) {
        let prev = self.accounts.insert(address, account);
        self.journal.push(JournalEntry::Replaced { address, prev });
    }

    fn account_mut(&mut self, address: &Address) -> &mut Account {
        if !self.accounts.contains_key(address) {
            self.journal.push(JournalEntry::Touched(*address));
        }
        self.accounts.entry(*address).or_default()
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Touched(address) => {
                self.accounts.remove(&address);
            }
            JournalEntry::Replaced { address, prev } => match prev {
                Some(account) => {
                    self.accounts.insert(address, account);
                }
                None => {
                    self.accounts.remove(&address);
                }
            },
            JournalEntry::Balance { address, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.balance = prev;
                }
            }
            JournalEntry::Nonce { address, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.nonce = prev;
                }
            }
            JournalEntry::Code {
                address,
                prev,
                prev_hash,
            } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.code = prev;
                    account.code_hash = prev_hash;
                }
            }
            JournalEntry::Storage { address, key, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    match prev {
                        Some(value) => account.dirty_storage.insert(key, value),
                        None => account.dirty_storage.remove(&key),
                    };
                }
            }
            JournalEntry::Suicide {
                address,
                prev,
                prev_balance,
            } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.suicided = prev;
                    account.balance = prev_balance;
                }
            }
            JournalEntry::Refund(prev) => self.refund = prev,
            JournalEntry::Log => {
                self.logs.pop();
            }
        }
    }
}

impl StateDB for MemoryState {
    fn create_account(&mut self, address: Address) {
        let balance = self.get_balance(&address);
        self.insert_account(
            address,
            Account {
                balance,
                ..Default::default()
            },
        );
    }

    fn get_balance(&self, address: &Address) -> U256 {
        self.account(address).map(|a| a.balance).unwrap_or_default()
    }

    fn add_balance(&mut self, address: &Address, amount: U256) {
        let prev = self.get_balance(address);
        self.account_mut(address).balance = prev.overflowing_add(amount).0;
        self.journal.push(JournalEntry::Balance {
            address: *address,
            prev,
        });
    }

    fn sub_balance(&mut self, address: &Address, amount: U256) {
        let prev = self.get_balance(address);
        self.account_mut(address).balance = prev.overflowing_sub(amount).0;
        self.journal.push(JournalEntry::Balance {
            address: *address,
            prev,
        });
    }

    fn get_nonce(&self, address: &Address) -> u64 {
        self.account(address).map(|a| a.nonce).unwrap_or(0)
    }

    fn set_nonce(&mut self, address: &Address, nonce: u64) {
        let prev = self.get_nonce(address);
        self.account_mut(address).nonce = nonce;
        self.journal.push(JournalEntry::Nonce {
            address: *address,
            prev,
        });
    }

    fn get_code(&self, address: &Address) -> Bytes {
        self.account(address).map(|a| a.code.clone()).unwrap_or_default()
    }

    fn get_code_hash(&self, address: &Address) -> H256 {
        self.account(address).map(|a| a.code_hash).unwrap_or(H256::ZERO)
    }

    fn get_code_size(&self, address: &Address) -> usize {
        self.account(address).map(|a| a.code.len()).unwrap_or(0)
    }

    fn set_code(&mut self, address: &Address, code: Bytes) {
        let account = self.account_mut(address);
        let prev_hash = std::mem::replace(&mut account.code_hash, keccak256(&code));
        let prev = std::mem::replace(&mut account.code, code);
        self.journal.push(JournalEntry::Code {
            address: *address,
            prev,
            prev_hash,
        });
    }

    fn get_state(&self, address: &Address, key: &H256) -> H256 {
        self.account(address).map(|a| a.storage(key)).unwrap_or(H256::ZERO)
    }

    fn get_committed_state(&self, address: &Address, key: &H256) -> H256 {
        self.account(address)
            .and_then(|a| a.committed_storage.get(key).copied())
            .unwrap_or(H256::ZERO)
    }

    fn set_state(&mut self, address: &Address, key: H256, value: H256) {
        let prev = self.account_mut(address).dirty_storage.insert(key, value);
        self.journal.push(JournalEntry::Storage {
            address: *address,
            key,
            prev,
        });
    }

    fn exist(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    fn empty(&self, address: &Address) -> bool {
        self.account(address).map_or(true, Account::is_empty)
    }

    fn suicide(&mut self, address: &Address) -> bool {
        match self.accounts.get_mut(address) {
            Some(account) => {
                let prev = std::mem::replace(&mut account.suicided, true);
                let prev_balance = std::mem::replace(&mut account.balance, U256::zero());
                self.journal.push(JournalEntry::Suicide {
                    address: *address,
                    prev,
                    prev_balance,
                });
                true
            }
            None => false,
        }
    }

    fn has_suicided(&self, address: &Address) -> bool {
        self.account(address).is_some_and(|a| a.suicided)
    }

    fn add_refund(&mut self, gas: u64) {
        self.journal.push(JournalEntry::Refund(self.refund));
        self.refund += gas;
    }

    fn sub_refund(&mut self, gas: u64) {
        self.journal.push(JournalEntry::Refund(self.refund));
        match self.refund.checked_sub(gas) {
            Some(refund) => self.refund = refund,
            None => {
                tracing::error!(
                    "Refund counter below zero (gas: {} > refund: {})",
                    gas,
                    self.refund
                );
                self.refund = 0;
            }
        }
    }

    fn get_refund(&self) -> u64 {
        self.refund
    }

    fn add_log(&mut self, log: Log) {
        self.logs.push(log);
        self.journal.push(JournalEntry::Log);
    }

    fn snapshot(&mut self) -> usize {
        self.snapshots.push(self.journal.len());
        self.snapshots.len() - 1
    }

    fn revert_to_snapshot(&mut self, id: usize) {
        let Some(&mark) = self.snapshots.get(id) else {
            tracing::error!("Revert to unknown snapshot {} (have {})", id, self.snapshots.len());
            return;
        };
        while self.journal.len() > mark {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        self.snapshots.truncate(id);
    }

    fn commit_snapshot(&mut self, id: usize) {
        self.snapshots.truncate(id);
    }
}
