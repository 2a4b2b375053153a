//! World-state access used by the engine

use bytes::Bytes;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use vesta_primitives::{Address, H256};

/// Log entry emitted by LOG opcodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract address that emitted the log
    pub address: Address,
    /// Log topics (0-4)
    pub topics: Vec<H256>,
    /// Log data
    #[serde(with = "hex_bytes")]
    pub data: Bytes,
}

mod hex_bytes {
    use bytes::Bytes;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(data)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map(Bytes::from).map_err(de::Error::custom)
    }
}

/// Account and storage access for one transaction.
///
/// Every mutation made after [`StateDB::snapshot`] is undone by
/// [`StateDB::revert_to_snapshot`] with the same id, including refunds and
/// logs. Snapshots nest: reverting to an id discards all later ones.
pub trait StateDB {
    /// Create or reset an account, keeping its balance
    fn create_account(&mut self, address: Address);

    /// Balance (zero for unknown accounts)
    fn get_balance(&self, address: &Address) -> U256;
    /// Credit an account, creating it if needed
    fn add_balance(&mut self, address: &Address, amount: U256);
    /// Debit an account
    fn sub_balance(&mut self, address: &Address, amount: U256);

    /// Nonce (zero for unknown accounts)
    fn get_nonce(&self, address: &Address) -> u64;
    /// Set the nonce
    fn set_nonce(&mut self, address: &Address, nonce: u64);

    /// Code (empty for unknown accounts)
    fn get_code(&self, address: &Address) -> Bytes;
    /// keccak256 of the code, or zero for unknown accounts
    fn get_code_hash(&self, address: &Address) -> H256;
    /// Code length in bytes
    fn get_code_size(&self, address: &Address) -> usize {
        self.get_code(address).len()
    }
    /// Install code
    fn set_code(&mut self, address: &Address, code: Bytes);

    /// Current value of a storage slot
    fn get_state(&self, address: &Address, key: &H256) -> H256;
    /// Value of a storage slot at the start of the transaction
    fn get_committed_state(&self, address: &Address, key: &H256) -> H256;
    /// Write a storage slot
    fn set_state(&mut self, address: &Address, key: H256, value: H256);

    /// Whether the account exists
    fn exist(&self, address: &Address) -> bool;
    /// Whether the account is unknown or has no nonce, balance or code
    fn empty(&self, address: &Address) -> bool;

    /// Schedule an account for deletion and zero its balance.
    ///
    /// Returns false if the account does not exist.
    fn suicide(&mut self, address: &Address) -> bool;
    /// Whether the account has been scheduled for deletion
    fn has_suicided(&self, address: &Address) -> bool;

    /// Increase the refund counter
    fn add_refund(&mut self, gas: u64);
    /// Decrease the refund counter
    fn sub_refund(&mut self, gas: u64);
    /// Current refund counter
    fn get_refund(&self) -> u64;

    /// Record a log
    fn add_log(&mut self, log: Log);

    /// Mark a revert point
    fn snapshot(&mut self) -> usize;
    /// Undo everything since `id`
    fn revert_to_snapshot(&mut self, id: usize);
    /// Drop the revert point `id` and every later one, keeping changes
    fn commit_snapshot(&mut self, id: usize);
}
