//! Trusted checkpoints for light-client sync

use serde::{Deserialize, Serialize};
use vesta_crypto::keccak256_concat;
use vesta_primitives::H256;

/// Post-processed trie roots of a header-chain section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedCheckpoint {
    /// Section number
    pub section_index: u64,
    /// Hash of the last header in the section
    pub section_head: H256,
    /// Canonical hash trie root
    pub cht_root: H256,
    /// Bloom trie root
    pub bloom_root: H256,
}

impl TrustedCheckpoint {
    /// keccak256 over the big-endian index and the three roots
    pub fn hash(&self) -> H256 {
        let index = self.section_index.to_be_bytes();
        keccak256_concat(&[
            &index[..],
            &self.section_head.as_bytes()[..],
            &self.cht_root.as_bytes()[..],
            &self.bloom_root.as_bytes()[..],
        ])
    }

    /// A checkpoint with any zero root carries no information
    pub fn is_empty(&self) -> bool {
        self.section_head.is_zero() || self.cht_root.is_zero() || self.bloom_root.is_zero()
    }

    /// Compare against a published checkpoint hash; empty checkpoints match the zero hash
    pub fn hash_equal(&self, hash: &H256) -> bool {
        if self.is_empty() {
            return hash.is_zero();
        }
        self.hash() == *hash
    }
}
