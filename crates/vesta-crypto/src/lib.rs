//! # vesta-crypto
//!
//! Keccak-256 hashing used by the execution engine for `KECCAK256`,
//! code hashes, contract address derivation and checkpoint hashes.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod hash;

pub use hash::{keccak256, keccak256_concat, EMPTY_CODE_HASH};
