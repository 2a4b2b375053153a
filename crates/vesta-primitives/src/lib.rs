//! # vesta-primitives
//!
//! Primitive types shared by the Vesta execution engine crates.
//!
//! - [`Address`]: 20-byte account address
//! - [`H256`]: 32-byte hash / storage word
//! - [`U256`]: 256-bit unsigned integer (re-exported from `primitive-types`)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;

pub use address::{Address, AddressError};
pub use error::{parse_quantity, PrimitiveError};
pub use hash::{HashError, H256};

pub use primitive_types::U256;

/// Block height type
pub type BlockHeight = u64;

/// Gas type
pub type Gas = u64;
