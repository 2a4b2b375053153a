//! Common error types for primitives

use crate::address::AddressError;
use crate::hash::HashError;
use thiserror::Error;

/// Primitive parsing error
#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// Address error
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// Hash error
    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    /// Numeric quantity could not be parsed as a 256-bit value
    #[error("invalid quantity: {0:?}")]
    InvalidQuantity(String),
}

/// Parse a 256-bit quantity written either as `0x`-prefixed hex or as decimal.
///
/// An empty string is zero.
pub fn parse_quantity(s: &str) -> Result<primitive_types::U256, PrimitiveError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(primitive_types::U256::zero());
    }
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(digits) if digits.is_empty() => Ok(primitive_types::U256::zero()),
        Some(digits) => primitive_types::U256::from_str_radix(digits, 16).map_err(|_| ()),
        None => primitive_types::U256::from_dec_str(s).map_err(|_| ()),
    };
    parsed.map_err(|_| PrimitiveError::InvalidQuantity(s.to_string()))
}
