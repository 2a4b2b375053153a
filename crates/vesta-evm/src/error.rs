//! EVM error types

use bytes::Bytes;
use primitive_types::U256;
use thiserror::Error;

/// Reasons a frame stops without success.
///
/// Every variant except [`EvmError::Revert`] consumes all gas handed to the
/// failing frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    /// Out of gas
    #[error("out of gas")]
    OutOfGas,

    /// Stack underflow
    #[error("stack underflow")]
    StackUnderflow,

    /// Stack overflow
    #[error("stack limit reached 1024")]
    StackOverflow,

    /// Invalid jump destination
    #[error("invalid jump destination: {0}")]
    InvalidJump(U256),

    /// Undefined or not-yet-activated opcode
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// Gas or memory arithmetic left the u64 range
    #[error("gas uint64 overflow")]
    GasUintOverflow,

    /// State modification inside a static call
    #[error("write protection")]
    WriteProtection,

    /// RETURNDATACOPY past the end of the return buffer
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,

    /// Contract creation collision
    #[error("contract address collision")]
    ContractAddressCollision,

    /// Deployed code above the size limit
    #[error("max code size exceeded")]
    MaxCodeSizeExceeded,

    /// Deployed code starting with 0xEF
    #[error("invalid code: must not begin with 0xef")]
    InvalidCode,

    /// Not enough gas left to pay for the deployed code
    #[error("contract creation code storage out of gas")]
    CodeStoreOutOfGas,

    /// Call depth exceeded
    #[error("max call depth exceeded")]
    CallDepthExceeded,

    /// Insufficient balance for transfer
    #[error("insufficient balance for transfer")]
    InsufficientBalance,

    /// Sender nonce at `u64::MAX`
    #[error("nonce uint64 overflow")]
    NonceUintOverflow,

    /// SSTORE with no more than the call stipend left
    #[error("not enough gas for reentrancy sentry")]
    ReentrancySentry,

    /// REVERT with data, remaining gas is returned to the caller
    #[error("execution reverted")]
    Revert(Bytes),
}

impl EvmError {
    /// Whether the frame ended by REVERT
    pub fn is_revert(&self) -> bool {
        matches!(self, EvmError::Revert(_))
    }
}

/// Result type for EVM operations
pub type EvmResult<T> = Result<T, EvmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(EvmError::OutOfGas.to_string(), "out of gas");
        assert_eq!(EvmError::StackOverflow.to_string(), "stack limit reached 1024");
        assert_eq!(EvmError::InvalidJump(U256::from(100)).to_string(), "invalid jump destination: 100");
        assert_eq!(EvmError::InvalidOpcode(0xFE).to_string(), "invalid opcode: 0xfe");
        assert_eq!(EvmError::GasUintOverflow.to_string(), "gas uint64 overflow");
        assert_eq!(
            EvmError::ReentrancySentry.to_string(),
            "not enough gas for reentrancy sentry"
        );
    }

    #[test]
    fn test_error_revert() {
        let err = EvmError::Revert(Bytes::from_static(&[1, 2, 3]));
        assert_eq!(err.to_string(), "execution reverted");
        assert!(err.is_revert());
        assert!(!EvmError::OutOfGas.is_revert());
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(EvmError::OutOfGas, EvmError::OutOfGas);
        assert_ne!(EvmError::OutOfGas, EvmError::StackUnderflow);
        assert_ne!(
            EvmError::InvalidJump(U256::from(10)),
            EvmError::InvalidJump(U256::from(20))
        );
    }
}
