//! EVM memory implementation

use crate::error::{EvmError, EvmResult};
use crate::gas::cost::{MEMORY, QUAD_COEFF_DIV};
use crate::word::to_word_size;
use primitive_types::U256;

/// Largest size whose quadratic fee still fits in u64
pub const MAX_MEMORY_SIZE: u64 = 0x1F_FFFF_FFE0;

/// EVM memory (byte-addressable, expandable)
///
/// Expansion is priced by [`Memory::cost`] first and performed by
/// [`Memory::resize`] once the fee has been paid.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    store: Vec<u8>,
    last_gas_cost: u64,
}

impl Memory {
    /// Create new empty memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Current size in bytes (always a multiple of 32)
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if memory is empty
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Total fee already paid for the current size
    pub fn last_gas_cost(&self) -> u64 {
        self.last_gas_cost
    }

    /// Marginal fee for growing to `new_size` bytes.
    ///
    /// The fee is `3 * words + words^2 / 512` minus what was already paid.
    /// Records the new total when it grows; requesting a size the memory
    /// already covers costs nothing.
    pub fn cost(&mut self, new_size: u64) -> EvmResult<u64> {
        if new_size == 0 {
            return Ok(0);
        }
        if new_size > MAX_MEMORY_SIZE {
            return Err(EvmError::GasUintOverflow);
        }
        let words = to_word_size(new_size);
        if words * 32 <= self.store.len() as u64 {
            return Ok(0);
        }

        let total = words * MEMORY + words * words / QUAD_COEFF_DIV;
        let fee = total - self.last_gas_cost;
        self.last_gas_cost = total;
        Ok(fee)
    }

    /// Grow to cover `size` bytes, rounded up to a whole word, zero-filled
    pub fn resize(&mut self, size: usize) {
        let size = (to_word_size(size as u64) * 32) as usize;
        if self.store.len() < size {
            self.store.resize(size, 0);
        }
    }

    /// Copy up to `size` bytes of `value` to `offset`.
    ///
    /// The region must already be allocated.
    pub fn set(&mut self, offset: u64, size: u64, value: &[u8]) {
        if size == 0 {
            return;
        }
        let offset = offset as usize;
        let len = (size as usize).min(value.len());
        self.store[offset..offset + len].copy_from_slice(&value[..len]);
    }

    /// Store a big-endian word at `offset`
    pub fn set32(&mut self, offset: u64, value: U256) {
        let offset = offset as usize;
        value.to_big_endian(&mut self.store[offset..offset + 32]);
    }

    /// Store the low byte of `value` at `offset`
    pub fn set_byte(&mut self, offset: u64, value: U256) {
        self.store[offset as usize] = value.low_u32() as u8;
    }

    /// Load a big-endian word from `offset`
    pub fn get32(&self, offset: u64) -> U256 {
        let offset = offset as usize;
        U256::from_big_endian(&self.store[offset..offset + 32])
    }

    /// Owned copy of `size` bytes at `offset`
    pub fn get_copy(&self, offset: u64, size: u64) -> Vec<u8> {
        self.slice(offset, size).to_vec()
    }

    /// Borrow `size` bytes at `offset`
    pub fn slice(&self, offset: u64, size: u64) -> &[u8] {
        if size == 0 {
            return &[];
        }
        let offset = offset as usize;
        &self.store[offset..offset + size as usize]
    }

    /// Get raw data slice
    pub fn data(&self) -> &[u8] {
        &self.store
    }
}
