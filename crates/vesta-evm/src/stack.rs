//! EVM stack implementation

use crate::error::{EvmError, EvmResult};
use crate::gas::cost::STACK_LIMIT;
use primitive_types::U256;

/// EVM stack (max 1024 items, 256-bit each)
#[derive(Clone, Debug)]
pub struct Stack {
    data: Vec<U256>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(STACK_LIMIT),
        }
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: U256) -> EvmResult<()> {
        if self.data.len() >= STACK_LIMIT {
            return Err(EvmError::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Pop a value from the stack
    pub fn pop(&mut self) -> EvmResult<U256> {
        self.data.pop().ok_or(EvmError::StackUnderflow)
    }

    /// Peek at the top of the stack
    pub fn peek(&self) -> EvmResult<&U256> {
        self.data.last().ok_or(EvmError::StackUnderflow)
    }

    /// Item `n` below the top (0 = top)
    pub fn back(&self, n: usize) -> EvmResult<&U256> {
        if n >= self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        Ok(&self.data[self.data.len() - 1 - n])
    }

    /// Swap top with item at depth (1 = swap with second item)
    pub fn swap(&mut self, depth: usize) -> EvmResult<()> {
        if depth == 0 || depth >= self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        let len = self.data.len();
        self.data.swap(len - 1, len - 1 - depth);
        Ok(())
    }

    /// Duplicate item at depth to top (1 = dup top)
    pub fn dup(&mut self, depth: usize) -> EvmResult<()> {
        if depth == 0 || depth > self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        let value = self.data[self.data.len() - depth];
        self.push(value)
    }

    /// Get current stack size
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Items bottom to top
    pub fn data(&self) -> &[U256] {
        &self.data
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

// Stack requirements per operation. An operation popping `pop` items and
// pushing `push` items runs only if `min <= len <= max`.

/// Largest stack an operation may start with without overflowing
pub const fn max_stack(pop: usize, push: usize) -> usize {
    STACK_LIMIT + pop - push
}

/// Smallest stack an operation may start with without underflowing
pub const fn min_stack(pops: usize, _push: usize) -> usize {
    pops
}

/// Lower bound for a swap touching `n` items
pub const fn min_swap_stack(n: usize) -> usize {
    min_stack(n, n)
}

/// Upper bound for a swap touching `n` items
pub const fn max_swap_stack(n: usize) -> usize {
    max_stack(n, n)
}

/// Lower bound for DUPn
pub const fn min_dup_stack(n: usize) -> usize {
    min_stack(n, n + 1)
}

/// Upper bound for DUPn
pub const fn max_dup_stack(n: usize) -> usize {
    max_stack(n, n + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn test_push_pop() {
        let mut stack = Stack::new();
        stack.push(word(1)).unwrap();
        stack.push(word(2)).unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap(), word(2));
        assert_eq!(stack.pop().unwrap(), word(1));
        assert_eq!(stack.pop(), Err(EvmError::StackUnderflow));
    }

    #[test]
    fn test_overflow_at_limit() {
        let mut stack = Stack::new();
        for i in 0..STACK_LIMIT {
            stack.push(word(i as u64)).unwrap();
        }
        assert_eq!(stack.push(word(0)), Err(EvmError::StackOverflow));
        assert_eq!(stack.dup(1), Err(EvmError::StackOverflow));
        assert_eq!(stack.len(), STACK_LIMIT);
    }

    #[test]
    fn test_back() {
        let mut stack = Stack::new();
        stack.push(word(1)).unwrap();
        stack.push(word(2)).unwrap();
        assert_eq!(*stack.back(0).unwrap(), word(2));
        assert_eq!(*stack.back(1).unwrap(), word(1));
        assert!(stack.back(2).is_err());
        assert_eq!(*stack.peek().unwrap(), word(2));
    }

    #[test]
    fn test_swap() {
        let mut stack = Stack::new();
        for v in 1..=3 {
            stack.push(word(v)).unwrap();
        }
        stack.swap(2).unwrap();
        assert_eq!(stack.data(), &[word(3), word(2), word(1)]);
        assert_eq!(stack.swap(3), Err(EvmError::StackUnderflow));
        assert_eq!(stack.swap(0), Err(EvmError::StackUnderflow));
    }

    #[test]
    fn test_dup() {
        let mut stack = Stack::new();
        stack.push(word(7)).unwrap();
        stack.push(word(8)).unwrap();
        stack.dup(2).unwrap();
        assert_eq!(*stack.peek().unwrap(), word(7));
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.dup(4), Err(EvmError::StackUnderflow));
    }

    // ==================== Stack table ====================

    #[test]
    fn test_bounds() {
        // binary op: pops 2, pushes 1
        assert_eq!(min_stack(2, 1), 2);
        assert_eq!(max_stack(2, 1), 1025);
        // push: pops 0, pushes 1
        assert_eq!(max_stack(0, 1), 1023);
        // SWAP1 touches 2 items
        assert_eq!(min_swap_stack(2), 2);
        assert_eq!(max_swap_stack(2), 1024);
        // DUP1
        assert_eq!(min_dup_stack(1), 1);
        assert_eq!(max_dup_stack(1), 1023);
    }
}
