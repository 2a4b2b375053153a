//! 256-bit word arithmetic
//!
//! All operations wrap modulo 2^256. Signed variants interpret words as
//! two's complement.

use primitive_types::{U256, U512};

/// Word with only the sign bit set
const SIGN_BIT: usize = 255;

/// Convert a boolean to 0 / 1
pub fn bool_word(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}

/// The word as u64, or `None` if it does not fit
pub fn as_u64(value: &U256) -> Option<u64> {
    if value.bits() > 64 {
        None
    } else {
        Some(value.low_u64())
    }
}

/// The word as u64, saturating at `u64::MAX`
pub fn saturating_u64(value: &U256) -> u64 {
    as_u64(value).unwrap_or(u64::MAX)
}

/// Number of 32-byte words needed to hold `size` bytes
pub fn to_word_size(size: u64) -> u64 {
    if size > u64::MAX - 31 {
        return u64::MAX / 32 + 1;
    }
    (size + 31) / 32
}

fn is_negative(value: &U256) -> bool {
    value.bit(SIGN_BIT)
}

fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs(value: U256) -> U256 {
    if is_negative(&value) {
        negate(value)
    } else {
        value
    }
}

fn low_u256(value: U512) -> U256 {
    let U512(ref limbs) = value;
    U256([limbs[0], limbs[1], limbs[2], limbs[3]])
}

/// Signed division, zero divisor yields zero
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let quotient = abs(a) / abs(b);
    if is_negative(&a) != is_negative(&b) {
        negate(quotient)
    } else {
        quotient
    }
}

/// Signed modulo, result takes the sign of the dividend
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let rem = abs(a) % abs(b);
    if is_negative(&a) {
        negate(rem)
    } else {
        rem
    }
}

/// (a + b) mod n without intermediate overflow
pub fn addmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    low_u256((U512::from(a) + U512::from(b)) % U512::from(n))
}

/// (a * b) mod n without intermediate overflow
pub fn mulmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    low_u256(a.full_mul(b) % U512::from(n))
}

/// base^exponent mod 2^256
pub fn exp(base: U256, exponent: U256) -> U256 {
    base.overflowing_pow(exponent).0
}

/// Extend the sign of the `byte`-th least significant byte of `value`
pub fn signextend(byte: U256, value: U256) -> U256 {
    if byte >= U256::from(31) {
        return value;
    }
    let bit = byte.low_u64() as usize * 8 + 7;
    let mask = (U256::one() << bit) - U256::one();
    if value.bit(bit) {
        value | !mask
    } else {
        value & mask
    }
}

/// The `index`-th byte counting from the most significant end
pub fn byte(index: U256, value: U256) -> U256 {
    if index >= U256::from(32) {
        return U256::zero();
    }
    U256::from(value.byte(31 - index.low_u64() as usize))
}

/// Logical shift left
pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        return U256::zero();
    }
    value << shift.low_u64() as usize
}

/// Logical shift right
pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        return U256::zero();
    }
    value >> shift.low_u64() as usize
}

/// Arithmetic shift right
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(&value);
    if shift >= U256::from(256) {
        return if negative { U256::MAX } else { U256::zero() };
    }
    let shift = shift.low_u64() as usize;
    if negative {
        !((!value) >> shift)
    } else {
        value >> shift
    }
}

/// Signed less-than
pub fn slt(a: &U256, b: &U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// Signed greater-than
pub fn sgt(a: &U256, b: &U256) -> bool {
    slt(b, a)
}
