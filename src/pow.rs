//! Proof of work: compact targets and header hash checks
//!
//! A compact target packs a 256-bit number as `exponent << 24 | mantissa`
//! with a 23-bit mantissa, value = mantissa × 256^(exponent − 3). The sign bit
//! (0x00800000) must be clear.

use crate::error::{BlockError, Result};
use crate::types::{BlockHeader, Hash};
use std::borrow::Cow;
use std::cmp::Ordering;

/// 256-bit unsigned integer, little-endian 64-bit limbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct U256([u64; 4]);

impl U256 {
    pub const ZERO: U256 = U256([0; 4]);
    pub const MAX: U256 = U256([u64::MAX; 4]);

    pub fn from_u64(value: u64) -> Self {
        U256([value, 0, 0, 0])
    }

    /// Interpret 32 bytes as a big-endian number.
    pub fn from_be_bytes(bytes: &Hash) -> Self {
        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            let start = 32 - (i + 1) * 8;
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[start..start + 8]);
            *word = u64::from_be_bytes(chunk);
        }
        U256(words)
    }

    pub fn to_be_bytes(&self) -> Hash {
        let mut bytes = [0u8; 32];
        for (i, word) in self.0.iter().enumerate() {
            let start = 32 - (i + 1) * 8;
            bytes[start..start + 8].copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }

    fn low_u64(&self) -> u64 {
        self.0[0]
    }

    /// Number of significant bits.
    pub fn bits(&self) -> u32 {
        for i in (0..4).rev() {
            if self.0[i] != 0 {
                return 64 * i as u32 + (64 - self.0[i].leading_zeros());
            }
        }
        0
    }

    pub fn shl(&self, shift: u32) -> Self {
        if shift >= 256 {
            return U256::ZERO;
        }
        let mut result = U256::ZERO;
        let word_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;
        for i in 0..4 {
            if i + word_shift < 4 {
                result.0[i + word_shift] |= self.0[i] << bit_shift;
                if bit_shift > 0 && i + word_shift + 1 < 4 {
                    result.0[i + word_shift + 1] |= self.0[i] >> (64 - bit_shift);
                }
            }
        }
        result
    }

    pub fn shr(&self, shift: u32) -> Self {
        if shift >= 256 {
            return U256::ZERO;
        }
        let mut result = U256::ZERO;
        let word_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;
        for i in word_shift..4 {
            result.0[i - word_shift] |= self.0[i] >> bit_shift;
            if bit_shift > 0 && i > word_shift {
                result.0[i - word_shift - 1] |= self.0[i] << (64 - bit_shift);
            }
        }
        result
    }

    /// Multiply by a u64, `None` on overflow.
    pub fn checked_mul_u64(&self, rhs: u64) -> Option<Self> {
        let mut carry = 0u128;
        let mut result = U256::ZERO;
        for i in 0..4 {
            let product = (self.0[i] as u128) * (rhs as u128) + carry;
            result.0[i] = product as u64;
            carry = product >> 64;
        }
        if carry > 0 {
            None
        } else {
            Some(result)
        }
    }

    /// Integer division by a u64, `None` when dividing by zero.
    pub fn checked_div_u64(&self, rhs: u64) -> Option<Self> {
        if rhs == 0 {
            return None;
        }
        let mut remainder = 0u128;
        let mut result = U256::ZERO;
        for i in (0..4).rev() {
            let dividend = (remainder << 64) | self.0[i] as u128;
            result.0[i] = (dividend / rhs as u128) as u64;
            remainder = dividend % rhs as u128;
        }
        Some(result)
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        for i in (0..4).rev() {
            match self.0[i].cmp(&other.0[i]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn malformed(bits: u32) -> BlockError {
    BlockError::Serialization(Cow::Owned(format!("malformed compact target {bits:#010x}")))
}

/// Expand a compact target to its 256-bit value.
///
/// Negative, zero and overflowing encodings are rejected.
pub fn expand_target(bits: u32) -> Result<U256> {
    let exponent = bits >> 24;
    let mantissa = bits & 0x007f_ffff;

    if bits & 0x0080_0000 != 0 || mantissa == 0 || exponent > 32 {
        return Err(malformed(bits));
    }

    // exponent <= 32 and a 23-bit mantissa always fit in 256 bits.
    let target = if exponent <= 3 {
        U256::from_u64(mantissa as u64).shr(8 * (3 - exponent))
    } else {
        U256::from_u64(mantissa as u64).shl(8 * (exponent - 3))
    };

    if target.is_zero() {
        return Err(malformed(bits));
    }
    Ok(target)
}

/// Compress a 256-bit target to compact form, truncating low-order bits.
pub fn compress_target(target: &U256) -> u32 {
    if target.is_zero() {
        return 0;
    }

    let mut size = target.bits().div_ceil(8);
    let mut compact = if size <= 3 {
        (target.low_u64() << (8 * (3 - size))) as u32
    } else {
        target.shr(8 * (size - 3)).low_u64() as u32
    };

    // Keep the sign bit clear by moving one byte into the exponent.
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }

    (size << 24) | (compact & 0x007f_ffff)
}

/// True iff the header hash does not exceed its own target and that target
/// is no easier than `proof_of_work_limit`.
pub fn check_proof_of_work(header: &BlockHeader, proof_of_work_limit: u32) -> bool {
    let Ok(target) = expand_target(header.difficulty) else {
        return false;
    };
    let Ok(limit) = expand_target(proof_of_work_limit) else {
        return false;
    };
    if target > limit {
        return false;
    }
    U256::from_be_bytes(&header.hash()) <= target
}

/// Scale a compact target by `numerator / denominator`, clamped to
/// `[1, proof_of_work_limit]`.
pub fn scale_target(
    bits: u32,
    numerator: u64,
    denominator: u64,
    proof_of_work_limit: u32,
) -> Result<u32> {
    let target = expand_target(bits)?;
    let limit = expand_target(proof_of_work_limit)?;
    let division_by_zero =
        || BlockError::Serialization(Cow::Borrowed("target scaled by zero denominator"));

    let scaled = match target.checked_mul_u64(numerator) {
        Some(product) => product
            .checked_div_u64(denominator)
            .ok_or_else(division_by_zero)?,
        None => target
            .checked_div_u64(denominator)
            .ok_or_else(division_by_zero)?
            .checked_mul_u64(numerator)
            .unwrap_or(U256::MAX),
    };

    let clamped = if scaled > limit {
        limit
    } else if scaled.is_zero() {
        U256::from_u64(1)
    } else {
        scaled
    };
    Ok(compress_target(&clamped))
}
