//! VarInt encoding/decoding
//!
//! Compact length prefix used for every list and byte string in the
//! transaction encoding. It uses 1-9 bytes depending on the value.
//!
//! Encoding rules:
//! - If value < 0xfd: single byte
//! - If value <= 0xffff: 0xfd prefix + 2 bytes (little-endian)
//! - If value <= 0xffffffff: 0xfe prefix + 4 bytes (little-endian)
//! - Otherwise: 0xff prefix + 8 bytes (little-endian)
//!
//! Non-minimal encodings are rejected so every value has exactly one
//! encoding, which keeps transaction hashes unique.

use crate::error::{BlockError, Result};
use std::borrow::Cow;

/// Error type for VarInt encoding/decoding failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarIntError {
    /// Insufficient bytes to decode VarInt
    InsufficientBytes,
    /// Value encoded with a longer prefix than necessary
    NonCanonical,
}

impl std::fmt::Display for VarIntError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarIntError::InsufficientBytes => write!(f, "Insufficient bytes to decode VarInt"),
            VarIntError::NonCanonical => write!(f, "Non-canonical VarInt encoding"),
        }
    }
}

impl std::error::Error for VarIntError {}

impl From<VarIntError> for BlockError {
    fn from(err: VarIntError) -> Self {
        BlockError::Serialization(Cow::Owned(err.to_string()))
    }
}

/// Encode a u64 value as a VarInt
///
/// # Examples
///
/// ```
/// use zen_consensus::serialization::varint::encode_varint;
///
/// assert_eq!(encode_varint(0), vec![0]);
/// assert_eq!(encode_varint(252), vec![252]);
/// assert_eq!(encode_varint(253), vec![0xfd, 253, 0]);
/// assert_eq!(encode_varint(65536), vec![0xfe, 0, 0, 1, 0]);
/// ```
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    write_varint(&mut out, value);
    out
}

/// Append the VarInt encoding of `value` to `out`.
pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        out.push(value as u8);
    } else if value <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        out.push(0xfe);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Decode a VarInt, returning the value and the number of bytes consumed.
///
/// ```
/// use zen_consensus::serialization::varint::decode_varint;
///
/// assert_eq!(decode_varint(&[252]).unwrap(), (252, 1));
/// assert_eq!(decode_varint(&[0xfd, 253, 0]).unwrap(), (253, 3));
/// assert!(decode_varint(&[0xfd, 1, 0]).is_err());
/// assert!(decode_varint(&[]).is_err());
/// ```
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let first = *data.first().ok_or(VarIntError::InsufficientBytes)?;

    let (value, consumed, minimum) = match first {
        b if b < 0xfd => return Ok((b as u64, 1)),
        0xfd => {
            let bytes = data.get(1..3).ok_or(VarIntError::InsufficientBytes)?;
            (u16::from_le_bytes([bytes[0], bytes[1]]) as u64, 3, 0xfd)
        }
        0xfe => {
            let bytes = data.get(1..5).ok_or(VarIntError::InsufficientBytes)?;
            let mut word = [0u8; 4];
            word.copy_from_slice(bytes);
            (u32::from_le_bytes(word) as u64, 5, 0x1_0000)
        }
        _ => {
            let bytes = data.get(1..9).ok_or(VarIntError::InsufficientBytes)?;
            let mut word = [0u8; 8];
            word.copy_from_slice(bytes);
            (u64::from_le_bytes(word), 9, 0x1_0000_0000)
        }
    };

    if value < minimum {
        return Err(VarIntError::NonCanonical.into());
    }
    Ok((value, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        for value in [0u64, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000, u64::MAX] {
            let encoded = encode_varint(value);
            assert_eq!(decode_varint(&encoded).unwrap(), (value, encoded.len()));
        }
    }

    #[test]
    fn test_non_canonical_rejected() {
        assert!(decode_varint(&[0xfe, 0xff, 0xff, 0, 0]).is_err());
        assert!(decode_varint(&[0xff, 1, 0, 0, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_truncated_rejected() {
        assert!(decode_varint(&[0xfe, 0, 0]).is_err());
    }
}
