//! Block header wire format serialization/deserialization
//!
//! The header is exactly [`BLOCK_HEADER_SIZE`] bytes and its double SHA-256 is
//! the block hash checked against the proof-of-work target.

use super::Reader;
use crate::constants::BLOCK_HEADER_SIZE;
use crate::crypto::hash256;
use crate::error::{BlockError, Result};
use crate::types::*;
use std::borrow::Cow;

/// Serialize a block header
///
/// Layout (integers big-endian):
/// - Version (4 bytes)
/// - Parent hash (32 bytes)
/// - Block number (4 bytes)
/// - Commitments (32 bytes)
/// - Timestamp (8 bytes)
/// - Difficulty (4 bytes, compact target)
/// - Nonce (2 × 8 bytes)
pub fn serialize_block_header(header: &BlockHeader) -> [u8; BLOCK_HEADER_SIZE] {
    let mut out = [0u8; BLOCK_HEADER_SIZE];
    out[0..4].copy_from_slice(&header.version.to_be_bytes());
    out[4..36].copy_from_slice(&header.parent);
    out[36..40].copy_from_slice(&header.block_number.to_be_bytes());
    out[40..72].copy_from_slice(&header.commitments);
    out[72..80].copy_from_slice(&header.timestamp.to_be_bytes());
    out[80..84].copy_from_slice(&header.difficulty.to_be_bytes());
    out[84..92].copy_from_slice(&header.nonce.0.to_be_bytes());
    out[92..100].copy_from_slice(&header.nonce.1.to_be_bytes());
    out
}

/// Deserialize a block header; `data` must be exactly one header.
pub fn deserialize_block_header(data: &[u8]) -> Result<BlockHeader> {
    if data.len() != BLOCK_HEADER_SIZE {
        return Err(BlockError::Serialization(Cow::Owned(format!(
            "block header must be {BLOCK_HEADER_SIZE} bytes, got {}",
            data.len()
        ))));
    }

    let mut reader = Reader::new(data);
    let header = BlockHeader {
        version: reader.read_u32()?,
        parent: reader.read_hash()?,
        block_number: reader.read_u32()?,
        commitments: reader.read_hash()?,
        timestamp: reader.read_u64()?,
        difficulty: reader.read_u32()?,
        nonce: (reader.read_u64()?, reader.read_u64()?),
    };
    reader.finish()?;
    Ok(header)
}

/// Block hash: double SHA-256 of the serialized header.
pub fn block_header_hash(header: &BlockHeader) -> Hash {
    hash256(&serialize_block_header(header))
}
