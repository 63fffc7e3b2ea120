//! Canonical wire format serialization/deserialization
//!
//! Every hash in the chain is taken over these encodings, so they must be
//! byte-identical across implementations. Fixed-width integers are
//! big-endian; list and byte-string lengths use [`varint`].

pub mod block;
pub mod transaction;
pub mod varint;

pub use block::{block_header_hash, deserialize_block_header, serialize_block_header};
pub use transaction::{
    deserialize_transaction, serialize_transaction, transaction_hash, witness_hash,
    TransactionEncoding,
};
pub use varint::{decode_varint, encode_varint, write_varint, VarIntError};

use crate::error::{BlockError, Result};
use crate::types::Hash;
use std::borrow::Cow;

/// Cursor over an encoded buffer.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Reader { data, offset: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| truncated(len))?;
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        let mut word = [0u8; 4];
        word.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_be_bytes(word))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        let mut word = [0u8; 8];
        word.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_be_bytes(word))
    }

    pub(crate) fn read_hash(&mut self) -> Result<Hash> {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(self.read_bytes(32)?);
        Ok(hash)
    }

    pub(crate) fn read_varint(&mut self) -> Result<u64> {
        let (value, consumed) = decode_varint(&self.data[self.offset..])?;
        self.offset += consumed;
        Ok(value)
    }

    /// Read a length prefix, refusing lengths that cannot fit in what is
    /// left of the buffer assuming `min_item_size` bytes per item.
    pub(crate) fn read_length(&mut self, min_item_size: usize) -> Result<usize> {
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| truncated(usize::MAX))?;
        if len.saturating_mul(min_item_size.max(1)) > self.remaining() {
            return Err(truncated(len));
        }
        Ok(len)
    }

    pub(crate) fn read_var_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_length(1)?;
        self.read_bytes(len)
    }

    pub(crate) fn finish(self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(BlockError::Serialization(Cow::Owned(format!(
                "{} trailing bytes",
                self.remaining()
            ))));
        }
        Ok(())
    }
}

fn truncated(wanted: usize) -> BlockError {
    BlockError::Serialization(Cow::Owned(format!(
        "unexpected end of data reading {wanted} bytes"
    )))
}

pub(crate) fn write_var_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}
