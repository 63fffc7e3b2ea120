//! Hashing primitive and signature verification
//!
//! SHA-256 is the single hash primitive behind every commitment in the
//! chain: transaction hashes, Merkle nodes, contract hashes and the active
//! contract set tree. Block headers use double SHA-256.

use crate::types::Hash;
use sha2::{Digest, Sha256};

pub mod signature;

pub use signature::verify_pk_witness;

/// SHA-256 of `data`.
#[inline]
pub fn sha256(data: &[u8]) -> Hash {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// SHA-256 applied twice.
#[inline]
pub fn hash256(data: &[u8]) -> Hash {
    sha256(&sha256(data))
}

/// Hash of contract code; the contract's identity.
pub fn contract_hash(code: &[u8]) -> Hash {
    sha256(code)
}

/// Hash of a serialized public key, the value a `PK` lock commits to.
pub fn public_key_hash(public_key: &[u8]) -> Hash {
    sha256(public_key)
}
