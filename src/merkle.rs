//! Binary Merkle tree over an ordered list of hashes
//!
//! Leaves and interior nodes are hashed with distinct prefixes and an odd
//! node at the end of a level is promoted unchanged, so a root commits to
//! both the leaf values and the leaf count. This rules out the
//! duplicate-last-leaf mutation that plagues Bitcoin-style trees.
//!
//! The empty list has the all-zero root.

use crate::types::{Hash, ZERO_HASH};
use sha2::{Digest, Sha256};

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

fn hash_leaf(leaf: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(leaf);
    hasher.finalize().into()
}

fn hash_node(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Merkle root of `leaves`, order-sensitive.
pub fn compute_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return ZERO_HASH;
    }

    let mut level: Vec<Hash> = leaves.iter().map(hash_leaf).collect();

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_node(left, right),
                [single] => *single,
                _ => unreachable!("chunks(2) yields one or two items"),
            })
            .collect();
    }

    level[0]
}

/// Merkle root over the hashes of `transactions`.
pub fn transactions_root(transactions: &[crate::types::Transaction]) -> Hash {
    let hashes: Vec<Hash> = transactions.iter().map(|tx| tx.hash()).collect();
    compute_root(&hashes)
}

/// Merkle root over the witness hashes of `transactions`.
pub fn witnesses_root(transactions: &[crate::types::Transaction]) -> Hash {
    let hashes: Vec<Hash> = transactions.iter().map(|tx| tx.witness_hash()).collect();
    compute_root(&hashes)
}
