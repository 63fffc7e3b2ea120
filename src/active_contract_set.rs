//! Active contract set
//!
//! Authenticated dictionary from contract hash to [`ActiveContract`], backed
//! by a sparse Merkle tree keyed by the contract hash. The root depends only
//! on the set's contents, never on insertion order, so every node arrives at
//! the same `activeContractSetMerkleRoot` for the same contracts.

use crate::error::{BlockError, Result};
use crate::types::{ActiveContract, BlockNumber, Hash, ZERO_HASH};
use sha2::{Digest, Sha256};
use sparse_merkle_tree::default_store::DefaultStore;
use sparse_merkle_tree::traits::{Hasher, Value};
use sparse_merkle_tree::{MerkleProof, SparseMerkleTree, H256};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// SHA-256 hasher for the contract tree.
#[derive(Default, Clone, Debug)]
pub struct ContractHasher {
    hasher: Sha256,
}

impl Hasher for ContractHasher {
    fn write_h256(&mut self, h: &H256) {
        self.hasher.update(h.as_slice());
    }

    fn write_byte(&mut self, b: u8) {
        self.hasher.update([b]);
    }

    fn finish(self) -> H256 {
        let hash: Hash = self.hasher.finalize().into();
        H256::from(hash)
    }
}

/// Leaf value: digest of the committed contract fields.
///
/// The zero digest marks an absent leaf; storing it deletes the key.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ContractLeaf(Hash);

impl ContractLeaf {
    fn of(contract: &ActiveContract) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(contract.hash);
        hasher.update(contract.expiry.to_be_bytes());
        hasher.update(contract.size.to_be_bytes());
        hasher.update(contract.hints.as_bytes());
        ContractLeaf(hasher.finalize().into())
    }
}

impl Value for ContractLeaf {
    fn to_h256(&self) -> H256 {
        H256::from(self.0)
    }

    fn zero() -> Self {
        ContractLeaf(ZERO_HASH)
    }
}

type ContractTree = SparseMerkleTree<ContractHasher, ContractLeaf, DefaultStore<ContractLeaf>>;

fn tree_error(op: &'static str, err: impl fmt::Debug) -> BlockError {
    BlockError::ActiveContractSet(Cow::Owned(format!("{op} failed: {err:?}")))
}

fn to_hash(h: &H256) -> Hash {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(h.as_slice());
    hash
}

pub struct ActiveContractSet {
    contracts: BTreeMap<Hash, ActiveContract>,
    tree: ContractTree,
}

impl ActiveContractSet {
    pub fn empty() -> Self {
        ActiveContractSet {
            contracts: BTreeMap::new(),
            tree: SparseMerkleTree::new(H256::zero(), DefaultStore::default()),
        }
    }

    /// Insert or replace a contract.
    pub fn add(&mut self, contract: ActiveContract) -> Result<()> {
        self.tree
            .update(H256::from(contract.hash), ContractLeaf::of(&contract))
            .map_err(|e| tree_error("insert", e))?;
        self.contracts.insert(contract.hash, contract);
        Ok(())
    }

    /// Remove a contract, returning it if present.
    pub fn remove(&mut self, hash: &Hash) -> Result<Option<ActiveContract>> {
        if !self.contracts.contains_key(hash) {
            return Ok(None);
        }
        self.tree
            .update(H256::from(*hash), ContractLeaf::zero())
            .map_err(|e| tree_error("remove", e))?;
        Ok(self.contracts.remove(hash))
    }

    /// Drop every contract with `expiry < block_number`.
    ///
    /// Returns the hashes removed, in ascending order.
    pub fn expire(&mut self, block_number: BlockNumber) -> Result<Vec<Hash>> {
        let expired: Vec<Hash> = self
            .contracts
            .values()
            .filter(|c| c.expiry < block_number)
            .map(|c| c.hash)
            .collect();
        for hash in &expired {
            self.remove(hash)?;
        }
        if !expired.is_empty() {
            tracing::debug!(block_number, count = expired.len(), "expired contracts");
        }
        Ok(expired)
    }

    pub fn get(&self, hash: &Hash) -> Option<&ActiveContract> {
        self.contracts.get(hash)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.contracts.contains_key(hash)
    }

    /// Contract usable at `block_number`, i.e. present and not yet expired.
    pub fn active_at(&self, hash: &Hash, block_number: BlockNumber) -> Option<&ActiveContract> {
        self.contracts
            .get(hash)
            .filter(|c| c.expiry >= block_number)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Contracts ordered by hash.
    pub fn iter(&self) -> impl Iterator<Item = &ActiveContract> {
        self.contracts.values()
    }

    /// Committed root; all-zero for the empty set.
    pub fn root(&self) -> Hash {
        to_hash(self.tree.root())
    }

    /// Membership (or non-membership) proof for `hashes` against [`Self::root`].
    pub fn merkle_proof(&self, hashes: &[Hash]) -> Result<MerkleProof> {
        let keys = hashes.iter().map(|h| H256::from(*h)).collect();
        self.tree
            .merkle_proof(keys)
            .map_err(|e| tree_error("proof", e))
    }
}

impl Default for ActiveContractSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl Clone for ActiveContractSet {
    fn clone(&self) -> Self {
        ActiveContractSet {
            contracts: self.contracts.clone(),
            tree: SparseMerkleTree::new(*self.tree.root(), self.tree.store().clone()),
        }
    }
}

impl PartialEq for ActiveContractSet {
    fn eq(&self, other: &Self) -> bool {
        self.root() == other.root() && self.contracts == other.contracts
    }
}

impl Eq for ActiveContractSet {}

impl fmt::Debug for ActiveContractSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveContractSet")
            .field("root", &hex::encode(self.root()))
            .field(
                "contracts",
                &self.contracts.keys().map(hex::encode).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn contract(seed: u8, expiry: BlockNumber) -> ActiveContract {
        let code = vec![seed; 16];
        ActiveContract {
            hash: crate::crypto::contract_hash(&code),
            size: code.len() as u64,
            code,
            hints: String::new(),
            expiry,
            code_location: PathBuf::from("contracts"),
        }
    }

    #[test]
    fn test_empty_root_is_zero() {
        assert_eq!(ActiveContractSet::empty().root(), ZERO_HASH);
    }

    #[test]
    fn test_root_independent_of_insertion_order() {
        let (a, b, c) = (contract(1, 10), contract(2, 20), contract(3, 30));

        let mut first = ActiveContractSet::empty();
        for x in [&a, &b, &c] {
            first.add(x.clone()).unwrap();
        }
        let mut second = ActiveContractSet::empty();
        for x in [&c, &a, &b] {
            second.add(x.clone()).unwrap();
        }

        assert_ne!(first.root(), ZERO_HASH);
        assert_eq!(first.root(), second.root());
        assert_eq!(first, second);
    }

    #[test]
    fn test_remove_restores_previous_root() {
        let mut acs = ActiveContractSet::empty();
        acs.add(contract(1, 10)).unwrap();
        let root = acs.root();

        let extra = contract(2, 10);
        acs.add(extra.clone()).unwrap();
        assert_ne!(acs.root(), root);

        assert!(acs.remove(&extra.hash).unwrap().is_some());
        assert_eq!(acs.root(), root);
        assert!(acs.remove(&extra.hash).unwrap().is_none());
    }

    #[test]
    fn test_expire_drops_only_past_expiry() {
        let mut acs = ActiveContractSet::empty();
        let stale = contract(1, 9);
        let edge = contract(2, 10);
        acs.add(stale.clone()).unwrap();
        acs.add(edge.clone()).unwrap();
        let before = acs.root();

        let removed = acs.expire(10).unwrap();
        assert_eq!(removed, vec![stale.hash]);
        assert!(!acs.contains(&stale.hash));
        assert!(acs.contains(&edge.hash));
        assert_ne!(acs.root(), before);

        acs.expire(11).unwrap();
        assert!(acs.is_empty());
        assert_eq!(acs.root(), ZERO_HASH);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut acs = ActiveContractSet::empty();
        acs.add(contract(1, 10)).unwrap();
        let snapshot = acs.clone();
        acs.add(contract(2, 10)).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_ne!(snapshot.root(), acs.root());
    }

    #[test]
    fn test_active_at_respects_expiry() {
        let mut acs = ActiveContractSet::empty();
        let c = contract(1, 10);
        acs.add(c.clone()).unwrap();
        assert!(acs.active_at(&c.hash, 10).is_some());
        assert!(acs.active_at(&c.hash, 11).is_none());
    }

    #[test]
    fn test_merkle_proof_generation() {
        let mut acs = ActiveContractSet::empty();
        let c = contract(1, 10);
        acs.add(c.clone()).unwrap();
        assert!(acs.merkle_proof(&[c.hash]).is_ok());
        assert!(acs.merkle_proof(&[[9u8; 32]]).is_ok());
    }
}
