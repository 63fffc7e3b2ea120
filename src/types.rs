//! Core types for consensus validation

use crate::constants::RESERVED_LOCK_IDENTIFIERS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// The all-zero hash, root of an empty tree.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Height of a block in the chain.
pub type BlockNumber = u32;

/// Milliseconds since the UNIX epoch.
pub type Timestamp = u64;

/// Asset identifier.
///
/// Assets minted by a contract are identified by that contract's hash; the
/// native asset is the all-zero identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Asset(pub Hash);

impl Asset {
    /// The native Zen asset.
    pub const ZEN: Asset = Asset(ZERO_HASH);

    pub fn is_zen(&self) -> bool {
        *self == Asset::ZEN
    }
}

/// An amount of one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spend {
    pub asset: Asset,
    pub amount: u64,
}

impl Spend {
    pub fn zen(amount: u64) -> Self {
        Spend {
            asset: Asset::ZEN,
            amount,
        }
    }
}

/// Spending condition attached to an output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lock {
    /// Spendable by the holder of the public key hashing to this value.
    PK(Hash),
    /// Owned by the contract with this hash.
    Contract(Hash),
    /// Provably unspendable.
    Destroy,
    /// Block reward, spendable by `pk_hash` once mature.
    Coinbase {
        block_number: BlockNumber,
        pk_hash: Hash,
    },
    /// Burned to pay for activating the contract carried by the transaction.
    ActivationSacrifice,
    /// Extension point for future lock kinds. `identifier` is never below
    /// [`RESERVED_LOCK_IDENTIFIERS`].
    HighVLock { identifier: u32, data: Vec<u8> },
}

impl Lock {
    /// Wire identifier of the lock kind.
    pub fn identifier(&self) -> u32 {
        match self {
            Lock::PK(_) => 0,
            Lock::Contract(_) => 1,
            Lock::Destroy => 2,
            Lock::Coinbase { .. } => 3,
            Lock::ActivationSacrifice => 4,
            Lock::HighVLock { identifier, .. } => *identifier,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        matches!(self, Lock::Coinbase { .. })
    }

    /// A `HighVLock` that reuses a reserved identifier is malformed.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Lock::HighVLock { identifier, .. } => *identifier >= RESERVED_LOCK_IDENTIFIERS,
            _ => true,
        }
    }
}

/// Transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Output {
    pub lock: Lock,
    pub spend: Spend,
}

/// Reference to an output of a prior transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Outpoint {
    pub tx_hash: Hash,
    pub index: u32,
}

impl Outpoint {
    pub fn new(tx_hash: Hash, index: u32) -> Self {
        Outpoint { tx_hash, index }
    }
}

/// Authorization for invoking a contract from a transaction.
///
/// `begin_inputs..begin_inputs + inputs_length` are the inputs the contract
/// owns, `begin_outputs..begin_outputs + outputs_length` the outputs it
/// produced. `cost` is the declared execution cost added to the weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractWitness {
    pub contract_hash: Hash,
    pub command: String,
    pub data: Vec<u8>,
    /// Index of a PK-locked output that receives anything returned to the caller.
    pub return_address_index: Option<u32>,
    pub begin_inputs: u32,
    pub begin_outputs: u32,
    pub inputs_length: u32,
    pub outputs_length: u32,
    pub cost: u64,
}

/// Input authorization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Witness {
    /// Compressed secp256k1 public key and compact signature over the
    /// transaction hash. Authorizes exactly one input.
    PK {
        public_key: Vec<u8>,
        signature: Vec<u8>,
    },
    Contract(ContractWitness),
}

/// Contract code carried by an activation transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contract {
    pub code: Vec<u8>,
    pub hints: String,
}

/// Transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<Outpoint>,
    pub outputs: Vec<Output>,
    pub witnesses: Vec<Witness>,
    pub contract: Option<Contract>,
}

impl Transaction {
    /// Hash over inputs, outputs and contract; witnesses excluded.
    /// This is also the message every PK witness signs.
    pub fn hash(&self) -> Hash {
        crate::serialization::transaction::transaction_hash(self)
    }

    /// Hash over the full encoding including witnesses.
    pub fn witness_hash(&self) -> Hash {
        crate::serialization::transaction::witness_hash(self)
    }

    /// A coinbase has no inputs or witnesses and only coinbase-locked outputs.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
            && self.witnesses.is_empty()
            && !self.outputs.is_empty()
            && self.outputs.iter().all(|o| o.lock.is_coinbase())
    }

    pub fn has_coinbase_lock(&self) -> bool {
        self.outputs.iter().any(|o| o.lock.is_coinbase())
    }
}

/// Block header. Field order and widths are the wire layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub parent: Hash,
    pub block_number: BlockNumber,
    pub commitments: Hash,
    pub timestamp: Timestamp,
    /// Compact target.
    pub difficulty: u32,
    pub nonce: (u64, u64),
}

impl BlockHeader {
    /// Double SHA-256 of the fixed-width header encoding.
    pub fn hash(&self) -> Hash {
        crate::serialization::block::block_header_hash(self)
    }
}

/// Block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    /// Commitments beyond the three roots, appended after them.
    pub commitments: Vec<Hash>,
    pub tx_merkle_root: Hash,
    pub witness_merkle_root: Hash,
    pub active_contract_set_merkle_root: Hash,
}

impl Block {
    /// The full committed list: the three roots followed by any extras.
    pub fn commitment_leaves(&self) -> Vec<Hash> {
        let mut leaves = Vec::with_capacity(3 + self.commitments.len());
        leaves.push(self.tx_merkle_root);
        leaves.push(self.witness_merkle_root);
        leaves.push(self.active_contract_set_merkle_root);
        leaves.extend_from_slice(&self.commitments);
        leaves
    }
}

/// A contract installed in the active contract set.
///
/// Lives in the set until a block numbered above `expiry` is connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveContract {
    pub hash: Hash,
    pub code: Vec<u8>,
    pub hints: String,
    pub expiry: BlockNumber,
    /// Code size in bytes.
    pub size: u64,
    /// Where the executor finds the compiled code. Node-local, so it is not
    /// part of the committed value.
    pub code_location: PathBuf,
}

/// Result of resolving an outpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputStatus {
    Unspent(Output),
    Spent,
    /// Unknown to this node; the referencing transaction is an orphan.
    NoOutput,
}
