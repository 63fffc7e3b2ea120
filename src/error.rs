//! Error types for consensus validation
//!
//! Every failure the core can produce is a value of [`BlockError`]. Failures
//! attributable to a single transaction are wrapped in
//! [`BlockError::Transaction`] together with the offending transaction hash,
//! so the rendered message always names the transaction.

use crate::types::Hash;
use std::borrow::Cow;
use thiserror::Error;

/// Why a single transaction was rejected.
///
/// The `Display` output is the tag followed by any detail, e.g.
/// `General output value overflow` or `Orphan`.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum TransactionError {
    #[error("General {0}")]
    General(Cow<'static, str>),

    /// An input references an output this node cannot resolve yet.
    #[error("Orphan")]
    Orphan,

    #[error("DoubleSpend")]
    DoubleSpend,

    #[error("BadContract")]
    BadContract,

    #[error("ContractNotActive")]
    ContractNotActive,

    #[error("BadSignature")]
    BadSignature,

    #[error("CoinbaseNotMature created at block {created} spent at block {spent}")]
    CoinbaseNotMature { created: u32, spent: u32 },

    #[error("AssetConservation")]
    AssetConservation,

    #[error("Overflow")]
    Overflow,
}

impl TransactionError {
    pub fn general(detail: impl Into<Cow<'static, str>>) -> Self {
        TransactionError::General(detail.into())
    }
}

/// Block-level validation or connection failure.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum BlockError {
    #[error("transactions is empty")]
    EmptyTransactions,

    #[error("proof of work failed")]
    ProofOfWork,

    #[error("incorrect proof of work difficulty")]
    IncorrectDifficulty,

    #[error("commitments mismatch")]
    CommitmentsMismatch,

    #[error("blockNumber mismatch")]
    BlockNumberMismatch,

    #[error("parent hash mismatch")]
    ParentMismatch,

    #[error("block's timestamp is too early")]
    TimestampTooEarly,

    #[error("block timestamp too far in the future")]
    TimestampTooFarInFuture,

    #[error("block reward is incorrect")]
    CoinbaseRewardIncorrect,

    #[error("{0}")]
    InvalidCoinbase(Cow<'static, str>),

    #[error("transactions weight is greater than maximum block weight")]
    WeightExceeded,

    #[error("active contract set merkle root mismatch")]
    ActiveContractSetMismatch,

    /// The sparse Merkle store behind the active contract set failed.
    #[error("active contract set error: {0}")]
    ActiveContractSet(Cow<'static, str>),

    #[error("transaction {} failed validation due to {error}", hex::encode(.hash))]
    Transaction { hash: Hash, error: TransactionError },

    #[error("serialization error: {0}")]
    Serialization(Cow<'static, str>),
}

impl BlockError {
    pub fn transaction(hash: Hash, error: TransactionError) -> Self {
        BlockError::Transaction { hash, error }
    }

    /// Orphan failures are the only category a caller may retry once the
    /// missing ancestor arrives; everything else is terminal for the block.
    pub fn is_orphan(&self) -> bool {
        matches!(
            self,
            BlockError::Transaction {
                error: TransactionError::Orphan,
                ..
            }
        )
    }

    /// Hash of the offending transaction, if the failure names one.
    pub fn transaction_hash(&self) -> Option<&Hash> {
        match self {
            BlockError::Transaction { hash, .. } => Some(hash),
            _ => None,
        }
    }
}

pub type Result<T, E = BlockError> = std::result::Result<T, E>;
