//! Consensus constants that do not vary between chains.
//!
//! Chain-dependent values (rewards, weights, EMA tuning) live in
//! [`crate::config::ChainParameters`].

/// Lock identifiers below this value belong to the built-in lock kinds.
pub const RESERVED_LOCK_IDENTIFIERS: u32 = 8;

/// Serialized block header size in bytes:
/// version 4 + parent 32 + block number 4 + commitments 32 + timestamp 8
/// + difficulty 4 + nonce 16.
pub const BLOCK_HEADER_SIZE: usize = 100;

/// Current block header version.
pub const BLOCK_VERSION: u32 = 0;

/// Maximum number of inputs per transaction
pub const MAX_INPUTS: usize = 10_000;

/// Maximum number of outputs per transaction
pub const MAX_OUTPUTS: usize = 10_000;

/// Maximum number of witnesses per transaction
pub const MAX_WITNESSES: usize = 10_000;

/// Size of a compressed secp256k1 public key.
pub const PUBLIC_KEY_SIZE: usize = 33;

/// Size of a compact secp256k1 signature.
pub const SIGNATURE_SIZE: usize = 64;

/// Maximum contract code size in bytes.
pub const MAX_CONTRACT_CODE_SIZE: usize = 1_000_000;

/// Default number of timestamps kept by the EMA window.
pub const DEFAULT_EMA_WINDOW: usize = 11;

/// Bound on how far the observed block interval may stray from the target
/// interval, as a factor in both directions.
pub const MAX_INTERVAL_FACTOR: u64 = 4;

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1_000;
