//! # zen-consensus
//!
//! Consensus core of a UTXO chain with embedded contracts.
//!
//! Every function here is deterministic and side-effect free: state (the
//! unspent outputs, the active contract set, the difficulty estimator) is
//! passed in explicitly and successor state is returned, so all nodes given
//! the same inputs reach the same verdict.
//!
//! ## Layout
//!
//! - [`block`]: structural validation and state transition of blocks
//! - [`transaction`]: per-transaction checks and weight
//! - [`utxo_set`], [`active_contract_set`], [`ema`]: the chain state
//! - [`merkle`], [`pow`], [`serialization`], [`crypto`]: primitives
//! - [`mining`]: block templates for producers
//!
//! ## Usage
//!
//! ```rust
//! use zen_consensus::{ChainParameters, ConsensusCore};
//! use zen_consensus::types::*;
//!
//! let core = ConsensusCore::new(ChainParameters::local());
//! let tx = Transaction {
//!     inputs: vec![],
//!     outputs: vec![],
//!     witnesses: vec![],
//!     contract: None,
//! };
//! assert!(core.check_transaction(&tx).is_err());
//! ```

pub mod active_contract_set;
pub mod block;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod economic;
pub mod ema;
pub mod error;
pub mod merkle;
pub mod mining;
pub mod pow;
pub mod serialization;
pub mod transaction;
pub mod types;
pub mod utxo_set;

pub use active_contract_set::ActiveContractSet;
pub use block::Connected;
pub use config::{chain_parameters, init_chain_parameters, Chain, ChainParameters};
pub use ema::Ema;
pub use error::{BlockError, Result, TransactionError};
pub use utxo_set::{UtxoLookup, UtxoOverlay, UtxoSet};

use std::path::Path;
use types::{Block, BlockHeader, BlockNumber, Hash, Timestamp, Transaction};

/// Consensus entry points bound to one set of chain parameters.
#[derive(Debug, Clone)]
pub struct ConsensusCore {
    params: ChainParameters,
}

impl ConsensusCore {
    pub fn new(params: ChainParameters) -> Self {
        Self { params }
    }

    /// Core using the process-wide parameters.
    pub fn from_global() -> Self {
        Self::new(chain_parameters())
    }

    pub fn params(&self) -> &ChainParameters {
        &self.params
    }

    /// Estimator state at genesis.
    pub fn genesis_ema(&self) -> Ema {
        Ema::create(&self.params)
    }

    pub fn block_reward(&self, block_number: BlockNumber) -> u64 {
        economic::block_reward(&self.params, block_number)
    }

    /// Context-free checks of a non-coinbase transaction.
    pub fn check_transaction(
        &self,
        tx: &Transaction,
    ) -> std::result::Result<(), TransactionError> {
        transaction::check_transaction(tx)
    }

    /// See [`block::validate`]; the block stays with the caller.
    pub fn validate_block(&self, block: &Block) -> Result<()> {
        block::validate(&self.params, block)
    }

    /// See [`block::connect`].
    #[allow(clippy::too_many_arguments)]
    pub fn connect_block<L: UtxoLookup + ?Sized>(
        &self,
        lookup: &L,
        contracts_path: &Path,
        parent: &BlockHeader,
        now: Timestamp,
        utxos: &UtxoSet,
        acs: &ActiveContractSet,
        ema: &Ema,
        block: Block,
    ) -> Result<Connected> {
        block::connect(
            &self.params,
            lookup,
            contracts_path,
            parent,
            now,
            utxos,
            acs,
            ema,
            block,
        )
    }

    /// See [`mining::create_template`].
    #[allow(clippy::too_many_arguments)]
    pub fn create_template(
        &self,
        parent: &BlockHeader,
        timestamp: Timestamp,
        ema: &Ema,
        acs: &ActiveContractSet,
        transactions: &[Transaction],
        extra_seed: u64,
        coinbase_pk_hash: Hash,
    ) -> Result<Block> {
        mining::create_template(
            &self.params,
            parent,
            timestamp,
            ema,
            acs,
            transactions,
            extra_seed,
            coinbase_pk_hash,
        )
    }
}

impl Default for ConsensusCore {
    fn default() -> Self {
        Self::from_global()
    }
}
