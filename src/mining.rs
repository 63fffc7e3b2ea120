//! Block templates and nonce search
//!
//! Not consensus-critical: producers use these to assemble blocks that
//! [`crate::block::validate`] and [`crate::block::connect`] accept.

use crate::active_contract_set::ActiveContractSet;
use crate::block::compute_commitments;
use crate::config::ChainParameters;
use crate::constants::BLOCK_VERSION;
use crate::economic::block_reward;
use crate::ema::Ema;
use crate::error::{BlockError, Result};
use crate::pow::{expand_target, U256};
use crate::transaction::{activate_contract, check_transaction, transaction_weight};
use crate::types::*;
use std::path::Path;

/// Result of mining attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningResult {
    Success,
    Failure,
}

/// Coinbase paying the full reward of `block_number` to `pk_hash`.
pub fn create_coinbase(
    params: &ChainParameters,
    block_number: BlockNumber,
    pk_hash: Hash,
) -> Transaction {
    Transaction {
        inputs: vec![],
        outputs: vec![Output {
            lock: Lock::Coinbase {
                block_number,
                pk_hash,
            },
            spend: Spend::zen(block_reward(params, block_number)),
        }],
        witnesses: vec![],
        contract: None,
    }
}

/// Assemble a block on top of `parent`.
///
/// Transactions are taken in order. Any that fail the context-free checks,
/// re-activate a contract, or no longer fit under the maximum block weight
/// are skipped. They are not validated against the UTXO set. `extra_seed`
/// goes into the first nonce word so concurrent producers search disjoint
/// nonce spaces.
#[allow(clippy::too_many_arguments)]
pub fn create_template(
    params: &ChainParameters,
    parent: &BlockHeader,
    timestamp: Timestamp,
    ema: &Ema,
    acs: &ActiveContractSet,
    transactions: &[Transaction],
    extra_seed: u64,
    coinbase_pk_hash: Hash,
) -> Result<Block> {
    let block_number = parent.block_number.saturating_add(1);
    let coinbase = create_coinbase(params, block_number, coinbase_pk_hash);

    let mut weight = transaction_weight(params, &coinbase)
        .map_err(|e| BlockError::transaction(coinbase.hash(), e))?;
    let mut next_acs = acs.clone();
    let mut selected = vec![coinbase];

    for tx in transactions {
        if check_transaction(tx).is_err() {
            continue;
        }
        let Some(total) = transaction_weight(params, tx)
            .ok()
            .and_then(|w| weight.checked_add(w))
            .filter(|total| *total <= params.max_block_weight)
        else {
            continue;
        };
        let Ok(activated) = activate_contract(params, &next_acs, Path::new(""), block_number, tx)
        else {
            continue;
        };
        if let Some(contract) = activated {
            next_acs.add(contract)?;
        }
        weight = total;
        selected.push(tx.clone());
    }

    next_acs.expire(block_number)?;
    let commitments = compute_commitments(&selected, next_acs.root(), &[]);

    tracing::debug!(
        block_number,
        transactions = selected.len(),
        weight,
        "created block template"
    );

    Ok(Block {
        header: BlockHeader {
            version: BLOCK_VERSION,
            parent: parent.hash(),
            block_number,
            commitments: commitments.root,
            timestamp,
            difficulty: ema.difficulty(),
            nonce: (extra_seed, 0),
        },
        transactions: selected,
        commitments: vec![],
        tx_merkle_root: commitments.tx_merkle_root,
        witness_merkle_root: commitments.witness_merkle_root,
        active_contract_set_merkle_root: commitments.active_contract_set_merkle_root,
    })
}

/// Search the second nonce word for a header hash within the block's
/// target, trying at most `max_attempts` values.
pub fn mine_block(mut block: Block, max_attempts: u64) -> Result<(Block, MiningResult)> {
    let target = expand_target(block.header.difficulty)?;

    for nonce in 0..max_attempts {
        block.header.nonce.1 = nonce;
        if U256::from_be_bytes(&block.header.hash()) <= target {
            return Ok((block, MiningResult::Success));
        }
    }

    Ok((block, MiningResult::Failure))
}
