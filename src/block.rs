//! Block validation and connection
//!
//! [`validate`] is the context-free check a node runs on any block it
//! receives. [`connect`] applies a block on top of a parent state and yields
//! the successor state, or the first failure. Connection is all-or-nothing:
//! the input state is never modified, and the new state is only built once
//! every check has passed.

use crate::active_contract_set::ActiveContractSet;
use crate::config::ChainParameters;
use crate::economic::block_reward;
use crate::ema::Ema;
use crate::error::{BlockError, Result, TransactionError};
use crate::merkle::{compute_root, transactions_root, witnesses_root};
use crate::pow::check_proof_of_work;
use crate::transaction::{check_transaction, transaction_weight, validate_in_context};
use crate::types::*;
use crate::utxo_set::{UtxoLookup, UtxoOverlay, UtxoSet};
use std::borrow::Cow;
use std::path::Path;

/// Roots committed by a block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commitments {
    pub tx_merkle_root: Hash,
    pub witness_merkle_root: Hash,
    pub active_contract_set_merkle_root: Hash,
    /// Root over the three roots followed by any extra commitments; the
    /// value of `header.commitments`.
    pub root: Hash,
}

/// Compute every commitment for `transactions` with the given contract set
/// root and extra commitments.
pub fn compute_commitments(
    transactions: &[Transaction],
    active_contract_set_merkle_root: Hash,
    extra: &[Hash],
) -> Commitments {
    let tx_merkle_root = transactions_root(transactions);
    let witness_merkle_root = witnesses_root(transactions);

    let mut leaves = Vec::with_capacity(3 + extra.len());
    leaves.push(tx_merkle_root);
    leaves.push(witness_merkle_root);
    leaves.push(active_contract_set_merkle_root);
    leaves.extend_from_slice(extra);

    Commitments {
        tx_merkle_root,
        witness_merkle_root,
        active_contract_set_merkle_root,
        root: compute_root(&leaves),
    }
}

/// Structural validation; needs no chain state.
///
/// 1. at least one transaction
/// 2. proof of work against the header's own target
/// 3. transaction and witness roots match, and `header.commitments` is the
///    root of the committed list (the contract set root is taken as given)
/// 4. coinbase shape and reward bound
/// 5. context-free checks of every other transaction
///
/// Takes the block by reference and returns nothing on success; the caller
/// keeps ownership and passes the same block on to [`connect`].
pub fn validate(params: &ChainParameters, block: &Block) -> Result<()> {
    if block.transactions.is_empty() {
        return Err(BlockError::EmptyTransactions);
    }
    if !check_proof_of_work(&block.header, params.proof_of_work_limit) {
        return Err(BlockError::ProofOfWork);
    }

    if transactions_root(&block.transactions) != block.tx_merkle_root
        || witnesses_root(&block.transactions) != block.witness_merkle_root
        || compute_root(&block.commitment_leaves()) != block.header.commitments
    {
        return Err(BlockError::CommitmentsMismatch);
    }

    let minted = check_structure(block)?;
    if minted > block_reward(params, block.header.block_number) {
        return Err(BlockError::CoinbaseRewardIncorrect);
    }
    Ok(())
}

/// Coinbase shape and per-transaction context-free checks. Returns the Zen
/// minted by the coinbase.
fn check_structure(block: &Block) -> Result<u64> {
    let Some((coinbase, rest)) = block.transactions.split_first() else {
        return Err(BlockError::EmptyTransactions);
    };
    let minted = check_coinbase(block.header.block_number, coinbase)?;

    for tx in rest {
        check_transaction(tx).map_err(|e| BlockError::transaction(tx.hash(), e))?;
    }
    Ok(minted)
}

fn invalid_coinbase(reason: &'static str) -> BlockError {
    BlockError::InvalidCoinbase(Cow::Borrowed(reason))
}

/// The coinbase has no inputs, witnesses or contract, and only Zen outputs
/// locked to this block's number.
fn check_coinbase(block_number: BlockNumber, tx: &Transaction) -> Result<u64> {
    if !tx.inputs.is_empty() {
        return Err(invalid_coinbase("coinbase transaction must not have inputs"));
    }
    if !tx.witnesses.is_empty() {
        return Err(invalid_coinbase("coinbase transaction must not have witnesses"));
    }
    if tx.contract.is_some() {
        return Err(invalid_coinbase("coinbase transaction must not carry a contract"));
    }
    if tx.outputs.is_empty() {
        return Err(invalid_coinbase("coinbase transaction has no outputs"));
    }

    let mut minted = 0u64;
    for output in &tx.outputs {
        match &output.lock {
            Lock::Coinbase {
                block_number: locked,
                ..
            } if *locked == block_number => {}
            Lock::Coinbase { .. } => {
                return Err(invalid_coinbase("coinbase lock has the wrong block number"))
            }
            _ => return Err(invalid_coinbase("coinbase output must use a coinbase lock")),
        }
        if !output.spend.asset.is_zen() {
            return Err(BlockError::CoinbaseRewardIncorrect);
        }
        minted = minted
            .checked_add(output.spend.amount)
            .ok_or(BlockError::CoinbaseRewardIncorrect)?;
    }
    Ok(minted)
}

/// State after connecting a block.
pub type Connected = (Block, UtxoSet, ActiveContractSet, Ema);

/// Apply `block` on top of `parent` and its state.
///
/// Transactions are validated in order, each seeing the effects of those
/// before it. `lookup` resolves outpoints `utxos` does not track.
/// Activated contracts record their code location under `contracts_path`.
/// Proof of work is not re-checked; see [`validate`].
#[allow(clippy::too_many_arguments)]
pub fn connect<L: UtxoLookup + ?Sized>(
    params: &ChainParameters,
    lookup: &L,
    contracts_path: &Path,
    parent: &BlockHeader,
    now: Timestamp,
    utxos: &UtxoSet,
    acs: &ActiveContractSet,
    ema: &Ema,
    block: Block,
) -> Result<Connected> {
    let block_number = block.header.block_number;
    match connect_inner(params, lookup, contracts_path, parent, now, utxos, acs, ema, &block) {
        Ok((utxos, acs, ema)) => {
            tracing::debug!(
                block_number,
                hash = %hex::encode(block.header.hash()),
                transactions = block.transactions.len(),
                contracts = acs.len(),
                "connected block"
            );
            Ok((block, utxos, acs, ema))
        }
        Err(err) => {
            tracing::warn!(block_number, error = %err, "block rejected");
            Err(err)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn connect_inner<L: UtxoLookup + ?Sized>(
    params: &ChainParameters,
    lookup: &L,
    contracts_path: &Path,
    parent: &BlockHeader,
    now: Timestamp,
    utxos: &UtxoSet,
    acs: &ActiveContractSet,
    ema: &Ema,
    block: &Block,
) -> Result<(UtxoSet, ActiveContractSet, Ema)> {
    let header = &block.header;

    if parent.block_number.checked_add(1) != Some(header.block_number) {
        return Err(BlockError::BlockNumberMismatch);
    }
    if header.parent != parent.hash() {
        return Err(BlockError::ParentMismatch);
    }

    ema.check_timestamp(params, header.timestamp, now)?;
    if header.difficulty != ema.difficulty() {
        return Err(BlockError::IncorrectDifficulty);
    }

    let minted = check_structure(block)?;

    let mut overlay = UtxoOverlay::new(utxos);
    let mut next_acs = acs.clone();
    let mut total_weight = 0u64;

    for (index, tx) in block.transactions.iter().enumerate() {
        let (hash, weight) = if index == 0 {
            let hash = tx.hash();
            let weight = transaction_weight(params, tx)
                .map_err(|e| BlockError::transaction(hash, e))?;
            (hash, weight)
        } else {
            let validated = validate_in_context(
                params,
                lookup,
                &overlay,
                &next_acs,
                contracts_path,
                header.block_number,
                tx,
            )
            .map_err(|e| BlockError::transaction(tx.hash(), e))?;
            if let Some(contract) = validated.activated {
                next_acs.add(contract)?;
            }
            (validated.hash, validated.weight)
        };

        total_weight = total_weight
            .checked_add(weight)
            .ok_or_else(|| BlockError::transaction(hash, TransactionError::Overflow))?;
        overlay.handle_transaction(lookup, &hash, tx);
    }

    if total_weight > params.max_block_weight {
        return Err(BlockError::WeightExceeded);
    }

    if minted != block_reward(params, header.block_number) {
        return Err(BlockError::CoinbaseRewardIncorrect);
    }

    next_acs.expire(header.block_number)?;
    let acs_root = next_acs.root();
    if acs_root != block.active_contract_set_merkle_root {
        return Err(BlockError::ActiveContractSetMismatch);
    }

    let commitments = compute_commitments(&block.transactions, acs_root, &block.commitments);
    if commitments.root != header.commitments
        || commitments.tx_merkle_root != block.tx_merkle_root
        || commitments.witness_merkle_root != block.witness_merkle_root
    {
        return Err(BlockError::CommitmentsMismatch);
    }

    let next_ema = ema.add(params, header.timestamp)?;
    Ok((overlay.commit(), next_acs, next_ema))
}
