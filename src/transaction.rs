//! Transaction validation
//!
//! Two layers:
//!
//! 1. [`check_transaction`]: context-free shape checks, run by block
//!    validation for every non-coinbase transaction.
//! 2. [`validate_in_context`]: checks against a UTXO/contract snapshot at a
//!    given block number (input resolution, coinbase maturity, witnesses,
//!    asset conservation, contract activation) and the transaction weight.
//!
//! Witnesses are consumed in order against an input cursor. A PK witness
//! authorizes the input under the cursor; a contract witness authorizes the
//! `inputs_length` inputs starting there. Every input must be covered.

use crate::active_contract_set::ActiveContractSet;
use crate::config::ChainParameters;
use crate::constants::*;
use crate::crypto::{contract_hash, public_key_hash, verify_pk_witness};
use crate::economic::activation_blocks;
use crate::error::TransactionError;
use crate::serialization::{serialize_transaction, TransactionEncoding};
use crate::types::*;
use crate::utxo_set::{UtxoLookup, UtxoOverlay};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

type TxResult<T> = std::result::Result<T, TransactionError>;

/// Outcome of a successful in-context validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransaction {
    pub hash: Hash,
    pub weight: u64,
    /// Contract installed by this transaction, if it carried one.
    pub activated: Option<ActiveContract>,
}

/// Context-free checks for a non-coinbase transaction.
///
/// - inputs, outputs and witnesses are non-empty and within limits
/// - no input is listed twice
/// - no output uses a coinbase lock or a reserved `HighVLock` identifier
/// - activation sacrifices are Zen and appear iff a contract is carried
/// - PK witnesses have the right sizes
/// - contract witness slices lie within the transaction
pub fn check_transaction(tx: &Transaction) -> TxResult<()> {
    if tx.inputs.is_empty() {
        return Err(TransactionError::general("inputs empty"));
    }
    if tx.outputs.is_empty() {
        return Err(TransactionError::general("outputs empty"));
    }
    if tx.witnesses.is_empty() {
        return Err(TransactionError::general("witnesses empty"));
    }
    if tx.inputs.len() > MAX_INPUTS {
        return Err(TransactionError::general(format!(
            "too many inputs: {} > {MAX_INPUTS}",
            tx.inputs.len()
        )));
    }
    if tx.outputs.len() > MAX_OUTPUTS {
        return Err(TransactionError::general(format!(
            "too many outputs: {} > {MAX_OUTPUTS}",
            tx.outputs.len()
        )));
    }
    if tx.witnesses.len() > MAX_WITNESSES {
        return Err(TransactionError::general(format!(
            "too many witnesses: {} > {MAX_WITNESSES}",
            tx.witnesses.len()
        )));
    }

    let mut seen = HashSet::with_capacity(tx.inputs.len());
    if !tx.inputs.iter().all(|input| seen.insert(input)) {
        return Err(TransactionError::general("duplicate inputs"));
    }

    if tx.has_coinbase_lock() {
        return Err(TransactionError::general(
            "coinbase lock in non-coinbase transaction",
        ));
    }

    let mut sacrifices = 0usize;
    for output in &tx.outputs {
        if !output.lock.is_well_formed() {
            return Err(TransactionError::general(format!(
                "reserved lock identifier {}",
                output.lock.identifier()
            )));
        }
        if output.lock == Lock::ActivationSacrifice {
            if !output.spend.asset.is_zen() {
                return Err(TransactionError::general("activation sacrifice must be Zen"));
            }
            sacrifices += 1;
        }
    }

    match &tx.contract {
        Some(contract) => {
            if contract.code.is_empty() || contract.code.len() > MAX_CONTRACT_CODE_SIZE {
                return Err(TransactionError::general("contract code size out of range"));
            }
            if sacrifices == 0 {
                return Err(TransactionError::general("contract without activation sacrifice"));
            }
        }
        None if sacrifices > 0 => {
            return Err(TransactionError::general("activation sacrifice without contract"));
        }
        None => {}
    }

    for witness in &tx.witnesses {
        match witness {
            Witness::PK {
                public_key,
                signature,
            } => {
                if public_key.len() != PUBLIC_KEY_SIZE || signature.len() != SIGNATURE_SIZE {
                    return Err(TransactionError::general("malformed PK witness"));
                }
            }
            Witness::Contract(cw) => check_contract_witness_bounds(tx, cw)?,
        }
    }

    Ok(())
}

fn slice_end(begin: u32, length: u32, len: usize) -> Option<usize> {
    let end = (begin as usize).checked_add(length as usize)?;
    (end <= len).then_some(end)
}

fn check_contract_witness_bounds(tx: &Transaction, cw: &ContractWitness) -> TxResult<()> {
    if slice_end(cw.begin_inputs, cw.inputs_length, tx.inputs.len()).is_none() {
        return Err(TransactionError::general("contract witness inputs out of range"));
    }
    if slice_end(cw.begin_outputs, cw.outputs_length, tx.outputs.len()).is_none() {
        return Err(TransactionError::general("contract witness outputs out of range"));
    }
    if let Some(index) = cw.return_address_index {
        if index as usize >= tx.outputs.len() {
            return Err(TransactionError::general("return address out of range"));
        }
    }
    Ok(())
}

/// Resource weight of `tx`:
///
/// ```text
/// encoded bytes × weight_per_byte + PK witnesses × pk_witness_weight + Σ contract cost
/// ```
///
/// Depends on nothing but the transaction, so block producers can budget
/// with it before validation.
pub fn transaction_weight(params: &ChainParameters, tx: &Transaction) -> TxResult<u64> {
    let bytes = serialize_transaction(tx, TransactionEncoding::Full).len() as u64;
    let mut weight = bytes
        .checked_mul(params.weight_per_byte)
        .ok_or(TransactionError::Overflow)?;

    for witness in &tx.witnesses {
        let charge = match witness {
            Witness::PK { .. } => params.pk_witness_weight,
            Witness::Contract(cw) => cw.cost,
        };
        weight = weight
            .checked_add(charge)
            .ok_or(TransactionError::Overflow)?;
    }
    Ok(weight)
}

/// Validate a non-coinbase transaction against `utxos` and `acs` as seen by
/// block `block_number`.
///
/// Neither snapshot is modified; the caller applies the transaction once it
/// is accepted.
pub fn validate_in_context<L: UtxoLookup + ?Sized>(
    params: &ChainParameters,
    lookup: &L,
    utxos: &UtxoOverlay<'_>,
    acs: &ActiveContractSet,
    contracts_path: &Path,
    block_number: BlockNumber,
    tx: &Transaction,
) -> TxResult<ValidatedTransaction> {
    check_transaction(tx)?;
    let hash = tx.hash();

    let spent = resolve_inputs(params, lookup, utxos, block_number, tx)?;
    let minters = check_witnesses(acs, block_number, &hash, tx, &spent)?;
    check_conservation(tx, &spent, &minters)?;
    let activated = activate_contract(params, acs, contracts_path, block_number, tx)?;
    let weight = transaction_weight(params, tx)?;

    tracing::trace!(tx = %hex::encode(hash), weight, "transaction valid");

    Ok(ValidatedTransaction {
        hash,
        weight,
        activated,
    })
}

/// Outputs consumed by `tx`, in input order.
fn resolve_inputs<L: UtxoLookup + ?Sized>(
    params: &ChainParameters,
    lookup: &L,
    utxos: &UtxoOverlay<'_>,
    block_number: BlockNumber,
    tx: &Transaction,
) -> TxResult<Vec<Output>> {
    let mut spent = Vec::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        let output = match utxos.get(lookup, input) {
            OutputStatus::Unspent(output) => output,
            OutputStatus::Spent => return Err(TransactionError::DoubleSpend),
            OutputStatus::NoOutput => return Err(TransactionError::Orphan),
        };

        match &output.lock {
            Lock::Coinbase {
                block_number: created,
                ..
            } => {
                if block_number.saturating_sub(*created) < params.coinbase_maturity {
                    return Err(TransactionError::CoinbaseNotMature {
                        created: *created,
                        spent: block_number,
                    });
                }
            }
            Lock::Destroy | Lock::ActivationSacrifice | Lock::HighVLock { .. } => {
                return Err(TransactionError::general(format!(
                    "input spends unspendable lock {}",
                    output.lock.identifier()
                )));
            }
            Lock::PK(_) | Lock::Contract(_) => {}
        }
        spent.push(output);
    }
    Ok(spent)
}

/// Walk the witnesses against the input cursor. Returns the contracts
/// invoked by this transaction.
fn check_witnesses(
    acs: &ActiveContractSet,
    block_number: BlockNumber,
    tx_hash: &Hash,
    tx: &Transaction,
    spent: &[Output],
) -> TxResult<BTreeSet<Hash>> {
    let mut cursor = 0usize;
    let mut outputs_cursor = 0usize;
    let mut invoked = BTreeSet::new();

    for witness in &tx.witnesses {
        match witness {
            Witness::PK {
                public_key,
                signature,
            } => {
                let output = spent
                    .get(cursor)
                    .ok_or_else(|| TransactionError::general("witness without input"))?;
                let pk_hash = match &output.lock {
                    Lock::PK(pk_hash) | Lock::Coinbase { pk_hash, .. } => pk_hash,
                    _ => {
                        return Err(TransactionError::general(
                            "PK witness for input without PK lock",
                        ))
                    }
                };
                if public_key_hash(public_key) != *pk_hash
                    || !verify_pk_witness(public_key, signature, tx_hash)
                {
                    return Err(TransactionError::BadSignature);
                }
                cursor += 1;
            }
            Witness::Contract(cw) => {
                if cw.begin_inputs as usize != cursor {
                    return Err(TransactionError::general("contract witness out of order"));
                }
                let end = cursor + cw.inputs_length as usize;
                let owned = spent.get(cursor..end).ok_or_else(|| {
                    TransactionError::general("contract witness inputs out of range")
                })?;
                if owned
                    .iter()
                    .any(|output| output.lock != Lock::Contract(cw.contract_hash))
                {
                    return Err(TransactionError::BadContract);
                }

                if (cw.begin_outputs as usize) < outputs_cursor {
                    return Err(TransactionError::general("contract outputs overlap"));
                }
                outputs_cursor = cw.begin_outputs as usize + cw.outputs_length as usize;

                if let Some(index) = cw.return_address_index {
                    match tx.outputs.get(index as usize).map(|o| &o.lock) {
                        Some(Lock::PK(_)) => {}
                        _ => {
                            return Err(TransactionError::general(
                                "return address is not a PK lock",
                            ))
                        }
                    }
                }

                if acs.active_at(&cw.contract_hash, block_number).is_none() {
                    return Err(TransactionError::ContractNotActive);
                }

                invoked.insert(cw.contract_hash);
                cursor = end;
            }
        }
    }

    if cursor != tx.inputs.len() {
        return Err(TransactionError::general("inputs without witness"));
    }
    Ok(invoked)
}

fn sum_by_asset<'a>(spends: impl Iterator<Item = &'a Spend>) -> TxResult<BTreeMap<Asset, u64>> {
    let mut totals = BTreeMap::new();
    for spend in spends {
        let total = totals.entry(spend.asset).or_insert(0u64);
        *total = total
            .checked_add(spend.amount)
            .ok_or(TransactionError::Overflow)?;
    }
    Ok(totals)
}

/// Per asset, outputs may not exceed inputs. A contract invoked by the
/// transaction may mint the asset named by its own hash.
fn check_conservation(
    tx: &Transaction,
    spent: &[Output],
    minters: &BTreeSet<Hash>,
) -> TxResult<()> {
    let inputs = sum_by_asset(spent.iter().map(|o| &o.spend))?;
    let outputs = sum_by_asset(tx.outputs.iter().map(|o| &o.spend))?;

    for (asset, out_total) in &outputs {
        let in_total = inputs.get(asset).copied().unwrap_or(0);
        if *out_total > in_total && !minters.contains(&asset.0) {
            return Err(TransactionError::AssetConservation);
        }
    }
    Ok(())
}

/// Contract installed by `tx` at `block_number`, if it carries one.
///
/// Fails with `BadContract` when the contract is still active at
/// `block_number` or the sacrifice buys less than one block.
pub fn activate_contract(
    params: &ChainParameters,
    acs: &ActiveContractSet,
    contracts_path: &Path,
    block_number: BlockNumber,
    tx: &Transaction,
) -> TxResult<Option<ActiveContract>> {
    let Some(contract) = &tx.contract else {
        return Ok(None);
    };

    let hash = contract_hash(&contract.code);
    // A contract past its expiry may still be in the set until the block
    // prunes it; activating it again replaces the stale entry.
    if acs.active_at(&hash, block_number).is_some() {
        return Err(TransactionError::BadContract);
    }

    let sacrifice = tx
        .outputs
        .iter()
        .filter(|o| o.lock == Lock::ActivationSacrifice)
        .try_fold(0u64, |total, o| total.checked_add(o.spend.amount))
        .ok_or(TransactionError::Overflow)?;

    let size = contract.code.len() as u64;
    let blocks = activation_blocks(params, size, sacrifice);
    if blocks == 0 {
        return Err(TransactionError::BadContract);
    }
    let expiry = (block_number as u64)
        .saturating_add(blocks)
        .min(BlockNumber::MAX as u64) as BlockNumber;

    Ok(Some(ActiveContract {
        hash,
        code: contract.code.clone(),
        hints: contract.hints.clone(),
        expiry,
        size,
        code_location: contracts_path.join(hex::encode(hash)),
    }))
}
