//! Transaction wire format
//!
//! Layout:
//! - inputs: varint count, then per input tx hash (32) + index (u32)
//! - outputs: varint count, then per output lock + asset (32) + amount (u64)
//! - contract: 0, or 1 + var bytes code + var bytes hints
//! - witnesses (full encoding only): varint count, then tagged witnesses
//!
//! The transaction hash covers the encoding without witnesses, so it is
//! stable under re-signing and doubles as the signing hash.

use super::{write_var_bytes, write_varint, Reader};
use crate::constants::{MAX_INPUTS, MAX_OUTPUTS, MAX_WITNESSES};
use crate::crypto::sha256;
use crate::error::{BlockError, Result};
use crate::types::*;
use std::borrow::Cow;

/// Which parts of a transaction to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEncoding {
    /// Inputs, outputs and contract.
    WithoutWitnesses,
    /// Everything, witnesses last.
    Full,
}

const WITNESS_PK: u8 = 0;
const WITNESS_CONTRACT: u8 = 1;

pub fn serialize_transaction(tx: &Transaction, encoding: TransactionEncoding) -> Vec<u8> {
    let mut out = Vec::with_capacity(estimated_size(tx));

    write_varint(&mut out, tx.inputs.len() as u64);
    for outpoint in &tx.inputs {
        write_outpoint(&mut out, outpoint);
    }

    write_varint(&mut out, tx.outputs.len() as u64);
    for output in &tx.outputs {
        write_output(&mut out, output);
    }

    match &tx.contract {
        None => out.push(0),
        Some(contract) => {
            out.push(1);
            write_var_bytes(&mut out, &contract.code);
            write_var_bytes(&mut out, contract.hints.as_bytes());
        }
    }

    if encoding == TransactionEncoding::Full {
        write_varint(&mut out, tx.witnesses.len() as u64);
        for witness in &tx.witnesses {
            write_witness(&mut out, witness);
        }
    }

    out
}

/// Hash of the encoding without witnesses.
pub fn transaction_hash(tx: &Transaction) -> Hash {
    sha256(&serialize_transaction(
        tx,
        TransactionEncoding::WithoutWitnesses,
    ))
}

/// Hash of the full encoding.
pub fn witness_hash(tx: &Transaction) -> Hash {
    sha256(&serialize_transaction(tx, TransactionEncoding::Full))
}

/// Decode a transaction. The whole buffer must be consumed.
pub fn deserialize_transaction(data: &[u8], encoding: TransactionEncoding) -> Result<Transaction> {
    let mut reader = Reader::new(data);

    let input_count = reader.read_length(36)?;
    if input_count > MAX_INPUTS {
        return Err(too_many("inputs"));
    }
    let mut inputs = Vec::with_capacity(input_count);
    for _ in 0..input_count {
        inputs.push(Outpoint {
            tx_hash: reader.read_hash()?,
            index: reader.read_u32()?,
        });
    }

    let output_count = reader.read_length(41)?;
    if output_count > MAX_OUTPUTS {
        return Err(too_many("outputs"));
    }
    let mut outputs = Vec::with_capacity(output_count);
    for _ in 0..output_count {
        outputs.push(read_output(&mut reader)?);
    }

    let contract = match reader.read_u8()? {
        0 => None,
        1 => {
            let code = reader.read_var_bytes()?.to_vec();
            let hints = String::from_utf8(reader.read_var_bytes()?.to_vec())
                .map_err(|_| malformed("contract hints are not utf-8"))?;
            Some(Contract { code, hints })
        }
        _ => return Err(malformed("invalid contract flag")),
    };

    let witnesses = match encoding {
        TransactionEncoding::WithoutWitnesses => Vec::new(),
        TransactionEncoding::Full => {
            let count = reader.read_length(1)?;
            if count > MAX_WITNESSES {
                return Err(too_many("witnesses"));
            }
            let mut witnesses = Vec::with_capacity(count);
            for _ in 0..count {
                witnesses.push(read_witness(&mut reader)?);
            }
            witnesses
        }
    };

    reader.finish()?;

    Ok(Transaction {
        inputs,
        outputs,
        witnesses,
        contract,
    })
}

fn estimated_size(tx: &Transaction) -> usize {
    let code = tx.contract.as_ref().map_or(0, |c| c.code.len());
    16 + tx.inputs.len() * 36 + tx.outputs.len() * 80 + tx.witnesses.len() * 110 + code
}

fn write_outpoint(out: &mut Vec<u8>, outpoint: &Outpoint) {
    out.extend_from_slice(&outpoint.tx_hash);
    out.extend_from_slice(&outpoint.index.to_be_bytes());
}

fn write_output(out: &mut Vec<u8>, output: &Output) {
    write_varint(out, output.lock.identifier() as u64);
    match &output.lock {
        Lock::PK(hash) | Lock::Contract(hash) => out.extend_from_slice(hash),
        Lock::Destroy | Lock::ActivationSacrifice => {}
        Lock::Coinbase {
            block_number,
            pk_hash,
        } => {
            out.extend_from_slice(&block_number.to_be_bytes());
            out.extend_from_slice(pk_hash);
        }
        Lock::HighVLock { data, .. } => write_var_bytes(out, data),
    }
    out.extend_from_slice(&output.spend.asset.0);
    out.extend_from_slice(&output.spend.amount.to_be_bytes());
}

fn read_output(reader: &mut Reader<'_>) -> Result<Output> {
    let identifier = reader.read_varint()?;
    let lock = match identifier {
        0 => Lock::PK(reader.read_hash()?),
        1 => Lock::Contract(reader.read_hash()?),
        2 => Lock::Destroy,
        3 => Lock::Coinbase {
            block_number: reader.read_u32()?,
            pk_hash: reader.read_hash()?,
        },
        4 => Lock::ActivationSacrifice,
        5..=7 => return Err(malformed("reserved lock identifier")),
        id => Lock::HighVLock {
            identifier: u32::try_from(id).map_err(|_| malformed("lock identifier too large"))?,
            data: reader.read_var_bytes()?.to_vec(),
        },
    };
    let asset = Asset(reader.read_hash()?);
    let amount = reader.read_u64()?;
    Ok(Output {
        lock,
        spend: Spend { asset, amount },
    })
}

fn write_witness(out: &mut Vec<u8>, witness: &Witness) {
    match witness {
        Witness::PK {
            public_key,
            signature,
        } => {
            out.push(WITNESS_PK);
            write_var_bytes(out, public_key);
            write_var_bytes(out, signature);
        }
        Witness::Contract(cw) => {
            out.push(WITNESS_CONTRACT);
            out.extend_from_slice(&cw.contract_hash);
            write_var_bytes(out, cw.command.as_bytes());
            write_var_bytes(out, &cw.data);
            match cw.return_address_index {
                None => out.push(0),
                Some(index) => {
                    out.push(1);
                    out.extend_from_slice(&index.to_be_bytes());
                }
            }
            out.extend_from_slice(&cw.begin_inputs.to_be_bytes());
            out.extend_from_slice(&cw.begin_outputs.to_be_bytes());
            out.extend_from_slice(&cw.inputs_length.to_be_bytes());
            out.extend_from_slice(&cw.outputs_length.to_be_bytes());
            out.extend_from_slice(&cw.cost.to_be_bytes());
        }
    }
}

fn read_witness(reader: &mut Reader<'_>) -> Result<Witness> {
    match reader.read_u8()? {
        WITNESS_PK => Ok(Witness::PK {
            public_key: reader.read_var_bytes()?.to_vec(),
            signature: reader.read_var_bytes()?.to_vec(),
        }),
        WITNESS_CONTRACT => {
            let contract_hash = reader.read_hash()?;
            let command = String::from_utf8(reader.read_var_bytes()?.to_vec())
                .map_err(|_| malformed("contract command is not utf-8"))?;
            let data = reader.read_var_bytes()?.to_vec();
            let return_address_index = match reader.read_u8()? {
                0 => None,
                1 => Some(reader.read_u32()?),
                _ => return Err(malformed("invalid return address flag")),
            };
            Ok(Witness::Contract(ContractWitness {
                contract_hash,
                command,
                data,
                return_address_index,
                begin_inputs: reader.read_u32()?,
                begin_outputs: reader.read_u32()?,
                inputs_length: reader.read_u32()?,
                outputs_length: reader.read_u32()?,
                cost: reader.read_u64()?,
            }))
        }
        _ => Err(malformed("unknown witness tag")),
    }
}

fn malformed(reason: &'static str) -> BlockError {
    BlockError::Serialization(Cow::Borrowed(reason))
}

fn too_many(what: &'static str) -> BlockError {
    BlockError::Serialization(Cow::Owned(format!("too many {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction {
            inputs: vec![Outpoint::new([3u8; 32], 1)],
            outputs: vec![
                Output {
                    lock: Lock::PK([4u8; 32]),
                    spend: Spend::zen(1_000),
                },
                Output {
                    lock: Lock::HighVLock {
                        identifier: 9,
                        data: vec![1, 2, 3],
                    },
                    spend: Spend {
                        asset: Asset([5u8; 32]),
                        amount: 7,
                    },
                },
            ],
            witnesses: vec![Witness::PK {
                public_key: vec![2u8; 33],
                signature: vec![0u8; 64],
            }],
            contract: Some(Contract {
                code: b"code".to_vec(),
                hints: "hints".to_string(),
            }),
        }
    }

    #[test]
    fn test_full_encoding_round_trips() {
        let tx = sample();
        let bytes = serialize_transaction(&tx, TransactionEncoding::Full);
        assert_eq!(
            deserialize_transaction(&bytes, TransactionEncoding::Full).unwrap(),
            tx
        );
    }

    #[test]
    fn test_hash_ignores_witnesses() {
        let tx = sample();
        let mut resigned = tx.clone();
        resigned.witnesses = vec![Witness::PK {
            public_key: vec![3u8; 33],
            signature: vec![1u8; 64],
        }];
        assert_eq!(transaction_hash(&tx), transaction_hash(&resigned));
        assert_ne!(witness_hash(&tx), witness_hash(&resigned));
    }

    #[test]
    fn test_reserved_lock_identifier_rejected() {
        let mut bytes = Vec::new();
        write_varint(&mut bytes, 0);
        write_varint(&mut bytes, 1);
        write_varint(&mut bytes, 6);
        bytes.extend_from_slice(&[0u8; 40]);
        bytes.push(0);
        assert!(deserialize_transaction(&bytes, TransactionEncoding::WithoutWitnesses).is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = serialize_transaction(&sample(), TransactionEncoding::WithoutWitnesses);
        bytes.push(0);
        assert!(deserialize_transaction(&bytes, TransactionEncoding::WithoutWitnesses).is_err());
    }
}
