//! Shared builders for integration tests
//!
//! Included from test files with `mod test_helpers;`. Provides signing keys,
//! transaction builders, a small in-memory chain that mines and connects
//! blocks, and proptest strategies for the data model.

#![allow(dead_code)]

use proptest::prelude::*;
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use std::path::{Path, PathBuf};
use zen_consensus::block::{compute_commitments, connect, validate};
use zen_consensus::constants::{BLOCK_VERSION, RESERVED_LOCK_IDENTIFIERS};
use zen_consensus::crypto::public_key_hash;
use zen_consensus::mining::{create_template, mine_block, MiningResult};
use zen_consensus::types::*;
use zen_consensus::utxo_set::NoStorage;
use zen_consensus::{ActiveContractSet, BlockError, ChainParameters, Ema, UtxoSet};

// ============================================================================
// Keys and transactions
// ============================================================================

pub struct Key {
    pub secret: SecretKey,
    pub public: Vec<u8>,
}

impl Key {
    pub fn new(seed: u8) -> Self {
        let secret = SecretKey::from_slice(&[seed.max(1); 32]).expect("valid secret key");
        let public = PublicKey::from_secret_key(SECP256K1, &secret)
            .serialize()
            .to_vec();
        Key { secret, public }
    }

    pub fn pk_hash(&self) -> Hash {
        public_key_hash(&self.public)
    }

    pub fn lock(&self) -> Lock {
        Lock::PK(self.pk_hash())
    }

    pub fn witness(&self, tx: &Transaction) -> Witness {
        let message = Message::from_digest(tx.hash());
        Witness::PK {
            public_key: self.public.clone(),
            signature: SECP256K1
                .sign_ecdsa(&message, &self.secret)
                .serialize_compact()
                .to_vec(),
        }
    }
}

pub fn zen_output(lock: Lock, amount: u64) -> Output {
    Output {
        lock,
        spend: Spend::zen(amount),
    }
}

/// Spend `inputs` (all owned by `key`) into `outputs`, one PK witness per input.
pub fn signed_tx(key: &Key, inputs: Vec<Outpoint>, outputs: Vec<Output>) -> Transaction {
    let mut tx = Transaction {
        inputs,
        outputs,
        witnesses: vec![],
        contract: None,
    };
    let witness = key.witness(&tx);
    tx.witnesses = vec![witness; tx.inputs.len()];
    tx
}

/// Structurally valid transaction spending a made-up outpoint.
pub fn dummy_tx(seed: u8) -> Transaction {
    let key = Key::new(1);
    signed_tx(
        &key,
        vec![Outpoint::new([seed; 32], 0)],
        vec![zen_output(key.lock(), seed as u64 + 1)],
    )
}

// ============================================================================
// Chain harness
// ============================================================================

pub fn genesis_header(params: &ChainParameters) -> BlockHeader {
    BlockHeader {
        version: BLOCK_VERSION,
        parent: ZERO_HASH,
        block_number: 0,
        commitments: ZERO_HASH,
        timestamp: params.genesis_time,
        difficulty: params.initial_difficulty,
        nonce: (0, 0),
    }
}

/// Outpoint of a seeded genesis output.
pub fn seeded(index: u8) -> Outpoint {
    Outpoint::new([0xee; 32], index as u32)
}

/// Chain tip plus state, advanced one connected block at a time.
pub struct TestChain {
    pub params: ChainParameters,
    pub tip: BlockHeader,
    pub utxos: UtxoSet,
    pub acs: ActiveContractSet,
    pub ema: Ema,
    pub miner: Key,
    pub contracts_path: PathBuf,
}

impl TestChain {
    pub fn new(params: ChainParameters) -> Self {
        Self::with_outputs(params, vec![])
    }

    /// Chain whose genesis state holds `outputs` at [`seeded`] outpoints.
    pub fn with_outputs(params: ChainParameters, outputs: Vec<Output>) -> Self {
        let utxos = UtxoSet::from_unspent(
            outputs
                .into_iter()
                .enumerate()
                .map(|(i, output)| (seeded(i as u8), output)),
        );
        TestChain {
            tip: genesis_header(&params),
            ema: Ema::create(&params),
            params,
            utxos,
            acs: ActiveContractSet::empty(),
            miner: Key::new(200),
            contracts_path: PathBuf::from("contracts"),
        }
    }

    pub fn next_timestamp(&self) -> Timestamp {
        self.tip.timestamp + self.params.block_interval
    }

    /// Unmined template on the current tip.
    pub fn template(&self, transactions: Vec<Transaction>) -> Block {
        create_template(
            &self.params,
            &self.tip,
            self.next_timestamp(),
            &self.ema,
            &self.acs,
            &transactions,
            0,
            self.miner.pk_hash(),
        )
        .expect("template")
    }

    /// Connect `block` against the current state without advancing.
    pub fn try_connect(
        &self,
        block: Block,
    ) -> Result<(Block, UtxoSet, ActiveContractSet, Ema), BlockError> {
        connect(
            &self.params,
            &NoStorage,
            Path::new(&self.contracts_path),
            &self.tip,
            block.header.timestamp,
            &self.utxos,
            &self.acs,
            &self.ema,
            block,
        )
    }

    /// Connect and, on success, make `block` the new tip.
    pub fn apply(&mut self, block: Block) -> Result<Block, BlockError> {
        let (block, utxos, acs, ema) = self.try_connect(block)?;
        self.tip = block.header.clone();
        self.utxos = utxos;
        self.acs = acs;
        self.ema = ema;
        Ok(block)
    }

    /// Template, mine, validate and connect a block with `transactions`.
    pub fn mine(&mut self, transactions: Vec<Transaction>) -> Result<Block, BlockError> {
        let block = seal(self.template(transactions));
        validate(&self.params, &block)?;
        self.apply(block)
    }

    /// Mine empty blocks until the tip is at `block_number`.
    pub fn mine_until(&mut self, block_number: BlockNumber) {
        while self.tip.block_number < block_number {
            self.mine(vec![]).expect("empty block connects");
        }
    }
}

/// Find a nonce satisfying the block's target.
pub fn seal(block: Block) -> Block {
    let (block, result) = mine_block(block, 1_000_000).expect("well-formed target");
    assert_eq!(result, MiningResult::Success);
    block
}

/// Recompute every commitment after editing transactions, then re-mine.
pub fn reseal(mut block: Block) -> Block {
    let commitments = compute_commitments(
        &block.transactions,
        block.active_contract_set_merkle_root,
        &block.commitments,
    );
    block.tx_merkle_root = commitments.tx_merkle_root;
    block.witness_merkle_root = commitments.witness_merkle_root;
    block.header.commitments = commitments.root;
    seal(block)
}

pub fn local_params() -> ChainParameters {
    ChainParameters::local()
}

// ============================================================================
// Proptest strategies
// ============================================================================

pub fn arb_hash() -> impl Strategy<Value = Hash> {
    any::<[u8; 32]>()
}

pub fn arb_asset() -> impl Strategy<Value = Asset> {
    prop_oneof![Just(Asset::ZEN), arb_hash().prop_map(Asset)]
}

/// Any lock a non-coinbase transaction may create. `HighVLock` never reuses a
/// reserved identifier.
pub fn arb_lock() -> impl Strategy<Value = Lock> {
    prop_oneof![
        arb_hash().prop_map(Lock::PK),
        arb_hash().prop_map(Lock::Contract),
        Just(Lock::Destroy),
        (
            RESERVED_LOCK_IDENTIFIERS..u32::MAX,
            prop::collection::vec(any::<u8>(), 0..32)
        )
            .prop_map(|(identifier, data)| Lock::HighVLock { identifier, data }),
    ]
}

pub fn arb_output() -> impl Strategy<Value = Output> {
    (arb_lock(), arb_asset(), any::<u64>()).prop_map(|(lock, asset, amount)| Output {
        lock,
        spend: Spend { asset, amount },
    })
}

pub fn arb_outpoint() -> impl Strategy<Value = Outpoint> {
    (arb_hash(), any::<u32>()).prop_map(|(tx_hash, index)| Outpoint { tx_hash, index })
}

pub fn arb_pk_witness() -> impl Strategy<Value = Witness> {
    (
        prop::collection::vec(any::<u8>(), 33),
        prop::collection::vec(any::<u8>(), 64),
    )
        .prop_map(|(public_key, signature)| Witness::PK {
            public_key,
            signature,
        })
}

/// Transactions with unique inputs and one PK witness per input; they pass
/// the context-free checks.
pub fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (
        prop::collection::btree_set(arb_outpoint(), 1..4),
        prop::collection::vec(arb_output(), 1..4),
    )
        .prop_flat_map(|(inputs, outputs)| {
            let count = inputs.len();
            (
                Just(inputs.into_iter().collect::<Vec<_>>()),
                Just(outputs),
                prop::collection::vec(arb_pk_witness(), count),
            )
        })
        .prop_map(|(inputs, outputs, witnesses)| Transaction {
            inputs,
            outputs,
            witnesses,
            contract: None,
        })
}

pub fn arb_header() -> impl Strategy<Value = BlockHeader> {
    (
        any::<u32>(),
        arb_hash(),
        any::<u32>(),
        arb_hash(),
        any::<u64>(),
        any::<u32>(),
        any::<(u64, u64)>(),
    )
        .prop_map(
            |(version, parent, block_number, commitments, timestamp, difficulty, nonce)| {
                BlockHeader {
                    version,
                    parent,
                    block_number,
                    commitments,
                    timestamp,
                    difficulty,
                    nonce,
                }
            },
        )
}
