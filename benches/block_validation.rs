//! Block validation and connection benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use std::path::Path;
use zen_consensus::block::{connect, validate};
use zen_consensus::crypto::public_key_hash;
use zen_consensus::mining::{create_template, mine_block};
use zen_consensus::types::*;
use zen_consensus::utxo_set::NoStorage;
use zen_consensus::{ActiveContractSet, ChainParameters, Ema, UtxoSet};

const SPENDS: u8 = 50;

struct Fixture {
    params: ChainParameters,
    parent: BlockHeader,
    utxos: UtxoSet,
    ema: Ema,
    block: Block,
}

fn fixture() -> Fixture {
    let params = ChainParameters::local();
    let secret = SecretKey::from_slice(&[1u8; 32]).unwrap();
    let public = PublicKey::from_secret_key(SECP256K1, &secret).serialize().to_vec();
    let lock = Lock::PK(public_key_hash(&public));

    let funding: Vec<(Outpoint, Output)> = (0..SPENDS)
        .map(|i| {
            (
                Outpoint::new([i; 32], 0),
                Output {
                    lock: lock.clone(),
                    spend: Spend::zen(1_000),
                },
            )
        })
        .collect();

    let transactions: Vec<Transaction> = funding
        .iter()
        .map(|(outpoint, output)| {
            let mut tx = Transaction {
                inputs: vec![*outpoint],
                outputs: vec![output.clone()],
                witnesses: vec![],
                contract: None,
            };
            let message = Message::from_digest(tx.hash());
            tx.witnesses = vec![Witness::PK {
                public_key: public.clone(),
                signature: SECP256K1
                    .sign_ecdsa(&message, &secret)
                    .serialize_compact()
                    .to_vec(),
            }];
            tx
        })
        .collect();

    let parent = BlockHeader {
        version: 0,
        parent: ZERO_HASH,
        block_number: 0,
        commitments: ZERO_HASH,
        timestamp: params.genesis_time,
        difficulty: params.initial_difficulty,
        nonce: (0, 0),
    };
    let ema = Ema::create(&params);
    let template = create_template(
        &params,
        &parent,
        params.genesis_time + params.block_interval,
        &ema,
        &ActiveContractSet::empty(),
        &transactions,
        0,
        [7u8; 32],
    )
    .unwrap();
    let (block, _) = mine_block(template, 1_000_000).unwrap();

    Fixture {
        params,
        parent,
        utxos: UtxoSet::from_unspent(funding),
        ema,
        block,
    }
}

fn benchmark_validate(c: &mut Criterion) {
    let f = fixture();
    c.bench_function("validate_block_50_tx", |b| {
        b.iter(|| black_box(validate(&f.params, black_box(&f.block))))
    });
}

fn benchmark_connect(c: &mut Criterion) {
    let f = fixture();
    let acs = ActiveContractSet::empty();
    c.bench_function("connect_block_50_tx", |b| {
        b.iter(|| {
            black_box(connect(
                &f.params,
                &NoStorage,
                Path::new("contracts"),
                &f.parent,
                f.block.header.timestamp,
                &f.utxos,
                &acs,
                &f.ema,
                f.block.clone(),
            ))
        })
    });
}

criterion_group!(benches, benchmark_validate, benchmark_connect);
criterion_main!(benches);
