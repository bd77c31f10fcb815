// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use criterion::Criterion;
use ed25519_dalek::Keypair;
use rand::{thread_rng, RngCore};

use rivtx::config::ValidationConstants;
use rivtx::crypto::{self, CryptoHash, PublicKey};
use rivtx::data::basics::{BlockHeight, Currency, Timestamp, UnlockHash};
use rivtx::data::transactions::*;
use rivtx::data::unlock::{Condition, Fulfillment, KeyMaterial};
use rivtx::protocol::{Codec, TRANSACTION_VERSION_ONE};

fn new_kp() -> Keypair {
    let mut seed = [0; 32];
    thread_rng().fill_bytes(&mut seed);
    crypto::keypair_from_seed(&seed).unwrap()
}

/// A signed transaction spending ten outputs of one key, and the outputs it spends.
fn signed_transaction(registry: &TransactionRegistry) -> (Transaction, OutputSet) {
    let kp = new_kp();
    let owner = Condition::from(UnlockHash::from_public_key(&PublicKey::from(&kp)));
    let mut outputs = OutputSet::new();
    let mut tx = Transaction::new(TRANSACTION_VERSION_ONE);

    for _ in 0..10 {
        let mut buf = [0; 32];
        thread_rng().fill_bytes(&mut buf);
        let id = CoinOutputID(CryptoHash(buf));
        outputs.insert_coin_output(
            id,
            CoinOutput {
                value: Currency::new(100),
                condition: owner.clone(),
            },
        );
        tx.coin_inputs.push(CoinInput {
            parent_id: id,
            fulfillment: Fulfillment::Nil,
        });
    }
    tx.coin_outputs.push(CoinOutput {
        value: Currency::new(999),
        condition: Condition::from(UnlockHash::from_public_key(&PublicKey::from(&new_kp()))),
    });
    tx.miner_fees.push(Currency::new(1));
    tx.sign_inputs(registry, &outputs, |_| Some(KeyMaterial::Ed25519(&kp)))
        .unwrap();
    (tx, outputs)
}

pub fn transaction_encode(c: &mut Criterion) {
    let registry = TransactionRegistry::standard();
    let (tx, _) = signed_transaction(&registry);

    c.bench_function("transactions::encode (classic)", |b| {
        b.iter(|| registry.encode(Codec::Classic, &tx).unwrap())
    });
    c.bench_function("transactions::encode (compact)", |b| {
        b.iter(|| registry.encode(Codec::Compact, &tx).unwrap())
    });
}

pub fn transaction_decode(c: &mut Criterion) {
    let registry = TransactionRegistry::standard();
    let (tx, _) = signed_transaction(&registry);
    let bytes = registry.encode(Codec::Classic, &tx).unwrap();

    c.bench_function("transactions::decode (classic)", |b| {
        b.iter(|| registry.decode(Codec::Classic, &bytes).unwrap())
    });
}

pub fn transaction_validate(c: &mut Criterion) {
    let registry = TransactionRegistry::standard();
    let constants = ValidationConstants::default();
    let (tx, outputs) = signed_transaction(&registry);
    let ctx = ValidationContext::new(&constants, &outputs, BlockHeight(1), Timestamp(0));

    c.bench_function("transactions::validate (10 inputs)", |b| {
        b.iter(|| registry.validate(&tx, &ctx).unwrap())
    });
}
