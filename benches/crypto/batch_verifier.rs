// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use criterion::Criterion;
use rand::{thread_rng, RngCore};

use rivtx::crypto::*;

pub fn batch_verifier(c: &mut Criterion) {
    let mut seed = [0; 32];
    thread_rng().fill_bytes(&mut seed);
    let kp = keypair_from_seed(&seed).unwrap();
    let pk = PublicKey::from(&kp);

    c.bench_function("batch_verifier::verify (64)", |b| {
        b.iter_with_setup(
            || {
                let mut bv = BatchVerifier::with_capacity(64);
                for _ in 0..64 {
                    let msg = random_hash();
                    bv.enque_sig(pk.clone(), msg, sign_hash(&kp, &msg));
                }
                bv
            },
            |bv| assert!(bv.verify().is_ok()),
        );
    });
}

fn random_hash() -> CryptoHash {
    let mut buf = [0; 32];
    thread_rng().fill_bytes(&mut buf);
    hash(&buf)
}
