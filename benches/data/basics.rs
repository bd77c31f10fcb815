// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::str::FromStr;

use criterion::Criterion;
use rand::{thread_rng, RngCore};

use rivtx::crypto::CryptoHash;
use rivtx::data::basics::{UnlockHash, UnlockType};

fn random_unlock_hash() -> UnlockHash {
    let mut buf = [0; 32];
    thread_rng().fill_bytes(&mut buf);
    UnlockHash::new(UnlockType::PUBLIC_KEY, CryptoHash(buf))
}

pub fn unlock_hash_to_string(c: &mut Criterion) {
    c.bench_function("basics::UnlockHash::to_string()", |b| {
        b.iter_with_setup(random_unlock_hash, |uh| uh.to_string());
    });
}

pub fn unlock_hash_from_str(c: &mut Criterion) {
    c.bench_function("basics::UnlockHash::from_str()", |b| {
        b.iter_with_setup(
            || random_unlock_hash().to_string(),
            |s| UnlockHash::from_str(&s),
        );
    });
}
