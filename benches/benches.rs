// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

mod crypto;
mod data;

use criterion::{criterion_group, criterion_main};

use crypto::*;
use data::*;

criterion_group!(batch, batch_verifier);
criterion_group!(merkle, merkle_root);

criterion_group!(basics, unlock_hash_to_string, unlock_hash_from_str);
criterion_group!(transactions, transaction_encode, transaction_decode, transaction_validate);

criterion_main!(batch, merkle, basics, transactions);
