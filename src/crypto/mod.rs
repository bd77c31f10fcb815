// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

pub mod batch_verifier;
pub mod hashable;
pub mod keys;
pub mod merkle;

pub use batch_verifier::*;
pub use hashable::*;
pub use keys::{
    keypair_from_seed, sign_hash, verify_hash, PublicKey, SignatureAlgoType, SignatureError,
};
pub use merkle::Tree;
