// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use ed25519_dalek::Keypair;

use super::{AtomicSwapSecret, SignatureHashError};
use crate::crypto::{CryptoHash, PublicKey};
use crate::data::basics::{BlockHeight, Timestamp};
use crate::protocol::{Encodable, Encoder};

/// Additional objects a fulfillment binds into the signature it makes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtraObject {
    PublicKey(PublicKey),
    Secret(AtomicSwapSecret),
}

impl Encodable for ExtraObject {
    fn encode(&self, e: &mut Encoder) {
        match self {
            ExtraObject::PublicKey(pk) => pk.encode(e),
            ExtraObject::Secret(s) => s.encode(e),
        }
    }
}

/// Computes the hash an input signature commits to.
/// Implemented by the owning transaction.
pub trait SignatureHasher {
    fn signature_hash(&self, extra_objects: &[ExtraObject])
        -> Result<CryptoHash, SignatureHashError>;
}

/// Everything a condition needs to check a fulfillment.
#[derive(Clone, Copy)]
pub struct FulfillContext<'a> {
    pub block_height: BlockHeight,
    pub block_time: Timestamp,
    pub transaction: &'a dyn SignatureHasher,
}

impl<'a> FulfillContext<'a> {
    pub fn signature_hash(&self, extra_objects: &[ExtraObject]) -> Result<CryptoHash, SignatureHashError> {
        self.transaction.signature_hash(extra_objects)
    }

    pub fn fulfillable(&self) -> FulfillableContext {
        FulfillableContext {
            block_height: self.block_height,
            block_time: self.block_time,
        }
    }
}

/// Chain position used to decide whether a condition can be fulfilled at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FulfillableContext {
    pub block_height: BlockHeight,
    pub block_time: Timestamp,
}

/// Everything a condition needs to produce a fulfillment.
#[derive(Clone, Copy)]
pub struct SignContext<'a> {
    pub transaction: &'a dyn SignatureHasher,
}

impl<'a> SignContext<'a> {
    pub fn signature_hash(&self, extra_objects: &[ExtraObject]) -> Result<CryptoHash, SignatureHashError> {
        self.transaction.signature_hash(extra_objects)
    }
}

/// Secret key material handed to `Condition::sign`.
#[derive(Clone, Copy)]
pub enum KeyMaterial<'a> {
    /// A single key, used for plain signatures, atomic swap refunds and partial multisig signing.
    Ed25519(&'a Keypair),
    /// The receiver's key together with the preimage of the hashed secret.
    AtomicSwapClaim(&'a Keypair, AtomicSwapSecret),
    /// Several keys of one multisig condition.
    MultiSignature(&'a [Keypair]),
}
