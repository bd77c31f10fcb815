// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use ed25519_dalek::Keypair;
use rand::{thread_rng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::singlesig::strict_signature_check;
use super::*;
use crate::crypto::{self, PublicKey};
use crate::data::basics::{hex_array, ByteSlice, Timestamp, UnlockHash, UnlockType};
use crate::protocol::{self, CodecError, Decodable, Decoder, Encodable, Encoder};

const SECRET_LEN: usize = 32;

/// The preimage revealed by the receiver of an atomic swap to claim it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomicSwapSecret(#[serde(with = "hex_array")] pub [u8; SECRET_LEN]);

/// SHA-256 hash of an `AtomicSwapSecret`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomicSwapHashedSecret(#[serde(with = "hex_array")] pub [u8; SECRET_LEN]);

impl AtomicSwapSecret {
    pub fn random() -> Self {
        let mut s = Self::default();
        thread_rng().fill_bytes(&mut s.0);
        s
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; SECRET_LEN]
    }
}

impl From<&AtomicSwapSecret> for AtomicSwapHashedSecret {
    fn from(secret: &AtomicSwapSecret) -> Self {
        let mut out = [0; SECRET_LEN];
        out.copy_from_slice(&Sha256::digest(&secret.0));
        Self(out)
    }
}

/// A hashed time lock contract.
///
/// Up to and including `time_lock` only the receiver can spend the output,
/// by revealing the secret. After it only the sender can, to get a refund.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicSwapCondition {
    pub sender: UnlockHash,
    pub receiver: UnlockHash,
    #[serde(rename = "hashedsecret")]
    pub hashed_secret: AtomicSwapHashedSecret,
    #[serde(rename = "timelock")]
    pub time_lock: Timestamp,
}

/// Spends an atomic swap. The secret is only present when claiming.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicSwapFulfillment {
    #[serde(rename = "publickey")]
    pub public_key: PublicKey,
    pub signature: ByteSlice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<AtomicSwapSecret>,
}

/// Atomic swap fulfillment that carries its own condition,
/// as used when outputs could only store unlock hashes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyAtomicSwapFulfillment {
    pub sender: UnlockHash,
    pub receiver: UnlockHash,
    #[serde(rename = "hashedsecret")]
    pub hashed_secret: AtomicSwapHashedSecret,
    #[serde(rename = "timelock")]
    pub time_lock: Timestamp,
    #[serde(rename = "publickey")]
    pub public_key: PublicKey,
    pub signature: ByteSlice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<AtomicSwapSecret>,
}

impl AtomicSwapCondition {
    /// Hash of the length-prefixed classic encoding of the condition.
    pub fn unlock_hash(&self) -> UnlockHash {
        let body = protocol::encode_classic(self);
        UnlockHash::new(UnlockType::ATOMIC_SWAP, crypto::hash_obj(&body))
    }

    /// Returns true while the receiver may still claim.
    pub fn is_claim_window(&self, now: Timestamp) -> bool {
        now <= self.time_lock
    }

    pub(super) fn fulfill(
        &self,
        fulfillment: &Fulfillment,
        ctx: &FulfillContext,
    ) -> Result<(), AuthorizationError> {
        match fulfillment {
            Fulfillment::AtomicSwap(asf) => {
                self.fulfill_swap(&asf.public_key, &asf.signature, asf.secret, ctx)
            }
            Fulfillment::LegacyAtomicSwap(las) => {
                if las.condition() != *self {
                    return Err(AuthorizationError::ConditionMismatch);
                }
                self.fulfill_swap(&las.public_key, &las.signature, las.secret, ctx)
            }
            f => Err(unexpected_fulfillment(CONDITION_TYPE_ATOMIC_SWAP, f)),
        }
    }

    /// Checks the signer against the current window, then the secret, then the signature.
    pub(super) fn fulfill_swap(
        &self,
        public_key: &PublicKey,
        signature: &[u8],
        secret: Option<AtomicSwapSecret>,
        ctx: &FulfillContext,
    ) -> Result<(), AuthorizationError> {
        let signer = UnlockHash::from_public_key(public_key);
        if self.is_claim_window(ctx.block_time) {
            if signer != self.receiver {
                return Err(AuthorizationError::WrongSigner {
                    expected: self.receiver,
                    actual: signer,
                });
            }
            let secret = secret.ok_or(AuthorizationError::MissingSecret)?;
            if AtomicSwapHashedSecret::from(&secret) != self.hashed_secret {
                return Err(AuthorizationError::InvalidSecret);
            }
        } else if signer != self.sender {
            return Err(AuthorizationError::WrongSigner {
                expected: self.sender,
                actual: signer,
            });
        }

        let sig_hash = ctx.signature_hash(&extra_objects(public_key, secret))?;
        crypto::verify_hash(public_key, &sig_hash, signature)?;
        Ok(())
    }

    /// Refunds to the sender.
    pub(super) fn sign_refund(
        &self,
        kp: &Keypair,
        ctx: &SignContext,
    ) -> Result<Fulfillment, SigningError> {
        let public_key = PublicKey::from(kp);
        let signer = UnlockHash::from_public_key(&public_key);
        if signer != self.sender {
            return Err(SigningError::UnauthorizedKey(signer));
        }
        let sig_hash = ctx.signature_hash(&extra_objects(&public_key, None))?;
        Ok(Fulfillment::AtomicSwap(AtomicSwapFulfillment {
            signature: crypto::sign_hash(kp, &sig_hash).into(),
            public_key,
            secret: None,
        }))
    }

    /// Claims as the receiver, revealing the secret.
    pub(super) fn sign_claim(
        &self,
        kp: &Keypair,
        secret: AtomicSwapSecret,
        ctx: &SignContext,
    ) -> Result<Fulfillment, SigningError> {
        let public_key = PublicKey::from(kp);
        let signer = UnlockHash::from_public_key(&public_key);
        if signer != self.receiver {
            return Err(SigningError::UnauthorizedKey(signer));
        }
        if AtomicSwapHashedSecret::from(&secret) != self.hashed_secret {
            return Err(SigningError::InvalidSecret);
        }
        let sig_hash = ctx.signature_hash(&extra_objects(&public_key, Some(secret)))?;
        Ok(Fulfillment::AtomicSwap(AtomicSwapFulfillment {
            signature: crypto::sign_hash(kp, &sig_hash).into(),
            public_key,
            secret: Some(secret),
        }))
    }

    pub(super) fn is_standard(&self) -> bool {
        self.sender.unlock_type == UnlockType::PUBLIC_KEY
            && self.receiver.unlock_type == UnlockType::PUBLIC_KEY
    }
}

/// The public key is always bound, the secret only when it is revealed.
fn extra_objects(public_key: &PublicKey, secret: Option<AtomicSwapSecret>) -> Vec<ExtraObject> {
    let mut extras = vec![ExtraObject::PublicKey(public_key.clone())];
    if let Some(secret) = secret {
        extras.push(ExtraObject::Secret(secret));
    }
    extras
}

impl AtomicSwapFulfillment {
    pub(super) fn is_standard(&self) -> bool {
        strict_signature_check(&self.public_key, &self.signature)
    }
}

impl LegacyAtomicSwapFulfillment {
    /// The condition embedded in this fulfillment.
    pub fn condition(&self) -> AtomicSwapCondition {
        AtomicSwapCondition {
            sender: self.sender,
            receiver: self.receiver,
            hashed_secret: self.hashed_secret,
            time_lock: self.time_lock,
        }
    }

    pub(super) fn is_standard(&self) -> bool {
        self.condition().is_standard() && strict_signature_check(&self.public_key, &self.signature)
    }
}

impl Encodable for AtomicSwapSecret {
    fn encode(&self, e: &mut Encoder) {
        e.write_fixed(&self.0);
    }
}

impl Decodable for AtomicSwapSecret {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self(d.read_array()?))
    }
}

impl Encodable for AtomicSwapHashedSecret {
    fn encode(&self, e: &mut Encoder) {
        e.write_fixed(&self.0);
    }
}

impl Decodable for AtomicSwapHashedSecret {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self(d.read_array()?))
    }
}

/// An absent secret is encoded as all zeros.
fn encode_secret(e: &mut Encoder, secret: &Option<AtomicSwapSecret>) {
    e.write(&secret.unwrap_or_default());
}

fn decode_secret(d: &mut Decoder) -> Result<Option<AtomicSwapSecret>, CodecError> {
    let secret: AtomicSwapSecret = d.read()?;
    Ok(if secret.is_zero() { None } else { Some(secret) })
}

impl Encodable for AtomicSwapCondition {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.sender);
        e.write(&self.receiver);
        e.write(&self.hashed_secret);
        e.write(&self.time_lock);
    }
}

impl Decodable for AtomicSwapCondition {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            sender: d.read()?,
            receiver: d.read()?,
            hashed_secret: d.read()?,
            time_lock: d.read()?,
        })
    }
}

impl Encodable for AtomicSwapFulfillment {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.public_key);
        e.write(&self.signature);
        encode_secret(e, &self.secret);
    }
}

impl Decodable for AtomicSwapFulfillment {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            public_key: d.read()?,
            signature: d.read()?,
            secret: decode_secret(d)?,
        })
    }
}

impl Encodable for LegacyAtomicSwapFulfillment {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.condition());
        e.write(&self.public_key);
        e.write(&self.signature);
        encode_secret(e, &self.secret);
    }
}

impl Decodable for LegacyAtomicSwapFulfillment {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        let condition: AtomicSwapCondition = d.read()?;
        Ok(Self {
            sender: condition.sender,
            receiver: condition.receiver,
            hashed_secret: condition.hashed_secret,
            time_lock: condition.time_lock,
            public_key: d.read()?,
            signature: d.read()?,
            secret: decode_secret(d)?,
        })
    }
}
