// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use ed25519_dalek::{Keypair, SIGNATURE_LENGTH};
use serde::{Deserialize, Serialize};

use super::*;
use crate::crypto::{self, PublicKey};
use crate::data::basics::{ByteSlice, UnlockHash, UnlockType};
use crate::protocol::{CodecError, Decodable, Decoder, Encodable, Encoder};

/// Requires a fulfillment that resolves to one specific address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockHashCondition {
    #[serde(rename = "unlockhash")]
    pub target: UnlockHash,
}

/// A public key and a signature made with its private key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleSignatureFulfillment {
    #[serde(rename = "publickey")]
    pub public_key: PublicKey,
    pub signature: ByteSlice,
}

impl UnlockHashCondition {
    pub fn new(target: UnlockHash) -> Self {
        Self { target }
    }

    pub(super) fn fulfill(
        &self,
        fulfillment: &Fulfillment,
        ctx: &FulfillContext,
    ) -> Result<(), AuthorizationError> {
        match fulfillment {
            Fulfillment::SingleSignature(ss) => {
                if self.target.unlock_type != UnlockType::PUBLIC_KEY {
                    return Err(AuthorizationError::UnexpectedUnlockType(
                        self.target.unlock_type,
                    ));
                }
                let signer = UnlockHash::from_public_key(&ss.public_key);
                if signer != self.target {
                    return Err(AuthorizationError::WrongSigner {
                        expected: self.target,
                        actual: signer,
                    });
                }
                ss.verify(ctx)
            }
            Fulfillment::LegacyAtomicSwap(las) => {
                if self.target.unlock_type != UnlockType::ATOMIC_SWAP {
                    return Err(AuthorizationError::UnexpectedUnlockType(
                        self.target.unlock_type,
                    ));
                }
                let condition = las.condition();
                if condition.unlock_hash() != self.target {
                    return Err(AuthorizationError::ConditionMismatch);
                }
                condition.fulfill_swap(&las.public_key, &las.signature, las.secret, ctx)
            }
            f => Err(unexpected_fulfillment(CONDITION_TYPE_UNLOCK_HASH, f)),
        }
    }

    pub(super) fn sign(&self, kp: &Keypair, ctx: &SignContext) -> Result<Fulfillment, SigningError> {
        if self.target.unlock_type != UnlockType::PUBLIC_KEY {
            return Err(SigningError::UnsupportedCondition(
                "only public key unlock hashes can be signed directly",
            ));
        }
        let public_key = PublicKey::from(kp);
        let signer = UnlockHash::from_public_key(&public_key);
        if signer != self.target {
            return Err(SigningError::UnauthorizedKey(signer));
        }
        SingleSignatureFulfillment::sign(kp, ctx).map(Fulfillment::SingleSignature)
    }

    pub(super) fn is_standard(&self) -> bool {
        self.target.unlock_type == UnlockType::PUBLIC_KEY
            || self.target.unlock_type == UnlockType::ATOMIC_SWAP
    }
}

impl SingleSignatureFulfillment {
    /// Signs the transaction with no extra objects bound.
    pub fn sign(kp: &Keypair, ctx: &SignContext) -> Result<Self, SigningError> {
        let sig_hash = ctx.signature_hash(&[])?;
        Ok(Self {
            public_key: PublicKey::from(kp),
            signature: crypto::sign_hash(kp, &sig_hash).into(),
        })
    }

    /// Checks the signature only, not which key made it.
    pub(super) fn verify(&self, ctx: &FulfillContext) -> Result<(), AuthorizationError> {
        let sig_hash = ctx.signature_hash(&[])?;
        crypto::verify_hash(&self.public_key, &sig_hash, &self.signature)?;
        Ok(())
    }

    pub(super) fn is_standard(&self) -> bool {
        strict_signature_check(&self.public_key, &self.signature)
    }
}

/// Known algorithm with the exact key and signature sizes it uses.
pub(super) fn strict_signature_check(pk: &PublicKey, signature: &[u8]) -> bool {
    pk.is_standard() && signature.len() == SIGNATURE_LENGTH
}

impl Encodable for UnlockHashCondition {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.target);
    }
}

impl Decodable for UnlockHashCondition {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self { target: d.read()? })
    }
}

impl Encodable for SingleSignatureFulfillment {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.public_key);
        e.write(&self.signature);
    }
}

impl Decodable for SingleSignatureFulfillment {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            public_key: d.read()?,
            signature: d.read()?,
        })
    }
}
