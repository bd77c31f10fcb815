// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::collections::HashSet;

use ed25519_dalek::Keypair;
use serde::{Deserialize, Serialize};

use super::singlesig::strict_signature_check;
use super::*;
use crate::crypto::{self, BatchVerError, BatchVerifier, PublicKey, Tree};
use crate::data::basics::{ByteSlice, UnlockHash, UnlockType};
use crate::protocol::{self, CodecError, Decodable, Decoder, Encodable, Encoder};

/// Requires signatures from at least `min_signatures` of the listed addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSignatureCondition {
    #[serde(rename = "unlockhashes")]
    pub unlock_hashes: Vec<UnlockHash>,
    #[serde(rename = "minimumsignaturecount")]
    pub min_signatures: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeySignaturePair {
    #[serde(rename = "publickey")]
    pub public_key: PublicKey,
    pub signature: ByteSlice,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSignatureFulfillment {
    pub pairs: Vec<PublicKeySignaturePair>,
}

impl MultiSignatureCondition {
    /// The unlock hashes are sorted, so the resulting address does not depend on their order.
    pub fn new(mut unlock_hashes: Vec<UnlockHash>, min_signatures: u64) -> Self {
        unlock_hashes.sort();
        Self {
            unlock_hashes,
            min_signatures,
        }
    }

    /// Merkle root over the key count, each (sorted) unlock hash and the signature threshold.
    pub fn unlock_hash(&self) -> UnlockHash {
        let mut sorted = self.unlock_hashes.clone();
        sorted.sort();

        let mut leaves = Vec::with_capacity(sorted.len() + 2);
        leaves.push(protocol::encode_classic(&(sorted.len() as u64)));
        leaves.extend(sorted.iter().map(protocol::encode_classic));
        leaves.push(protocol::encode_classic(&self.min_signatures));

        UnlockHash::new(UnlockType::MULTI_SIG, Tree::from_leaves(&leaves).root())
    }

    pub(super) fn fulfill(
        &self,
        fulfillment: &Fulfillment,
        ctx: &FulfillContext,
    ) -> Result<(), AuthorizationError> {
        let msf = match fulfillment {
            Fulfillment::MultiSignature(msf) => msf,
            f => return Err(unexpected_fulfillment(CONDITION_TYPE_MULTI_SIGNATURE, f)),
        };

        if msf.pairs.is_empty() || (msf.pairs.len() as u64) < self.min_signatures {
            return Err(AuthorizationError::InsufficientSignatures {
                required: self.min_signatures,
                provided: msf.pairs.len(),
            });
        }

        let authorized: HashSet<&UnlockHash> = self.unlock_hashes.iter().collect();
        let mut used = HashSet::with_capacity(msf.pairs.len());
        let mut bv = BatchVerifier::with_capacity(msf.pairs.len());
        for pair in &msf.pairs {
            let signer = UnlockHash::from_public_key(&pair.public_key);
            if !authorized.contains(&signer) {
                return Err(AuthorizationError::UnauthorizedPublicKey(signer));
            }
            if !used.insert(signer) {
                return Err(AuthorizationError::DuplicatePublicKey(signer));
            }
            let sig_hash = ctx.signature_hash(&[ExtraObject::PublicKey(pair.public_key.clone())])?;
            bv.enque_sig(pair.public_key.clone(), sig_hash, pair.signature.to_vec());
        }

        match bv.verify() {
            Ok(()) => Ok(()),
            Err(BatchVerError::VerificationFailed(_, err)) => Err(err.into()),
            Err(BatchVerError::ZeroSignaturesInBatch) => {
                Err(AuthorizationError::InsufficientSignatures {
                    required: self.min_signatures,
                    provided: 0,
                })
            }
        }
    }

    /// Signs with every given key, which must all be listed in the condition.
    /// The result may hold fewer signatures than required; more can be added later.
    pub(super) fn sign(
        &self,
        keys: &[Keypair],
        ctx: &SignContext,
    ) -> Result<Fulfillment, SigningError> {
        let mut msf = MultiSignatureFulfillment::default();
        for kp in keys {
            msf.add_signature(self, kp, ctx)?;
        }
        Ok(Fulfillment::MultiSignature(msf))
    }

    pub(super) fn is_standard(&self) -> bool {
        !self.unlock_hashes.is_empty()
            && self.min_signatures > 0
            && self.min_signatures <= self.unlock_hashes.len() as u64
            && self
                .unlock_hashes
                .iter()
                .all(|uh| uh.unlock_type == UnlockType::PUBLIC_KEY)
    }

    pub(super) fn fulfillable(&self) -> bool {
        self.min_signatures > 0 && self.min_signatures <= self.unlock_hashes.len() as u64
    }
}

impl MultiSignatureFulfillment {
    /// Adds the signature of one more key of the condition.
    pub fn add_signature(
        &mut self,
        condition: &MultiSignatureCondition,
        kp: &Keypair,
        ctx: &SignContext,
    ) -> Result<(), SigningError> {
        let public_key = PublicKey::from(kp);
        let signer = UnlockHash::from_public_key(&public_key);
        if !condition.unlock_hashes.contains(&signer) {
            return Err(SigningError::UnauthorizedKey(signer));
        }
        if self
            .pairs
            .iter()
            .any(|p| UnlockHash::from_public_key(&p.public_key) == signer)
        {
            return Err(SigningError::DuplicateKey(signer));
        }
        let sig_hash = ctx.signature_hash(&[ExtraObject::PublicKey(public_key.clone())])?;
        self.pairs.push(PublicKeySignaturePair {
            public_key,
            signature: crypto::sign_hash(kp, &sig_hash).into(),
        });
        Ok(())
    }

    pub(super) fn is_standard(&self) -> bool {
        !self.pairs.is_empty()
            && self
                .pairs
                .iter()
                .all(|p| strict_signature_check(&p.public_key, &p.signature))
    }
}

impl Encodable for MultiSignatureCondition {
    fn encode(&self, e: &mut Encoder) {
        e.write_u64(self.min_signatures);
        e.write(&self.unlock_hashes);
    }
}

impl Decodable for MultiSignatureCondition {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            min_signatures: d.read()?,
            unlock_hashes: d.read()?,
        })
    }
}

impl Encodable for PublicKeySignaturePair {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.public_key);
        e.write(&self.signature);
    }
}

impl Decodable for PublicKeySignaturePair {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            public_key: d.read()?,
            signature: d.read()?,
        })
    }
}

impl Encodable for MultiSignatureFulfillment {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.pairs);
    }
}

impl Decodable for MultiSignatureFulfillment {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self { pairs: d.read()? })
    }
}
