// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::slice;

use data_encoding::BASE64;
use serde::ser::SerializeStruct;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::timelock::check_wrapped_type;
use super::*;
use crate::crypto;
use crate::data::basics::{UnlockHash, UnlockType, NIL_UNLOCK_HASH};
use crate::protocol::{CodecError, Decodable, Decoder, Encodable, Encoder};

pub const CONDITION_TYPE_NIL: u8 = 0;
pub const CONDITION_TYPE_UNLOCK_HASH: u8 = 1;
pub const CONDITION_TYPE_ATOMIC_SWAP: u8 = 2;
pub const CONDITION_TYPE_TIME_LOCK: u8 = 3;
pub const CONDITION_TYPE_MULTI_SIGNATURE: u8 = 4;

/// A condition of a type this software does not know.
/// The payload is kept as-is, so the condition can still be relayed and hashed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnknownCondition {
    pub condition_type: u8,
    pub payload: Vec<u8>,
}

/// What has to be proven to spend an output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    /// Anyone with a valid signature can spend.
    Nil,
    UnlockHash(UnlockHashCondition),
    AtomicSwap(AtomicSwapCondition),
    TimeLock(TimeLockCondition),
    MultiSignature(MultiSignatureCondition),
    Unknown(UnknownCondition),
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Nil
    }
}

impl Condition {
    pub fn condition_type(&self) -> u8 {
        match self {
            Condition::Nil => CONDITION_TYPE_NIL,
            Condition::UnlockHash(_) => CONDITION_TYPE_UNLOCK_HASH,
            Condition::AtomicSwap(_) => CONDITION_TYPE_ATOMIC_SWAP,
            Condition::TimeLock(_) => CONDITION_TYPE_TIME_LOCK,
            Condition::MultiSignature(_) => CONDITION_TYPE_MULTI_SIGNATURE,
            Condition::Unknown(c) => c.condition_type,
        }
    }

    /// The address this condition is known by. Depends only on the condition itself.
    pub fn unlock_hash(&self) -> UnlockHash {
        match self {
            Condition::Nil => NIL_UNLOCK_HASH,
            Condition::UnlockHash(c) => c.target,
            Condition::AtomicSwap(c) => c.unlock_hash(),
            Condition::TimeLock(c) => c.unlock_hash(),
            Condition::MultiSignature(c) => c.unlock_hash(),
            Condition::Unknown(c) => {
                UnlockHash::new(UnlockType::CUSTOM, crypto::hash_obj(&c.payload))
            }
        }
    }

    /// Checks that the fulfillment satisfies this condition in the given context.
    pub fn fulfill(
        &self,
        fulfillment: &Fulfillment,
        ctx: &FulfillContext,
    ) -> Result<(), AuthorizationError> {
        if let Fulfillment::Unknown(f) = fulfillment {
            return Err(AuthorizationError::UnknownFulfillmentType(f.fulfillment_type));
        }
        match self {
            Condition::Nil => match fulfillment {
                Fulfillment::SingleSignature(ss) => ss.verify(ctx),
                f => Err(unexpected_fulfillment(CONDITION_TYPE_NIL, f)),
            },
            Condition::UnlockHash(c) => c.fulfill(fulfillment, ctx),
            Condition::AtomicSwap(c) => c.fulfill(fulfillment, ctx),
            Condition::TimeLock(c) => c.fulfill(fulfillment, ctx),
            Condition::MultiSignature(c) => c.fulfill(fulfillment, ctx),
            Condition::Unknown(c) => Err(AuthorizationError::UnknownConditionType(
                c.condition_type,
            )),
        }
    }

    /// Produces a fulfillment for this condition with the given keys.
    ///
    /// Time locks are signed through to the wrapped condition,
    /// whether or not the lock has been reached yet.
    pub fn sign(&self, key: KeyMaterial, ctx: &SignContext) -> Result<Fulfillment, SigningError> {
        match (self, key) {
            (Condition::Nil, KeyMaterial::Ed25519(kp)) => {
                SingleSignatureFulfillment::sign(kp, ctx).map(Fulfillment::SingleSignature)
            }
            (Condition::UnlockHash(c), KeyMaterial::Ed25519(kp)) => c.sign(kp, ctx),
            (Condition::AtomicSwap(c), KeyMaterial::Ed25519(kp)) => c.sign_refund(kp, ctx),
            (Condition::AtomicSwap(c), KeyMaterial::AtomicSwapClaim(kp, secret)) => {
                c.sign_claim(kp, secret, ctx)
            }
            (Condition::TimeLock(c), key) => c.condition.sign(key, ctx),
            (Condition::MultiSignature(c), KeyMaterial::Ed25519(kp)) => {
                c.sign(slice::from_ref(kp), ctx)
            }
            (Condition::MultiSignature(c), KeyMaterial::MultiSignature(keys)) => c.sign(keys, ctx),
            (Condition::Unknown(c), _) => Err(SigningError::UnknownConditionType(c.condition_type)),
            (c, _) => Err(SigningError::UnexpectedKeyMaterial(c.condition_type())),
        }
    }

    /// Stricter checks applied to conditions of unconfirmed transactions.
    pub fn is_standard(&self) -> bool {
        match self {
            Condition::Nil => true,
            Condition::UnlockHash(c) => c.is_standard() && !c.target.hash.is_zero(),
            Condition::AtomicSwap(c) => c.is_standard(),
            Condition::TimeLock(c) => c.is_standard(),
            Condition::MultiSignature(c) => c.is_standard(),
            Condition::Unknown(_) => false,
        }
    }

    /// Returns true iff some fulfillment could satisfy this condition at the given chain position.
    pub fn fulfillable(&self, ctx: &FulfillableContext) -> bool {
        match self {
            Condition::Nil | Condition::UnlockHash(_) | Condition::AtomicSwap(_) => true,
            Condition::TimeLock(c) => {
                c.is_unlocked(ctx.block_height, ctx.block_time) && c.condition.fulfillable(ctx)
            }
            Condition::MultiSignature(c) => c.fulfillable(),
            Condition::Unknown(_) => false,
        }
    }

    /// Writes the payload without the type tag and framing.
    pub(super) fn encode_body(&self, e: &mut Encoder) {
        match self {
            Condition::Nil => {}
            Condition::UnlockHash(c) => e.write(c),
            Condition::AtomicSwap(c) => e.write(c),
            Condition::TimeLock(c) => e.write(c),
            Condition::MultiSignature(c) => e.write(c),
            Condition::Unknown(c) => e.write_fixed(&c.payload),
        }
    }

    /// Reads the payload of a condition with the given type tag.
    /// Unknown tags consume all that is left.
    pub(super) fn decode_body(condition_type: u8, d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(match condition_type {
            CONDITION_TYPE_NIL => Condition::Nil,
            CONDITION_TYPE_UNLOCK_HASH => Condition::UnlockHash(d.read()?),
            CONDITION_TYPE_ATOMIC_SWAP => Condition::AtomicSwap(d.read()?),
            CONDITION_TYPE_TIME_LOCK => Condition::TimeLock(d.read()?),
            CONDITION_TYPE_MULTI_SIGNATURE => Condition::MultiSignature(d.read()?),
            t => Condition::Unknown(UnknownCondition {
                condition_type: t,
                payload: d.read_rest(),
            }),
        })
    }
}

impl From<UnlockHash> for Condition {
    /// The nil unlock hash maps to the nil condition.
    fn from(uh: UnlockHash) -> Self {
        if uh.is_nil() {
            Condition::Nil
        } else {
            Condition::UnlockHash(UnlockHashCondition::new(uh))
        }
    }
}

/// Picks the most specific error for a fulfillment that does not match its condition.
pub(super) fn unexpected_fulfillment(condition_type: u8, f: &Fulfillment) -> AuthorizationError {
    match f {
        Fulfillment::Nil => AuthorizationError::NilFulfillment,
        Fulfillment::Unknown(u) => AuthorizationError::UnknownFulfillmentType(u.fulfillment_type),
        f => AuthorizationError::UnexpectedFulfillment {
            condition: condition_type,
            fulfillment: f.fulfillment_type(),
        },
    }
}

/// Type tag, followed by the length-prefixed payload.
impl Encodable for Condition {
    fn encode(&self, e: &mut Encoder) {
        e.write_u8(self.condition_type());
        e.write_nested(|e| self.encode_body(e));
    }
}

impl Decodable for Condition {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        let condition_type = d.read_u8()?;
        d.read_nested(|d| Condition::decode_body(condition_type, d))
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if matches!(self, Condition::Nil) { 1 } else { 2 };
        let mut s = serializer.serialize_struct("Condition", fields)?;
        s.serialize_field("type", &self.condition_type())?;
        match self {
            Condition::Nil => {}
            Condition::UnlockHash(c) => s.serialize_field("condition", c)?,
            Condition::AtomicSwap(c) => s.serialize_field("condition", c)?,
            Condition::TimeLock(c) => s.serialize_field("condition", c)?,
            Condition::MultiSignature(c) => s.serialize_field("condition", c)?,
            Condition::Unknown(c) => s.serialize_field("condition", &BASE64.encode(&c.payload))?,
        }
        s.end()
    }
}

#[derive(Deserialize)]
struct ConditionProxy {
    #[serde(rename = "type", default)]
    condition_type: u8,
    #[serde(default)]
    condition: Option<serde_json::Value>,
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = ConditionProxy::deserialize(deserializer)?;
        let body = proxy.condition.unwrap_or(serde_json::Value::Null);
        Ok(match proxy.condition_type {
            CONDITION_TYPE_NIL => Condition::Nil,
            CONDITION_TYPE_UNLOCK_HASH => Condition::UnlockHash(from_body::<_, D::Error>(body)?),
            CONDITION_TYPE_ATOMIC_SWAP => Condition::AtomicSwap(from_body::<_, D::Error>(body)?),
            CONDITION_TYPE_TIME_LOCK => {
                let c: TimeLockCondition = from_body::<_, D::Error>(body)?;
                check_wrapped_type(c.condition.condition_type())
                    .map_err(<D::Error as de::Error>::custom)?;
                Condition::TimeLock(c)
            }
            CONDITION_TYPE_MULTI_SIGNATURE => {
                Condition::MultiSignature(from_body::<_, D::Error>(body)?)
            }
            t => Condition::Unknown(UnknownCondition {
                condition_type: t,
                payload: base64_body::<D::Error>(body)?,
            }),
        })
    }
}

/// Decodes the typed body of a condition or fulfillment proxy.
pub(super) fn from_body<T: de::DeserializeOwned, E: de::Error>(
    body: serde_json::Value,
) -> Result<T, E> {
    serde_json::from_value(body).map_err(E::custom)
}

/// Decodes the opaque body of an unknown proxy type; a missing body is empty.
pub(super) fn base64_body<E: de::Error>(body: serde_json::Value) -> Result<Vec<u8>, E> {
    match body {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::String(s) => BASE64.decode(s.as_bytes()).map_err(E::custom),
        _ => Err(E::custom("unknown type body must be a base64 string")),
    }
}
