// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use data_encoding::BASE64;
use serde::ser::SerializeStruct;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::condition::{base64_body, from_body};
use super::*;
use crate::protocol::{CodecError, Decodable, Decoder, Encodable, Encoder};

pub const FULFILLMENT_TYPE_NIL: u8 = 0;
pub const FULFILLMENT_TYPE_SINGLE_SIGNATURE: u8 = 1;
/// Shared by the current and the legacy atomic swap fulfillment,
/// which are told apart by their layout.
pub const FULFILLMENT_TYPE_ATOMIC_SWAP: u8 = 2;
pub const FULFILLMENT_TYPE_MULTI_SIGNATURE: u8 = 3;

/// JSON fields only the legacy atomic swap fulfillment has.
const LEGACY_ATOMIC_SWAP_FIELDS: [&str; 4] = ["sender", "receiver", "hashedsecret", "timelock"];

/// A fulfillment of a type this software does not know.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnknownFulfillment {
    pub fulfillment_type: u8,
    pub payload: Vec<u8>,
}

/// The proof presented when spending an output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fulfillment {
    /// Placeholder of inputs that are not signed yet. Fulfills nothing.
    Nil,
    SingleSignature(SingleSignatureFulfillment),
    AtomicSwap(AtomicSwapFulfillment),
    LegacyAtomicSwap(LegacyAtomicSwapFulfillment),
    MultiSignature(MultiSignatureFulfillment),
    Unknown(UnknownFulfillment),
}

impl Default for Fulfillment {
    fn default() -> Self {
        Fulfillment::Nil
    }
}

impl Fulfillment {
    pub fn fulfillment_type(&self) -> u8 {
        match self {
            Fulfillment::Nil => FULFILLMENT_TYPE_NIL,
            Fulfillment::SingleSignature(_) => FULFILLMENT_TYPE_SINGLE_SIGNATURE,
            Fulfillment::AtomicSwap(_) | Fulfillment::LegacyAtomicSwap(_) => {
                FULFILLMENT_TYPE_ATOMIC_SWAP
            }
            Fulfillment::MultiSignature(_) => FULFILLMENT_TYPE_MULTI_SIGNATURE,
            Fulfillment::Unknown(f) => f.fulfillment_type,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Fulfillment::Nil)
    }

    /// Stricter checks applied to fulfillments of unconfirmed transactions.
    pub fn is_standard(&self) -> bool {
        match self {
            Fulfillment::Nil | Fulfillment::Unknown(_) => false,
            Fulfillment::SingleSignature(f) => f.is_standard(),
            Fulfillment::AtomicSwap(f) => f.is_standard(),
            Fulfillment::LegacyAtomicSwap(f) => f.is_standard(),
            Fulfillment::MultiSignature(f) => f.is_standard(),
        }
    }

    fn encode_body(&self, e: &mut Encoder) {
        match self {
            Fulfillment::Nil => {}
            Fulfillment::SingleSignature(f) => e.write(f),
            Fulfillment::AtomicSwap(f) => e.write(f),
            Fulfillment::LegacyAtomicSwap(f) => e.write(f),
            Fulfillment::MultiSignature(f) => e.write(f),
            Fulfillment::Unknown(f) => e.write_fixed(&f.payload),
        }
    }

    fn decode_body(fulfillment_type: u8, d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(match fulfillment_type {
            FULFILLMENT_TYPE_NIL => Fulfillment::Nil,
            FULFILLMENT_TYPE_SINGLE_SIGNATURE => Fulfillment::SingleSignature(d.read()?),
            FULFILLMENT_TYPE_ATOMIC_SWAP => decode_atomic_swap(d)?,
            FULFILLMENT_TYPE_MULTI_SIGNATURE => Fulfillment::MultiSignature(d.read()?),
            t => Fulfillment::Unknown(UnknownFulfillment {
                fulfillment_type: t,
                payload: d.read_rest(),
            }),
        })
    }
}

/// Tries the current layout first, which has to span the whole payload,
/// and falls back to the legacy layout.
fn decode_atomic_swap(d: &mut Decoder) -> Result<Fulfillment, CodecError> {
    let mut attempt = d.clone();
    if let Ok(f) = AtomicSwapFulfillment::decode(&mut attempt) {
        if attempt.remaining() == 0 {
            *d = attempt;
            return Ok(Fulfillment::AtomicSwap(f));
        }
    }
    Ok(Fulfillment::LegacyAtomicSwap(d.read()?))
}

impl Encodable for Fulfillment {
    fn encode(&self, e: &mut Encoder) {
        e.write_u8(self.fulfillment_type());
        e.write_nested(|e| self.encode_body(e));
    }
}

impl Decodable for Fulfillment {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        let fulfillment_type = d.read_u8()?;
        d.read_nested(|d| Fulfillment::decode_body(fulfillment_type, d))
    }
}

impl Serialize for Fulfillment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.is_nil() { 1 } else { 2 };
        let mut s = serializer.serialize_struct("Fulfillment", fields)?;
        s.serialize_field("type", &self.fulfillment_type())?;
        match self {
            Fulfillment::Nil => {}
            Fulfillment::SingleSignature(f) => s.serialize_field("fulfillment", f)?,
            Fulfillment::AtomicSwap(f) => s.serialize_field("fulfillment", f)?,
            Fulfillment::LegacyAtomicSwap(f) => s.serialize_field("fulfillment", f)?,
            Fulfillment::MultiSignature(f) => s.serialize_field("fulfillment", f)?,
            Fulfillment::Unknown(f) => {
                s.serialize_field("fulfillment", &BASE64.encode(&f.payload))?
            }
        }
        s.end()
    }
}

#[derive(Deserialize)]
struct FulfillmentProxy {
    #[serde(rename = "type", default)]
    fulfillment_type: u8,
    #[serde(default)]
    fulfillment: Option<serde_json::Value>,
}

impl<'de> Deserialize<'de> for Fulfillment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = FulfillmentProxy::deserialize(deserializer)?;
        let body = proxy.fulfillment.unwrap_or(serde_json::Value::Null);
        Ok(match proxy.fulfillment_type {
            FULFILLMENT_TYPE_NIL => Fulfillment::Nil,
            FULFILLMENT_TYPE_SINGLE_SIGNATURE => {
                Fulfillment::SingleSignature(from_body::<_, D::Error>(body)?)
            }
            FULFILLMENT_TYPE_ATOMIC_SWAP => atomic_swap_from_json::<D::Error>(body)?,
            FULFILLMENT_TYPE_MULTI_SIGNATURE => {
                Fulfillment::MultiSignature(from_body::<_, D::Error>(body)?)
            }
            t => Fulfillment::Unknown(UnknownFulfillment {
                fulfillment_type: t,
                payload: base64_body::<D::Error>(body)?,
            }),
        })
    }
}

/// The legacy layout is chosen iff all of its extra fields are present.
fn atomic_swap_from_json<E: de::Error>(body: serde_json::Value) -> Result<Fulfillment, E> {
    let present = match &body {
        serde_json::Value::Object(m) => LEGACY_ATOMIC_SWAP_FIELDS
            .iter()
            .filter(|k| m.contains_key(**k))
            .count(),
        _ => return Err(E::custom("atomic swap fulfillment must be an object")),
    };
    match present {
        0 => Ok(Fulfillment::AtomicSwap(from_body::<_, E>(body)?)),
        n if n == LEGACY_ATOMIC_SWAP_FIELDS.len() => {
            Ok(Fulfillment::LegacyAtomicSwap(from_body::<_, E>(body)?))
        }
        _ => Err(E::custom(
            "atomic swap fulfillment mixes the legacy and current layouts",
        )),
    }
}
