// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::fmt;
use std::ops::{Add, Deref};

use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::protocol::{CodecError, Decodable, Decoder, Encodable, Encoder};

/// Lock values below this are block heights, values at or above it are unix timestamps.
pub const LOCK_TIME_MIN_TIMESTAMP_VALUE: u64 = 500_000_000;

/// A block height.
#[derive(
    Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockHeight(pub u64);

/// Seconds since the unix epoch.
#[derive(
    Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for BlockHeight {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Encodable for BlockHeight {
    fn encode(&self, e: &mut Encoder) {
        e.write_u64(self.0);
    }
}

impl Decodable for BlockHeight {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self(d.read_u64()?))
    }
}

impl Encodable for Timestamp {
    fn encode(&self, e: &mut Encoder) {
        e.write_u64(self.0);
    }
}

impl Decodable for Timestamp {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self(d.read_u64()?))
    }
}

/// Arbitrary bytes, shown as a hex string in JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ByteSlice(pub Vec<u8>);

impl Deref for ByteSlice {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ByteSlice {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<&[u8]> for ByteSlice {
    fn from(v: &[u8]) -> Self {
        Self(v.to_vec())
    }
}

impl fmt::Display for ByteSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&HEXLOWER.encode(&self.0))
    }
}

impl Serialize for ByteSlice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ByteSlice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        HEXLOWER_PERMISSIVE
            .decode(s.as_bytes())
            .map(ByteSlice)
            .map_err(de::Error::custom)
    }
}

impl Encodable for ByteSlice {
    fn encode(&self, e: &mut Encoder) {
        e.write_bytes(&self.0);
    }
}

impl Decodable for ByteSlice {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self(d.read_bytes()?))
    }
}

/// Hex (de)serialization for fixed-size byte arrays.
pub(crate) mod hex_array {
    use std::convert::TryInto;

    use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        v: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&HEXLOWER.encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        let v = HEXLOWER_PERMISSIVE
            .decode(s.as_bytes())
            .map_err(de::Error::custom)?;
        v.try_into()
            .map_err(|v: Vec<u8>| de::Error::invalid_length(v.len(), &"a fixed-size hex string"))
    }
}

/// Base64 (de)serialization of raw byte fields, such as arbitrary transaction data.
pub(crate) mod base64_bytes {
    use data_encoding::BASE64;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::ByteSlice;

    pub fn serialize<S: Serializer>(v: &ByteSlice, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ByteSlice, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        BASE64
            .decode(s.as_bytes())
            .map(ByteSlice)
            .map_err(de::Error::custom)
    }
}
