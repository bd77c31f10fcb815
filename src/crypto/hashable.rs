// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::convert::{TryFrom, TryInto};
use std::fmt;
use std::str::FromStr;

use data_encoding::HEXLOWER_PERMISSIVE;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512Trunc256};
use thiserror::Error;

use crate::protocol::{self, CodecError, Decodable, Decoder, Encodable, Encoder};

/// Number of bytes in the preferred hash digest used here.
pub const HASH_LEN: usize = 32;

/// Represents a 32-byte (256-bit) value holding a hash digest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CryptoHash(pub [u8; HASH_LEN]);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HashError {
    #[error("invalid hex encoding")]
    InvalidHex(#[from] data_encoding::DecodeError),
    #[error("wrong length for hash: `{0}`")]
    WrongLength(usize),
}

impl CryptoHash {
    /// Returns true iff the digest contains only zeros.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; HASH_LEN]
    }
}

// Display the digest as a lowercase hex string.
impl fmt::Display for CryptoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&data_encoding::HEXLOWER.encode(&self.0))
    }
}

impl TryFrom<&str> for CryptoHash {
    type Error = HashError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let decoded = HEXLOWER_PERMISSIVE.decode(s.as_bytes())?;
        let arr: [u8; HASH_LEN] = decoded
            .try_into()
            .map_err(|d: Vec<u8>| HashError::WrongLength(d.len()))?;
        Ok(CryptoHash(arr))
    }
}

impl FromStr for CryptoHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl Serialize for CryptoHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CryptoHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CryptoHash::try_from(s.as_str()).map_err(de::Error::custom)
    }
}

impl Encodable for CryptoHash {
    fn encode(&self, e: &mut Encoder) {
        e.write_fixed(&self.0);
    }
}

impl Decodable for CryptoHash {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(CryptoHash(d.read_array()?))
    }
}

/// Computes the SHA-512/256 hash of an array of bytes.
pub fn hash(data: &[u8]) -> CryptoHash {
    let mut out = [0; HASH_LEN];
    out.copy_from_slice(&Sha512Trunc256::digest(data)[..]);
    CryptoHash(out)
}

/// Computes the hash of the classic encoding of an object.
pub fn hash_obj(obj: &(impl Encodable + ?Sized)) -> CryptoHash {
    hash(&protocol::encode_classic(obj))
}

/// Computes the hash of the concatenated classic encodings of several objects.
pub fn hash_all(objs: &[&dyn Encodable]) -> CryptoHash {
    let mut e = Encoder::new(protocol::Codec::Classic);
    for obj in objs {
        obj.encode(&mut e);
    }
    // the classic codec never fails
    hash(&e.finish().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{thread_rng, RngCore};

    use crate::protocol::SPECIFIER_COIN_OUTPUT;

    #[test]
    fn encode_decode() {
        let bytes = b"test";
        let hash = hash(bytes);
        let s: &str = &hash.to_string();
        assert_eq!(s.len(), 2 * HASH_LEN);
        let recovered: CryptoHash = s.try_into().unwrap();
        assert_eq!(recovered, hash);
        assert_eq!(s.parse::<CryptoHash>(), Ok(hash));
    }

    #[test]
    fn wrong_length() {
        assert_eq!("abcd".parse::<CryptoHash>(), Err(HashError::WrongLength(2)));
        assert!(matches!(
            "xyz".parse::<CryptoHash>(),
            Err(HashError::InvalidHex(_))
        ));
    }

    #[test]
    fn is_zero() {
        let mut h = CryptoHash::default();
        assert!(h.is_zero());

        let mut rng = thread_rng();
        rng.fill_bytes(&mut h.0);
        assert_eq!(h.is_zero(), false);
    }

    #[test]
    fn hash_all_concatenates() {
        let index = 3u64;
        let a = hash_all(&[&SPECIFIER_COIN_OUTPUT, &index]);
        let mut buf = SPECIFIER_COIN_OUTPUT.0.to_vec();
        buf.extend_from_slice(&3u64.to_le_bytes());
        assert_eq!(a, hash(&buf));
        assert_eq!(hash_obj(&index), hash(&3u64.to_le_bytes()));
    }

    #[test]
    fn json() {
        let h = hash(b"json");
        let s = serde_json::to_string(&h).unwrap();
        assert_eq!(s, format!("\"{}\"", h));
        assert_eq!(serde_json::from_str::<CryptoHash>(&s).unwrap(), h);
    }
}
