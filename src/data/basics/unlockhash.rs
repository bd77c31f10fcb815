// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::fmt;
use std::str::FromStr;

use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::crypto::{self, CryptoHash, PublicKey, HASH_LEN};
use crate::protocol::{CodecError, Decodable, Decoder, Encodable, Encoder};

const CHECKSUM_LEN: usize = 6;

/// Length of the human-readable form: hex of type byte, hash and checksum.
pub const UNLOCK_HASH_STRING_LEN: usize = 2 * (1 + HASH_LEN + CHECKSUM_LEN);

/// Identifies what kind of condition an unlock hash was derived from.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnlockType(pub u8);

impl UnlockType {
    pub const NIL: UnlockType = UnlockType(0);
    pub const PUBLIC_KEY: UnlockType = UnlockType(1);
    pub const ATOMIC_SWAP: UnlockType = UnlockType(2);
    pub const MULTI_SIG: UnlockType = UnlockType(3);
    /// Derived from a condition type this software does not know.
    pub const CUSTOM: UnlockType = UnlockType(4);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum UnlockHashError {
    #[error("unlock hash string has wrong length {0}, expected {}", UNLOCK_HASH_STRING_LEN)]
    WrongLength(usize),
    #[error("unlock hash string is not valid hex")]
    InvalidHex,
    #[error("unlock hash has an invalid checksum")]
    InvalidChecksum,
}

/// A typed hash identifying a condition, used as an address.
/// Ordered by type first, then by hash.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnlockHash {
    pub unlock_type: UnlockType,
    pub hash: CryptoHash,
}

/// The unlock hash of the nil condition.
pub const NIL_UNLOCK_HASH: UnlockHash = UnlockHash {
    unlock_type: UnlockType::NIL,
    hash: CryptoHash([0; HASH_LEN]),
};

impl UnlockHash {
    pub fn new(unlock_type: UnlockType, hash: CryptoHash) -> Self {
        Self { unlock_type, hash }
    }

    /// The address of a single public key.
    pub fn from_public_key(pk: &PublicKey) -> Self {
        Self::new(UnlockType::PUBLIC_KEY, crypto::hash_obj(pk))
    }

    /// Checksum appended to the string form: the first bytes of the hash of the hash.
    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let h = crypto::hash(&self.hash.0);
        let mut out = [0; CHECKSUM_LEN];
        out.copy_from_slice(&h.0[..CHECKSUM_LEN]);
        out
    }

    pub fn is_nil(&self) -> bool {
        *self == NIL_UNLOCK_HASH
    }
}

impl fmt::Display for UnlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; 1 + HASH_LEN + CHECKSUM_LEN];
        buf[0] = self.unlock_type.0;
        buf[1..=HASH_LEN].copy_from_slice(&self.hash.0);
        buf[1 + HASH_LEN..].copy_from_slice(&self.checksum());
        f.write_str(&HEXLOWER.encode(&buf))
    }
}

impl FromStr for UnlockHash {
    type Err = UnlockHashError;

    /// Parses the checksummed string form.
    /// The checksum is validated and then dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != UNLOCK_HASH_STRING_LEN {
            return Err(UnlockHashError::WrongLength(s.len()));
        }
        let decoded = HEXLOWER_PERMISSIVE
            .decode(s.as_bytes())
            .map_err(|_| UnlockHashError::InvalidHex)?;

        let mut uh = UnlockHash {
            unlock_type: UnlockType(decoded[0]),
            ..Default::default()
        };
        uh.hash.0.copy_from_slice(&decoded[1..=HASH_LEN]);
        if decoded[1 + HASH_LEN..] != uh.checksum() {
            return Err(UnlockHashError::InvalidChecksum);
        }
        Ok(uh)
    }
}

impl Serialize for UnlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for UnlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// The binary form omits the checksum.
impl Encodable for UnlockHash {
    fn encode(&self, e: &mut Encoder) {
        e.write_u8(self.unlock_type.0);
        e.write(&self.hash);
    }
}

impl Decodable for UnlockHash {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            unlock_type: UnlockType(d.read_u8()?),
            hash: d.read()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{thread_rng, RngCore};

    use crate::protocol::encode_classic;

    fn random_uh() -> UnlockHash {
        let mut h = CryptoHash::default();
        thread_rng().fill_bytes(&mut h.0);
        UnlockHash::new(UnlockType::PUBLIC_KEY, h)
    }

    #[test]
    fn string_round_trip() {
        let uh = random_uh();
        let s = uh.to_string();
        assert_eq!(s.len(), UNLOCK_HASH_STRING_LEN);
        assert!(s.starts_with("01"));
        assert_eq!(s.parse::<UnlockHash>(), Ok(uh));
    }

    #[test]
    fn nil_string() {
        let s = NIL_UNLOCK_HASH.to_string();
        assert!(s.starts_with(&"0".repeat(66)));
        assert_eq!(s.parse::<UnlockHash>(), Ok(NIL_UNLOCK_HASH));
    }

    #[test]
    fn wrong_length() {
        assert_eq!("".parse::<UnlockHash>(), Err(UnlockHashError::WrongLength(0)));
        let mut s = random_uh().to_string();
        s.push('0');
        assert_eq!(
            s.parse::<UnlockHash>(),
            Err(UnlockHashError::WrongLength(UNLOCK_HASH_STRING_LEN + 1))
        );
    }

    #[test]
    fn invalid_hex() {
        let mut s = random_uh().to_string();
        s.replace_range(0..1, "z");
        assert_eq!(s.parse::<UnlockHash>(), Err(UnlockHashError::InvalidHex));
    }

    #[test]
    fn every_checksum_byte_is_checked() {
        let uh = random_uh();
        let s = uh.to_string();
        let checksum_start = 2 * (1 + HASH_LEN);
        for i in checksum_start..s.len() {
            let mut bytes = s.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(bytes).unwrap();
            assert_eq!(
                mutated.parse::<UnlockHash>(),
                Err(UnlockHashError::InvalidChecksum),
                "mutated position {}",
                i
            );
        }
    }

    #[test]
    fn mutated_hash_with_new_checksum_is_valid_but_different() {
        let uh = random_uh();
        let mut other = uh;
        other.hash.0[7] ^= 0xff;
        let s = other.to_string();
        assert_ne!(s, uh.to_string());
        assert_eq!(s.parse::<UnlockHash>(), Ok(other));
        assert_ne!(other, uh);
    }

    #[test]
    fn binary_omits_checksum() {
        let uh = random_uh();
        let enc = encode_classic(&uh);
        assert_eq!(enc.len(), 1 + HASH_LEN);
        assert_eq!(enc[0], 1);
    }

    #[test]
    fn json() {
        let uh = random_uh();
        let s = serde_json::to_string(&uh).unwrap();
        assert_eq!(serde_json::from_str::<UnlockHash>(&s).unwrap(), uh);
    }

    #[test]
    fn ordering() {
        let a = UnlockHash::new(UnlockType::PUBLIC_KEY, CryptoHash([9; HASH_LEN]));
        let b = UnlockHash::new(UnlockType::MULTI_SIG, CryptoHash([1; HASH_LEN]));
        assert!(a < b);
    }
}
