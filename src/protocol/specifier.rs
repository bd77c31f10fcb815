// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::codec::{CodecError, Decodable, Decoder, Encodable, Encoder};

/// Number of bytes in a specifier.
pub const SPECIFIER_LEN: usize = 16;

/// Domain separation prefix for an object type that might be hashed.
/// This ensures, for example, the ID of a coin output will never collide with the ID of a block stake output.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specifier(pub [u8; SPECIFIER_LEN]);

impl Specifier {
    /// Creates a specifier from an ASCII tag, padded with zeros.
    /// Tags longer than 16 bytes are truncated.
    pub const fn new(tag: &[u8]) -> Self {
        let mut buf = [0; SPECIFIER_LEN];
        let mut i = 0;
        while i < tag.len() && i < SPECIFIER_LEN {
            buf[i] = tag[i];
            i += 1;
        }
        Specifier(buf)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; SPECIFIER_LEN]
    }
}

// Specifiers for specific object types, in lexicographic order.
// Specifiers must be unique within the protocol!
pub const SPECIFIER_BLOCK_STAKE_INPUT: Specifier = Specifier::new(b"blstake input");
pub const SPECIFIER_BLOCK_STAKE_OUTPUT: Specifier = Specifier::new(b"blstake output");
pub const SPECIFIER_COIN_CREATION_TX: Specifier = Specifier::new(b"coin mint tx");
pub const SPECIFIER_COIN_INPUT: Specifier = Specifier::new(b"coin input");
pub const SPECIFIER_COIN_OUTPUT: Specifier = Specifier::new(b"coin output");
pub const SPECIFIER_DEFAULT_TX: Specifier = Specifier::new(b"default tx");
pub const SPECIFIER_ED25519: Specifier = Specifier::new(b"ed25519");
pub const SPECIFIER_MINER_FEE: Specifier = Specifier::new(b"miner fee");
pub const SPECIFIER_MINER_PAYOUT: Specifier = Specifier::new(b"miner payout");
pub const SPECIFIER_MINTER_DEFINITION_TX: Specifier = Specifier::new(b"minter defin tx");

impl fmt::Display for Specifier {
    /// Displays the tag bytes trimmed at the first zero byte.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(SPECIFIER_LEN);
        f.write_str(&String::from_utf8_lossy(&self.0[..end]))
    }
}

impl fmt::Debug for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Specifier({:?})", self.to_string())
    }
}

impl std::str::FromStr for Specifier {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > SPECIFIER_LEN {
            return Err(CodecError::WrongLength {
                expected: SPECIFIER_LEN,
                actual: s.len(),
            });
        }
        Ok(Specifier::new(s.as_bytes()))
    }
}

impl Encodable for Specifier {
    fn encode(&self, e: &mut Encoder) {
        e.write_fixed(&self.0);
    }
}

impl Decodable for Specifier {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Specifier(d.read_array()?))
    }
}

impl Serialize for Specifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Specifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
