// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use ed25519::Signature;
use ed25519_dalek::{Keypair, SecretKey, Signer, Verifier, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

use super::CryptoHash;
use crate::protocol::{
    Codec, CodecError, Decodable, Decoder, Encodable, Encoder, Specifier, SPECIFIER_ED25519,
};

/// Tag of an unknown algorithm in the compact codec, followed by its full specifier.
const COMPACT_UNKNOWN_ALGORITHM: u8 = 0xff;

/// Identifies the signature algorithm a public key belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignatureAlgoType {
    Nil,
    Ed25519,
    /// An algorithm introduced after this software was written.
    /// Signatures made with it are accepted without verification.
    Unknown(Specifier),
}

impl Default for SignatureAlgoType {
    fn default() -> Self {
        SignatureAlgoType::Nil
    }
}

impl SignatureAlgoType {
    pub fn specifier(&self) -> Specifier {
        match self {
            SignatureAlgoType::Nil => Specifier::default(),
            SignatureAlgoType::Ed25519 => SPECIFIER_ED25519,
            SignatureAlgoType::Unknown(s) => *s,
        }
    }

    pub fn from_specifier(s: Specifier) -> Self {
        if s.is_zero() {
            SignatureAlgoType::Nil
        } else if s == SPECIFIER_ED25519 {
            SignatureAlgoType::Ed25519
        } else {
            SignatureAlgoType::Unknown(s)
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("nil public key cannot verify signatures")]
    NilKey,
    #[error("invalid ed25519 public key")]
    InvalidPublicKey,
    #[error("invalid ed25519 secret key")]
    InvalidSecretKey,
    #[error("invalid signature of {0} bytes")]
    InvalidSignature(usize),
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("cannot sign with algorithm {0:?}")]
    UnsupportedAlgorithm(SignatureAlgoType),
    #[error("invalid public key string: {0}")]
    InvalidString(String),
}

/// A public key tagged with its signature algorithm.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PublicKey {
    pub algorithm: SignatureAlgoType,
    pub key: Vec<u8>,
}

impl PublicKey {
    pub fn ed25519(pk: &ed25519_dalek::PublicKey) -> Self {
        Self {
            algorithm: SignatureAlgoType::Ed25519,
            key: pk.as_bytes().to_vec(),
        }
    }

    pub fn is_nil(&self) -> bool {
        self.algorithm == SignatureAlgoType::Nil
    }

    /// Returns true iff the algorithm is known and the key has the size that algorithm requires.
    pub fn is_standard(&self) -> bool {
        self.algorithm == SignatureAlgoType::Ed25519 && self.key.len() == PUBLIC_KEY_LENGTH
    }
}

impl From<&Keypair> for PublicKey {
    fn from(kp: &Keypair) -> Self {
        PublicKey::ed25519(&kp.public)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() && self.key.is_empty() {
            return Ok(());
        }
        write!(
            f,
            "{}:{}",
            self.algorithm.specifier(),
            HEXLOWER.encode(&self.key)
        )
    }
}

impl FromStr for PublicKey {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(PublicKey::default());
        }
        let (algo, key) = s
            .split_once(':')
            .ok_or_else(|| SignatureError::InvalidString(s.to_owned()))?;
        let spec: Specifier = algo
            .parse()
            .map_err(|_| SignatureError::InvalidString(s.to_owned()))?;
        let key = HEXLOWER_PERMISSIVE
            .decode(key.as_bytes())
            .map_err(|_| SignatureError::InvalidString(s.to_owned()))?;
        Ok(PublicKey {
            algorithm: SignatureAlgoType::from_specifier(spec),
            key,
        })
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl Encodable for PublicKey {
    fn encode(&self, e: &mut Encoder) {
        match e.codec() {
            Codec::Classic => {
                e.write(&self.algorithm.specifier());
                e.write_bytes(&self.key);
            }
            Codec::Compact => match self.algorithm {
                // both tags imply the key length, so it is not written
                SignatureAlgoType::Nil if !self.key.is_empty() => {
                    e.fail(CodecError::WrongLength {
                        expected: 0,
                        actual: self.key.len(),
                    })
                }
                SignatureAlgoType::Nil => e.write_u8(0),
                SignatureAlgoType::Ed25519 if self.key.len() != PUBLIC_KEY_LENGTH => {
                    e.fail(CodecError::WrongLength {
                        expected: PUBLIC_KEY_LENGTH,
                        actual: self.key.len(),
                    })
                }
                SignatureAlgoType::Ed25519 => {
                    e.write_u8(1);
                    e.write_fixed(&self.key);
                }
                SignatureAlgoType::Unknown(spec) => {
                    e.write_u8(COMPACT_UNKNOWN_ALGORITHM);
                    e.write(&spec);
                    e.write_bytes(&self.key);
                }
            },
        }
    }
}

impl Decodable for PublicKey {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        match d.codec() {
            Codec::Classic => {
                let spec: Specifier = d.read()?;
                Ok(PublicKey {
                    algorithm: SignatureAlgoType::from_specifier(spec),
                    key: d.read_bytes()?,
                })
            }
            Codec::Compact => match d.read_u8()? {
                0 => Ok(PublicKey::default()),
                1 => Ok(PublicKey {
                    algorithm: SignatureAlgoType::Ed25519,
                    key: d.read_fixed(PUBLIC_KEY_LENGTH)?.to_vec(),
                }),
                COMPACT_UNKNOWN_ALGORITHM => {
                    let spec: Specifier = d.read()?;
                    Ok(PublicKey {
                        algorithm: SignatureAlgoType::Unknown(spec),
                        key: d.read_bytes()?,
                    })
                }
                b => Err(CodecError::InvalidValue(format!(
                    "unknown compact signature algorithm {}",
                    b
                ))),
            },
        }
    }
}

/// Builds an ed25519 keypair from a 32-byte seed.
pub fn keypair_from_seed(seed: &[u8]) -> Result<Keypair, SignatureError> {
    let secret = SecretKey::from_bytes(seed).map_err(|_| SignatureError::InvalidSecretKey)?;
    let public: ed25519_dalek::PublicKey = (&secret).into();
    Ok(Keypair { secret, public })
}

/// Signs a hash with an ed25519 keypair.
pub fn sign_hash(kp: &Keypair, hash: &CryptoHash) -> Vec<u8> {
    kp.sign(&hash.0).to_bytes().to_vec()
}

/// Verifies a signature over a hash.
///
/// Keys of an unknown algorithm always verify, so that new algorithms can be
/// introduced without forking nodes that do not know them yet.
pub fn verify_hash(pk: &PublicKey, hash: &CryptoHash, sig: &[u8]) -> Result<(), SignatureError> {
    match pk.algorithm {
        SignatureAlgoType::Nil => Err(SignatureError::NilKey),
        SignatureAlgoType::Unknown(spec) => {
            debug!("accepting signature of unknown algorithm {}", spec);
            Ok(())
        }
        SignatureAlgoType::Ed25519 => {
            let (key, sig) = ed25519_parts(pk, sig)?;
            key.verify(&hash.0, &sig)
                .map_err(|_| SignatureError::VerificationFailed)
        }
    }
}

/// Parses the ed25519 key and signature, checking their sizes.
fn ed25519_parts(
    pk: &PublicKey,
    sig: &[u8],
) -> Result<(ed25519_dalek::PublicKey, Signature), SignatureError> {
    let key = ed25519_dalek::PublicKey::from_bytes(&pk.key)
        .map_err(|_| SignatureError::InvalidPublicKey)?;
    if sig.len() != SIGNATURE_LENGTH {
        return Err(SignatureError::InvalidSignature(sig.len()));
    }
    let sig = Signature::try_from(sig)
        .map_err(|_| SignatureError::InvalidSignature(SIGNATURE_LENGTH))?;
    Ok((key, sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{thread_rng, RngCore};

    use crate::crypto::hash;
    use crate::protocol::{decode, encode};

    pub(crate) fn new_kp() -> Keypair {
        let mut seed = [0; 32];
        thread_rng().fill_bytes(&mut seed);
        keypair_from_seed(&seed).unwrap()
    }

    #[test]
    fn sign_verify() {
        let kp = new_kp();
        let pk = PublicKey::from(&kp);
        let h = hash(b"message");
        let sig = sign_hash(&kp, &h);
        assert_eq!(verify_hash(&pk, &h, &sig), Ok(()));
        assert_eq!(
            verify_hash(&pk, &hash(b"other"), &sig),
            Err(SignatureError::VerificationFailed)
        );
        assert_eq!(
            verify_hash(&pk, &h, &[0; 64]),
            Err(SignatureError::VerificationFailed)
        );
        assert_eq!(
            verify_hash(&pk, &h, &sig[..10]),
            Err(SignatureError::InvalidSignature(10))
        );
    }

    #[test]
    fn unknown_algorithm_always_verifies() {
        let pk = PublicKey {
            algorithm: SignatureAlgoType::Unknown(Specifier::new(b"dilithium")),
            key: vec![1, 2, 3],
        };
        assert_eq!(verify_hash(&pk, &hash(b"x"), b"garbage"), Ok(()));
        assert_eq!(
            verify_hash(&PublicKey::default(), &hash(b"x"), b""),
            Err(SignatureError::NilKey)
        );
    }

    #[test]
    fn codecs() {
        let pk = PublicKey::from(&new_kp());
        let classic = encode(Codec::Classic, &pk).unwrap();
        assert_eq!(classic.len(), 16 + 8 + 32);
        assert_eq!(decode::<PublicKey>(Codec::Classic, &classic).unwrap(), pk);

        let compact = encode(Codec::Compact, &pk).unwrap();
        assert_eq!(compact.len(), 1 + 32);
        assert_eq!(decode::<PublicKey>(Codec::Compact, &compact).unwrap(), pk);

        let unknown = PublicKey {
            algorithm: SignatureAlgoType::Unknown(Specifier::new(b"future")),
            key: vec![9; 5],
        };
        for &codec in &[Codec::Classic, Codec::Compact] {
            let b = encode(codec, &unknown).unwrap();
            assert_eq!(decode::<PublicKey>(codec, &b).unwrap(), unknown);
        }
    }

    #[test]
    fn compact_requires_full_ed25519_keys() {
        let short: PublicKey = "ed25519:0102".parse().unwrap();
        let classic = encode(Codec::Classic, &short).unwrap();
        assert_eq!(decode::<PublicKey>(Codec::Classic, &classic).unwrap(), short);
        assert_eq!(
            encode(Codec::Compact, &short),
            Err(CodecError::WrongLength {
                expected: PUBLIC_KEY_LENGTH,
                actual: 2
            })
        );

        let nil_with_key = PublicKey {
            algorithm: SignatureAlgoType::Nil,
            key: vec![1],
        };
        assert!(encode(Codec::Compact, &nil_with_key).is_err());
    }

    #[test]
    fn string_form() {
        let pk = PublicKey::from(&new_kp());
        let s = pk.to_string();
        assert!(s.starts_with("ed25519:"));
        assert_eq!(s.parse::<PublicKey>().unwrap(), pk);
        assert_eq!("".parse::<PublicKey>().unwrap(), PublicKey::default());
        assert!("ed25519".parse::<PublicKey>().is_err());
        assert!("ed25519:zz".parse::<PublicKey>().is_err());
    }
}
