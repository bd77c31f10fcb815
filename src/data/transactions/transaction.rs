// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use rand::{thread_rng, RngCore};
use serde::{Deserialize, Serialize};

use super::*;
use crate::crypto::{self, CryptoHash, HashError};
use crate::data::basics::{hex_array, ByteSlice, Currency};
use crate::data::unlock::{Condition, Fulfillment, KeyMaterial};
use crate::protocol::{CodecError, Decodable, Decoder, Encodable, Encoder, TransactionVersion};

macro_rules! hash_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub CryptoHash);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = HashError;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                Ok($name(CryptoHash::try_from(s)?))
            }
        }

        impl FromStr for $name {
            type Err = HashError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::try_from(s)
            }
        }

        impl Encodable for $name {
            fn encode(&self, e: &mut Encoder) {
                self.0.encode(e);
            }
        }

        impl Decodable for $name {
            fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
                Ok($name(d.read()?))
            }
        }
    };
}

hash_id! {
    /// A hash uniquely identifying individual transactions.
    TransactionID
}

hash_id! {
    /// Identifies a coin output, derived from its transaction and index.
    CoinOutputID
}

hash_id! {
    /// Identifies a block stake output, derived from its transaction and index.
    BlockStakeOutputID
}

/// Number of bytes in a transaction nonce.
pub const TRANSACTION_NONCE_LEN: usize = 8;

/// Makes otherwise identical transactions distinct.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionNonce(#[serde(with = "hex_array")] pub [u8; TRANSACTION_NONCE_LEN]);

impl TransactionNonce {
    /// Returns a random nonce, which is never the nil nonce.
    pub fn random() -> Self {
        let mut nonce = Self::default();
        let mut rng = thread_rng();
        while nonce.is_nil() {
            rng.fill_bytes(&mut nonce.0);
        }
        nonce
    }

    pub fn is_nil(&self) -> bool {
        self.0 == [0; TRANSACTION_NONCE_LEN]
    }
}

impl Encodable for TransactionNonce {
    fn encode(&self, e: &mut Encoder) {
        e.write_fixed(&self.0);
    }
}

impl Decodable for TransactionNonce {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self(d.read_array()?))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinInput {
    #[serde(rename = "parentid")]
    pub parent_id: CoinOutputID,
    #[serde(default)]
    pub fulfillment: Fulfillment,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinOutput {
    pub value: Currency,
    #[serde(default)]
    pub condition: Condition,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStakeInput {
    #[serde(rename = "parentid")]
    pub parent_id: BlockStakeOutputID,
    #[serde(default)]
    pub fulfillment: Fulfillment,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStakeOutput {
    pub value: Currency,
    #[serde(default)]
    pub condition: Condition,
}

/// Version-specific data that does not fit the common transaction fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extension {
    None,
    CoinCreation(CoinCreationExtension),
    MinterDefinition(MinterDefinitionExtension),
    /// Raw body of a transaction whose version has no registered controller.
    Unknown(Vec<u8>),
}

impl Default for Extension {
    fn default() -> Self {
        Extension::None
    }
}

/// Describes a transaction that can appear in a block.
///
/// The layout on the wire depends on the version, so encoding, hashing and
/// validation all go through the controller registered for it in a
/// `TransactionRegistry`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    pub version: TransactionVersion,
    pub coin_inputs: Vec<CoinInput>,
    pub coin_outputs: Vec<CoinOutput>,
    pub block_stake_inputs: Vec<BlockStakeInput>,
    pub block_stake_outputs: Vec<BlockStakeOutput>,
    pub miner_fees: Vec<Currency>,
    pub arbitrary_data: ByteSlice,
    pub extension: Extension,
}

impl Transaction {
    pub fn new(version: TransactionVersion) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Sum of all coin outputs and miner fees.
    pub fn coin_output_sum(&self) -> Currency {
        self.coin_outputs
            .iter()
            .map(|co| &co.value)
            .chain(self.miner_fees.iter())
            .sum()
    }

    pub fn block_stake_output_sum(&self) -> Currency {
        self.block_stake_outputs.iter().map(|bso| &bso.value).sum()
    }

    /// A block creation transaction respends a single block stake output,
    /// and is exempt from paying miner fees.
    pub fn is_block_creating(&self) -> bool {
        self.coin_inputs.is_empty()
            && self.coin_outputs.is_empty()
            && self.block_stake_inputs.len() == 1
            && self.block_stake_outputs.len() == 1
    }

    /// Signs every input whose spent output is known and for which `key_for`
    /// yields key material. Returns the number of signed inputs.
    pub fn sign_inputs<'k>(
        &mut self,
        registry: &TransactionRegistry,
        outputs: &dyn OutputLookup,
        key_for: impl Fn(&Condition) -> Option<KeyMaterial<'k>>,
    ) -> Result<usize, TransactionError> {
        let controller = registry.controller(self.version)?;
        // legacy signature hashes cover the signer addresses,
        // which are only known once each input was signed a first time
        let passes = if self.version.is_legacy() { 2 } else { 1 };

        let mut signed = 0;
        for _ in 0..passes {
            let (coins, stakes) = {
                let signer = TransactionSigner::new(controller, self);
                let ctx = signer.context();

                let mut coins = Vec::new();
                for (i, ci) in self.coin_inputs.iter().enumerate() {
                    let condition = match outputs.coin_output(&ci.parent_id) {
                        Some(co) => &co.condition,
                        None => continue,
                    };
                    if let Some(key) = key_for(condition) {
                        coins.push((i, condition.sign(key, &ctx)?));
                    }
                }

                let mut stakes = Vec::new();
                for (i, bsi) in self.block_stake_inputs.iter().enumerate() {
                    let condition = match outputs.block_stake_output(&bsi.parent_id) {
                        Some(bso) => &bso.condition,
                        None => continue,
                    };
                    if let Some(key) = key_for(condition) {
                        stakes.push((i, condition.sign(key, &ctx)?));
                    }
                }
                (coins, stakes)
            };

            signed = coins.len() + stakes.len();
            for (i, f) in coins {
                self.coin_inputs[i].fulfillment = f;
            }
            for (i, f) in stakes {
                self.block_stake_inputs[i].fulfillment = f;
            }
        }
        Ok(signed)
    }

    /// Hash of the classic encoding of this transaction, version byte included,
    /// used for transactions whose version is unknown.
    pub(super) fn raw_id(version: TransactionVersion, body: &[u8]) -> TransactionID {
        let mut buf = Vec::with_capacity(1 + body.len());
        buf.push(version.0);
        buf.extend_from_slice(body);
        TransactionID(crypto::hash(&buf))
    }
}

impl Encodable for CoinInput {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.parent_id);
        e.write(&self.fulfillment);
    }
}

impl Decodable for CoinInput {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            parent_id: d.read()?,
            fulfillment: d.read()?,
        })
    }
}

impl Encodable for CoinOutput {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.value);
        e.write(&self.condition);
    }
}

impl Decodable for CoinOutput {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            value: d.read()?,
            condition: d.read()?,
        })
    }
}

impl Encodable for BlockStakeInput {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.parent_id);
        e.write(&self.fulfillment);
    }
}

impl Decodable for BlockStakeInput {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            parent_id: d.read()?,
            fulfillment: d.read()?,
        })
    }
}

impl Encodable for BlockStakeOutput {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.value);
        e.write(&self.condition);
    }
}

impl Decodable for BlockStakeOutput {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            value: d.read()?,
            condition: d.read()?,
        })
    }
}
