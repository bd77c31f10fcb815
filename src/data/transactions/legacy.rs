// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

//! The original transaction layout.
//!
//! Outputs can only be locked by an unlock hash, and every input carries
//! a so-called input lock: the unlock type, followed by the condition and
//! fulfillment the input is spent with.

use std::convert::TryFrom;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::*;
use crate::crypto::{self, CryptoHash, PublicKey};
use crate::data::basics::{
    base64_bytes, ByteSlice, Currency, UnlockHash, UnlockType, NIL_UNLOCK_HASH,
};
use crate::data::unlock::{
    AtomicSwapCondition, AtomicSwapFulfillment, AtomicSwapSecret, Condition, ExtraObject,
    Fulfillment, LegacyAtomicSwapFulfillment, SingleSignatureFulfillment,
};
use crate::protocol::{
    Codec, CodecError, Decodable, Decoder, Encodable, Encoder, TRANSACTION_VERSION_ZERO,
};

/// Controller of version zero transactions.
#[derive(Clone, Copy, Debug, Default)]
pub struct LegacyTransactionController;

/// Fulfillments that can be expressed as an input lock.
#[derive(Clone, Debug, PartialEq, Eq)]
enum InputLock {
    SingleSignature(SingleSignatureFulfillment),
    AtomicSwap(LegacyAtomicSwapFulfillment),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct LegacyInput<ID> {
    #[serde(rename = "parentid")]
    parent_id: ID,
    unlocker: InputLock,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct LegacyOutput {
    value: Currency,
    #[serde(rename = "unlockhash")]
    unlock_hash: UnlockHash,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LegacyTransactionData {
    #[serde(rename = "coininputs", default)]
    coin_inputs: Vec<LegacyInput<CoinOutputID>>,
    #[serde(rename = "coinoutputs", default, skip_serializing_if = "Vec::is_empty")]
    coin_outputs: Vec<LegacyOutput>,
    #[serde(rename = "blockstakeinputs", default, skip_serializing_if = "Vec::is_empty")]
    block_stake_inputs: Vec<LegacyInput<BlockStakeOutputID>>,
    #[serde(rename = "blockstakeoutputs", default, skip_serializing_if = "Vec::is_empty")]
    block_stake_outputs: Vec<LegacyOutput>,
    #[serde(rename = "minerfees", default)]
    miner_fees: Vec<Currency>,
    #[serde(
        rename = "arbitrarydata",
        default,
        with = "base64_bytes",
        skip_serializing_if = "<[u8]>::is_empty"
    )]
    arbitrary_data: ByteSlice,
}

fn unrepresentable(what: &'static str) -> TransactionError {
    TransactionError::Unrepresentable {
        version: TRANSACTION_VERSION_ZERO,
        what,
    }
}

impl TryFrom<&Fulfillment> for InputLock {
    type Error = TransactionError;

    fn try_from(f: &Fulfillment) -> Result<Self, Self::Error> {
        match f {
            Fulfillment::SingleSignature(ss) => Ok(InputLock::SingleSignature(ss.clone())),
            Fulfillment::LegacyAtomicSwap(las) => Ok(InputLock::AtomicSwap(las.clone())),
            Fulfillment::Nil => Err(unrepresentable("unsigned inputs")),
            _ => Err(unrepresentable("this fulfillment type")),
        }
    }
}

impl From<InputLock> for Fulfillment {
    fn from(lock: InputLock) -> Self {
        match lock {
            InputLock::SingleSignature(ss) => Fulfillment::SingleSignature(ss),
            InputLock::AtomicSwap(las) => Fulfillment::LegacyAtomicSwap(las),
        }
    }
}

/// Only unlock hash conditions can be stored, the nil condition as the nil unlock hash.
fn legacy_output(value: &Currency, condition: &Condition) -> Result<LegacyOutput, TransactionError> {
    let unlock_hash = match condition {
        Condition::Nil => NIL_UNLOCK_HASH,
        Condition::UnlockHash(c) => c.target,
        _ => return Err(unrepresentable("this condition type")),
    };
    Ok(LegacyOutput {
        value: value.clone(),
        unlock_hash,
    })
}

impl TryFrom<&Transaction> for LegacyTransactionData {
    type Error = TransactionError;

    fn try_from(tx: &Transaction) -> Result<Self, Self::Error> {
        if tx.extension != Extension::None {
            return Err(TransactionError::UnexpectedExtension(tx.version));
        }
        Ok(Self {
            coin_inputs: tx
                .coin_inputs
                .iter()
                .map(|ci| {
                    Ok(LegacyInput {
                        parent_id: ci.parent_id,
                        unlocker: InputLock::try_from(&ci.fulfillment)?,
                    })
                })
                .collect::<Result<_, TransactionError>>()?,
            coin_outputs: tx
                .coin_outputs
                .iter()
                .map(|co| legacy_output(&co.value, &co.condition))
                .collect::<Result<_, _>>()?,
            block_stake_inputs: tx
                .block_stake_inputs
                .iter()
                .map(|bsi| {
                    Ok(LegacyInput {
                        parent_id: bsi.parent_id,
                        unlocker: InputLock::try_from(&bsi.fulfillment)?,
                    })
                })
                .collect::<Result<_, TransactionError>>()?,
            block_stake_outputs: tx
                .block_stake_outputs
                .iter()
                .map(|bso| legacy_output(&bso.value, &bso.condition))
                .collect::<Result<_, _>>()?,
            miner_fees: tx.miner_fees.clone(),
            arbitrary_data: tx.arbitrary_data.clone(),
        })
    }
}

impl From<LegacyTransactionData> for Transaction {
    fn from(data: LegacyTransactionData) -> Self {
        Transaction {
            version: TRANSACTION_VERSION_ZERO,
            coin_inputs: data
                .coin_inputs
                .into_iter()
                .map(|li| CoinInput {
                    parent_id: li.parent_id,
                    fulfillment: li.unlocker.into(),
                })
                .collect(),
            coin_outputs: data
                .coin_outputs
                .into_iter()
                .map(|lo| CoinOutput {
                    value: lo.value,
                    condition: Condition::from(lo.unlock_hash),
                })
                .collect(),
            block_stake_inputs: data
                .block_stake_inputs
                .into_iter()
                .map(|li| BlockStakeInput {
                    parent_id: li.parent_id,
                    fulfillment: li.unlocker.into(),
                })
                .collect(),
            block_stake_outputs: data
                .block_stake_outputs
                .into_iter()
                .map(|lo| BlockStakeOutput {
                    value: lo.value,
                    condition: Condition::from(lo.unlock_hash),
                })
                .collect(),
            miner_fees: data.miner_fees,
            arbitrary_data: data.arbitrary_data,
            extension: Extension::None,
        }
    }
}

impl TransactionController for LegacyTransactionController {
    fn encode_body(&self, e: &mut Encoder, tx: &Transaction) -> Result<(), TransactionError> {
        e.write(&LegacyTransactionData::try_from(tx)?);
        Ok(())
    }

    fn decode_body(&self, d: &mut Decoder) -> Result<Transaction, TransactionError> {
        let data: LegacyTransactionData = d.read()?;
        Ok(data.into())
    }

    fn to_json(&self, tx: &Transaction) -> Result<serde_json::Value, TransactionError> {
        Ok(serde_json::to_value(LegacyTransactionData::try_from(tx)?)?)
    }

    fn from_json(&self, data: serde_json::Value) -> Result<Transaction, TransactionError> {
        let data: LegacyTransactionData = serde_json::from_value(data)?;
        Ok(data.into())
    }

    /// The legacy body, without the version byte.
    fn id_input(&self, e: &mut Encoder, tx: &Transaction) -> Result<(), TransactionError> {
        self.encode_body(e, tx)
    }

    /// Legacy signature hashes identify inputs by the address of their signer,
    /// and outputs by their plain unlock hash.
    fn signature_hash(
        &self,
        tx: &Transaction,
        extra_objects: &[ExtraObject],
    ) -> Result<CryptoHash, TransactionError> {
        let mut e = Encoder::new(Codec::Classic);
        for obj in extra_objects {
            e.write(obj);
        }
        for ci in &tx.coin_inputs {
            e.write(&ci.parent_id);
            e.write(&signer_unlock_hash(&ci.fulfillment));
        }
        e.write_len(tx.coin_outputs.len());
        for co in &tx.coin_outputs {
            e.write(&legacy_output(&co.value, &co.condition)?);
        }
        for bsi in &tx.block_stake_inputs {
            e.write(&bsi.parent_id);
            e.write(&signer_unlock_hash(&bsi.fulfillment));
        }
        e.write_len(tx.block_stake_outputs.len());
        for bso in &tx.block_stake_outputs {
            e.write(&legacy_output(&bso.value, &bso.condition)?);
        }
        e.write(&tx.miner_fees);
        e.write(&tx.arbitrary_data);
        Ok(crypto::hash(&e.finish()?))
    }
}

/// The address an input was signed for, as far as its fulfillment tells.
fn signer_unlock_hash(f: &Fulfillment) -> UnlockHash {
    match f {
        Fulfillment::SingleSignature(ss) => UnlockHash::from_public_key(&ss.public_key),
        Fulfillment::LegacyAtomicSwap(las) => las.condition().unlock_hash(),
        _ => NIL_UNLOCK_HASH,
    }
}

impl Transaction {
    /// Transaction ID as computed before transactions were versioned:
    /// the hash of the six legacy fields, each encoded on its own.
    ///
    /// Equals `TransactionRegistry::id` for version zero transactions only.
    pub fn legacy_id(&self) -> Result<TransactionID, TransactionError> {
        let data = LegacyTransactionData::try_from(self)?;
        Ok(TransactionID(crypto::hash_all(&[
            &data.coin_inputs,
            &data.coin_outputs,
            &data.block_stake_inputs,
            &data.block_stake_outputs,
            &data.miner_fees,
            &data.arbitrary_data,
        ])))
    }
}

impl Encodable for InputLock {
    fn encode(&self, e: &mut Encoder) {
        match self {
            InputLock::SingleSignature(ss) => {
                e.write_u8(UnlockType::PUBLIC_KEY.0);
                e.write_nested(|e| e.write(&ss.public_key));
                e.write(&ss.signature);
            }
            InputLock::AtomicSwap(las) => {
                e.write_u8(UnlockType::ATOMIC_SWAP.0);
                e.write_nested(|e| e.write(&las.condition()));
                e.write_nested(|e| {
                    e.write(&las.public_key);
                    e.write(&las.signature);
                    e.write(&las.secret.unwrap_or_default());
                });
            }
        }
    }
}

impl Decodable for InputLock {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        match UnlockType(d.read_u8()?) {
            UnlockType::PUBLIC_KEY => {
                let public_key = d.read_nested(|d| d.read())?;
                Ok(InputLock::SingleSignature(SingleSignatureFulfillment {
                    public_key,
                    signature: d.read()?,
                }))
            }
            UnlockType::ATOMIC_SWAP => {
                let condition: AtomicSwapCondition = d.read_nested(|d| d.read())?;
                let (public_key, signature, secret) = d.read_nested(|d| {
                    let public_key: PublicKey = d.read()?;
                    let signature: ByteSlice = d.read()?;
                    let secret: AtomicSwapSecret = d.read()?;
                    Ok((public_key, signature, secret))
                })?;
                Ok(InputLock::AtomicSwap(LegacyAtomicSwapFulfillment {
                    sender: condition.sender,
                    receiver: condition.receiver,
                    hashed_secret: condition.hashed_secret,
                    time_lock: condition.time_lock,
                    public_key,
                    signature,
                    secret: if secret.is_zero() { None } else { Some(secret) },
                }))
            }
            t => Err(CodecError::InvalidValue(format!(
                "unlock type {} cannot be used in an input lock",
                t.0
            ))),
        }
    }
}

impl<ID: Encodable> Encodable for LegacyInput<ID> {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.parent_id);
        e.write(&self.unlocker);
    }
}

impl<ID: Decodable> Decodable for LegacyInput<ID> {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            parent_id: d.read()?,
            unlocker: d.read()?,
        })
    }
}

impl Encodable for LegacyOutput {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.value);
        e.write(&self.unlock_hash);
    }
}

impl Decodable for LegacyOutput {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            value: d.read()?,
            unlock_hash: d.read()?,
        })
    }
}

impl Encodable for LegacyTransactionData {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.coin_inputs);
        e.write(&self.coin_outputs);
        e.write(&self.block_stake_inputs);
        e.write(&self.block_stake_outputs);
        e.write(&self.miner_fees);
        e.write(&self.arbitrary_data);
    }
}

impl Decodable for LegacyTransactionData {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            coin_inputs: d.read()?,
            coin_outputs: d.read()?,
            block_stake_inputs: d.read()?,
            block_stake_outputs: d.read()?,
            miner_fees: d.read()?,
            arbitrary_data: d.read()?,
        })
    }
}

/// JSON form of an input lock.
#[derive(Serialize, Deserialize)]
struct InputLockProxy {
    #[serde(rename = "type", default)]
    unlock_type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fulfillment: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize)]
struct PublicKeyLockCondition {
    #[serde(rename = "publickey")]
    public_key: PublicKey,
}

#[derive(Serialize, Deserialize)]
struct PublicKeyLockFulfillment {
    signature: ByteSlice,
}

impl Serialize for InputLock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error;

        let proxy = match self {
            InputLock::SingleSignature(ss) => InputLockProxy {
                unlock_type: UnlockType::PUBLIC_KEY.0,
                condition: Some(
                    serde_json::to_value(PublicKeyLockCondition {
                        public_key: ss.public_key.clone(),
                    })
                    .map_err(S::Error::custom)?,
                ),
                fulfillment: Some(
                    serde_json::to_value(PublicKeyLockFulfillment {
                        signature: ss.signature.clone(),
                    })
                    .map_err(S::Error::custom)?,
                ),
            },
            InputLock::AtomicSwap(las) => InputLockProxy {
                unlock_type: UnlockType::ATOMIC_SWAP.0,
                condition: Some(serde_json::to_value(las.condition()).map_err(S::Error::custom)?),
                fulfillment: Some(
                    serde_json::to_value(AtomicSwapFulfillment {
                        public_key: las.public_key.clone(),
                        signature: las.signature.clone(),
                        secret: las.secret,
                    })
                    .map_err(S::Error::custom)?,
                ),
            },
        };
        proxy.serialize(serializer)
    }
}

fn proxy_field<T: DeserializeOwned, E: de::Error>(
    value: Option<serde_json::Value>,
    name: &'static str,
) -> Result<T, E> {
    let value = value.ok_or_else(|| E::missing_field(name))?;
    serde_json::from_value(value).map_err(E::custom)
}

impl<'de> Deserialize<'de> for InputLock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = InputLockProxy::deserialize(deserializer)?;
        match UnlockType(proxy.unlock_type) {
            UnlockType::PUBLIC_KEY => {
                let c: PublicKeyLockCondition =
                    proxy_field::<_, D::Error>(proxy.condition, "condition")?;
                let f: PublicKeyLockFulfillment =
                    proxy_field::<_, D::Error>(proxy.fulfillment, "fulfillment")?;
                Ok(InputLock::SingleSignature(SingleSignatureFulfillment {
                    public_key: c.public_key,
                    signature: f.signature,
                }))
            }
            UnlockType::ATOMIC_SWAP => {
                let c: AtomicSwapCondition =
                    proxy_field::<_, D::Error>(proxy.condition, "condition")?;
                let f: AtomicSwapFulfillment =
                    proxy_field::<_, D::Error>(proxy.fulfillment, "fulfillment")?;
                Ok(InputLock::AtomicSwap(LegacyAtomicSwapFulfillment {
                    sender: c.sender,
                    receiver: c.receiver,
                    hashed_secret: c.hashed_secret,
                    time_lock: c.time_lock,
                    public_key: f.public_key,
                    signature: f.signature,
                    secret: f.secret,
                }))
            }
            t => Err(de::Error::custom(format!(
                "unlock type {} cannot be used in an input lock",
                t.0
            ))),
        }
    }
}
