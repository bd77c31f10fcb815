// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use serde::{Deserialize, Serialize};

use super::*;
use crate::crypto::{self, CryptoHash};
use crate::data::basics::{base64_bytes, ByteSlice, Currency};
use crate::data::unlock::ExtraObject;
use crate::protocol::{Codec, Decoder, Encodable, Encoder, SPECIFIER_DEFAULT_TX};

/// Controller of the default transaction version,
/// which supports every condition and fulfillment type.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultTransactionController;

/// JSON layout of the common transaction fields.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(super) struct TransactionData {
    #[serde(rename = "coininputs", default)]
    pub coin_inputs: Vec<CoinInput>,
    #[serde(rename = "coinoutputs", default, skip_serializing_if = "Vec::is_empty")]
    pub coin_outputs: Vec<CoinOutput>,
    #[serde(rename = "blockstakeinputs", default, skip_serializing_if = "Vec::is_empty")]
    pub block_stake_inputs: Vec<BlockStakeInput>,
    #[serde(rename = "blockstakeoutputs", default, skip_serializing_if = "Vec::is_empty")]
    pub block_stake_outputs: Vec<BlockStakeOutput>,
    #[serde(rename = "minerfees", default)]
    pub miner_fees: Vec<Currency>,
    #[serde(
        rename = "arbitrarydata",
        default,
        with = "base64_bytes",
        skip_serializing_if = "<[u8]>::is_empty"
    )]
    pub arbitrary_data: ByteSlice,
}

impl TransactionController for DefaultTransactionController {
    fn encode_body(&self, e: &mut Encoder, tx: &Transaction) -> Result<(), TransactionError> {
        if tx.extension != Extension::None {
            return Err(TransactionError::UnexpectedExtension(tx.version));
        }
        e.write_nested(|e| {
            e.write(&tx.coin_inputs);
            e.write(&tx.coin_outputs);
            e.write(&tx.block_stake_inputs);
            e.write(&tx.block_stake_outputs);
            e.write(&tx.miner_fees);
            e.write(&tx.arbitrary_data);
        });
        Ok(())
    }

    fn decode_body(&self, d: &mut Decoder) -> Result<Transaction, TransactionError> {
        let tx = d.read_nested(|d| {
            Ok(Transaction {
                coin_inputs: d.read()?,
                coin_outputs: d.read()?,
                block_stake_inputs: d.read()?,
                block_stake_outputs: d.read()?,
                miner_fees: d.read()?,
                arbitrary_data: d.read()?,
                ..Transaction::default()
            })
        })?;
        Ok(tx)
    }

    fn to_json(&self, tx: &Transaction) -> Result<serde_json::Value, TransactionError> {
        if tx.extension != Extension::None {
            return Err(TransactionError::UnexpectedExtension(tx.version));
        }
        let data = TransactionData {
            coin_inputs: tx.coin_inputs.clone(),
            coin_outputs: tx.coin_outputs.clone(),
            block_stake_inputs: tx.block_stake_inputs.clone(),
            block_stake_outputs: tx.block_stake_outputs.clone(),
            miner_fees: tx.miner_fees.clone(),
            arbitrary_data: tx.arbitrary_data.clone(),
        };
        Ok(serde_json::to_value(data)?)
    }

    fn from_json(&self, data: serde_json::Value) -> Result<Transaction, TransactionError> {
        let data: TransactionData = serde_json::from_value(data)?;
        Ok(Transaction {
            coin_inputs: data.coin_inputs,
            coin_outputs: data.coin_outputs,
            block_stake_inputs: data.block_stake_inputs,
            block_stake_outputs: data.block_stake_outputs,
            miner_fees: data.miner_fees,
            arbitrary_data: data.arbitrary_data,
            ..Transaction::default()
        })
    }
}

/// Signature hash of all non-legacy versions without a specialized layout.
///
/// Covers the version, the spent output IDs, all outputs, the fees and the
/// arbitrary data, followed by the extra objects of the fulfillment.
/// Fulfillments themselves are never covered.
pub fn default_signature_hash(tx: &Transaction, extra_objects: &[ExtraObject]) -> CryptoHash {
    let mut e = Encoder::new(Codec::Classic);
    e.write_u8(tx.version.0);
    e.write(&SPECIFIER_DEFAULT_TX);
    e.write_len(tx.coin_inputs.len());
    for ci in &tx.coin_inputs {
        e.write(&ci.parent_id);
    }
    e.write(&tx.coin_outputs);
    e.write_len(tx.block_stake_inputs.len());
    for bsi in &tx.block_stake_inputs {
        e.write(&bsi.parent_id);
    }
    e.write(&tx.block_stake_outputs);
    e.write(&tx.miner_fees);
    e.write(&tx.arbitrary_data);
    for obj in extra_objects {
        obj.encode(&mut e);
    }
    // the classic codec never fails
    crypto::hash(&e.finish().unwrap_or_default())
}
