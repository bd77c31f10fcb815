// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

//! Transactions authorized by the network-wide mint condition,
//! rather than by the outputs they spend.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::*;
use crate::crypto::{self, CryptoHash};
use crate::data::basics::{base64_bytes, BlockHeight, ByteSlice, Currency, UnlockType};
use crate::data::unlock::{Condition, ExtraObject, Fulfillment, KeyMaterial};
use crate::protocol::{
    Codec, Decoder, Encodable, Encoder, Specifier, TransactionVersion,
    SPECIFIER_COIN_CREATION_TX, SPECIFIER_MINTER_DEFINITION_TX,
    TRANSACTION_VERSION_MINTER_DEFINITION,
};

/// Extension data of a coin creation transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoinCreationExtension {
    pub nonce: TransactionNonce,
    /// Fulfills the mint condition active at the height the transaction is included at.
    pub mint_fulfillment: Fulfillment,
}

/// Extension data of a minter definition transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MinterDefinitionExtension {
    pub nonce: TransactionNonce,
    pub mint_fulfillment: Fulfillment,
    /// Replaces the current mint condition.
    pub mint_condition: Condition,
}

impl CoinCreationExtension {
    /// Unsigned extension with a fresh nonce.
    pub fn new() -> Self {
        Self {
            nonce: TransactionNonce::random(),
            mint_fulfillment: Fulfillment::Nil,
        }
    }
}

impl MinterDefinitionExtension {
    /// Unsigned extension with a fresh nonce.
    pub fn new(mint_condition: Condition) -> Self {
        Self {
            nonce: TransactionNonce::random(),
            mint_fulfillment: Fulfillment::Nil,
            mint_condition,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CoinCreationData {
    nonce: TransactionNonce,
    #[serde(rename = "mintfulfillment", default)]
    mint_fulfillment: Fulfillment,
    #[serde(rename = "coinoutputs", default)]
    coin_outputs: Vec<CoinOutput>,
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

#[derive(Serialize, Deserialize)]
struct MinterDefinitionData {
    nonce: TransactionNonce,
    #[serde(rename = "mintfulfillment", default)]
    mint_fulfillment: Fulfillment,
    #[serde(rename = "mintcondition", default)]
    mint_condition: Condition,
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

/// Controller of coin creation transactions,
/// which create coin outputs without spending any.
#[derive(Clone)]
pub struct CoinCreationTransactionController {
    mint_conditions: Arc<dyn MintConditionGetter>,
}

/// Controller of minter definition transactions,
/// which replace the mint condition.
#[derive(Clone)]
pub struct MinterDefinitionTransactionController {
    mint_conditions: Arc<dyn MintConditionGetter>,
}

impl CoinCreationTransactionController {
    pub fn new(mint_conditions: Arc<dyn MintConditionGetter>) -> Self {
        Self { mint_conditions }
    }

    /// Returns the extension, after checking that the common fields fit the layout.
    fn extension<'t>(
        &self,
        tx: &'t Transaction,
    ) -> Result<&'t CoinCreationExtension, TransactionError> {
        let ext = match &tx.extension {
            Extension::CoinCreation(ext) => ext,
            _ => return Err(TransactionError::UnexpectedExtension(tx.version)),
        };
        if !tx.coin_inputs.is_empty() {
            return Err(unrepresentable(tx.version, "coin inputs"));
        }
        if !tx.block_stake_inputs.is_empty() || !tx.block_stake_outputs.is_empty() {
            return Err(unrepresentable(tx.version, "block stakes"));
        }
        if tx.coin_outputs.is_empty() {
            return Err(missing(tx.version, "at least one coin output"));
        }
        if tx.miner_fees.is_empty() {
            return Err(missing(tx.version, "at least one miner fee"));
        }
        Ok(ext)
    }
}

impl MinterDefinitionTransactionController {
    pub fn new(mint_conditions: Arc<dyn MintConditionGetter>) -> Self {
        Self { mint_conditions }
    }

    fn extension<'t>(
        &self,
        tx: &'t Transaction,
    ) -> Result<&'t MinterDefinitionExtension, TransactionError> {
        let ext = match &tx.extension {
            Extension::MinterDefinition(ext) => ext,
            _ => return Err(TransactionError::UnexpectedExtension(tx.version)),
        };
        if !tx.coin_inputs.is_empty() || !tx.coin_outputs.is_empty() {
            return Err(unrepresentable(tx.version, "coins"));
        }
        if !tx.block_stake_inputs.is_empty() || !tx.block_stake_outputs.is_empty() {
            return Err(unrepresentable(tx.version, "block stakes"));
        }
        if tx.miner_fees.is_empty() {
            return Err(missing(tx.version, "at least one miner fee"));
        }
        Ok(ext)
    }
}

fn unrepresentable(version: TransactionVersion, what: &'static str) -> TransactionError {
    TransactionError::Unrepresentable { version, what }
}

fn missing(version: TransactionVersion, what: &'static str) -> TransactionError {
    TransactionError::MissingField { version, what }
}

/// Signature hash shared by both mint transaction types:
/// version, specifier and nonce, then the extra objects, then the payload.
fn mint_signature_hash(
    tx: &Transaction,
    specifier: Specifier,
    nonce: &TransactionNonce,
    extra_objects: &[ExtraObject],
    payload: impl FnOnce(&mut Encoder),
) -> Result<CryptoHash, TransactionError> {
    let mut e = Encoder::new(Codec::Classic);
    e.write_u8(tx.version.0);
    e.write(&specifier);
    e.write(nonce);
    for obj in extra_objects {
        obj.encode(&mut e);
    }
    payload(&mut e);
    e.write(&tx.miner_fees);
    e.write(&tx.arbitrary_data);
    Ok(crypto::hash(&e.finish()?))
}

/// Checks the mint fulfillment against the mint condition active at the validated height.
fn check_mint_fulfillment<C: TransactionController>(
    controller: &C,
    mint_conditions: &dyn MintConditionGetter,
    fulfillment: &Fulfillment,
    tx: &Transaction,
    ctx: &ValidationContext,
) -> Result<(), ValidationError> {
    let condition = mint_conditions
        .get_mint_condition_at(ctx.block_height)
        .map_err(TransactionError::from)?;
    let signer = TransactionSigner::new(controller, tx);
    condition
        .fulfill(fulfillment, &ctx.fulfill_context(&signer))
        .map_err(ValidationError::UnauthorizedMint)
}

/// Signs the mint fulfillment with the currently active mint condition.
fn sign_mint_fulfillment<C: TransactionController>(
    controller: &C,
    mint_conditions: &dyn MintConditionGetter,
    tx: &Transaction,
    key: KeyMaterial,
) -> Result<Fulfillment, TransactionError> {
    let condition = mint_conditions.get_active_mint_condition()?;
    let signer = TransactionSigner::new(controller, tx);
    Ok(condition.sign(key, &signer.context())?)
}

impl TransactionController for CoinCreationTransactionController {
    fn encode_body(&self, e: &mut Encoder, tx: &Transaction) -> Result<(), TransactionError> {
        let ext = self.extension(tx)?;
        e.write(&ext.nonce);
        e.write(&ext.mint_fulfillment);
        e.write(&tx.coin_outputs);
        e.write(&tx.miner_fees);
        e.write(&tx.arbitrary_data);
        Ok(())
    }

    fn decode_body(&self, d: &mut Decoder) -> Result<Transaction, TransactionError> {
        let nonce = d.read()?;
        let mint_fulfillment = d.read()?;
        Ok(Transaction {
            coin_outputs: d.read()?,
            miner_fees: d.read()?,
            arbitrary_data: d.read()?,
            extension: Extension::CoinCreation(CoinCreationExtension {
                nonce,
                mint_fulfillment,
            }),
            ..Transaction::default()
        })
    }

    fn to_json(&self, tx: &Transaction) -> Result<serde_json::Value, TransactionError> {
        let ext = self.extension(tx)?;
        Ok(serde_json::to_value(CoinCreationData {
            nonce: ext.nonce,
            mint_fulfillment: ext.mint_fulfillment.clone(),
            coin_outputs: tx.coin_outputs.clone(),
            miner_fees: tx.miner_fees.clone(),
            arbitrary_data: tx.arbitrary_data.clone(),
        })?)
    }

    fn from_json(&self, data: serde_json::Value) -> Result<Transaction, TransactionError> {
        let data: CoinCreationData = serde_json::from_value(data)?;
        Ok(Transaction {
            coin_outputs: data.coin_outputs,
            miner_fees: data.miner_fees,
            arbitrary_data: data.arbitrary_data,
            extension: Extension::CoinCreation(CoinCreationExtension {
                nonce: data.nonce,
                mint_fulfillment: data.mint_fulfillment,
            }),
            ..Transaction::default()
        })
    }

    fn id_input(&self, e: &mut Encoder, tx: &Transaction) -> Result<(), TransactionError> {
        e.write(&SPECIFIER_COIN_CREATION_TX);
        self.encode_body(e, tx)
    }

    fn signature_hash(
        &self,
        tx: &Transaction,
        extra_objects: &[ExtraObject],
    ) -> Result<CryptoHash, TransactionError> {
        let ext = self.extension(tx)?;
        mint_signature_hash(tx, SPECIFIER_COIN_CREATION_TX, &ext.nonce, extra_objects, |e| {
            e.write(&tx.coin_outputs)
        })
    }

    fn validate(&self, tx: &Transaction, ctx: &ValidationContext) -> Result<(), ValidationError> {
        check_version_active(tx, ctx)?;
        check_fits_in_block(self, tx, ctx)?;
        let ext = self.extension(tx)?;
        check_mint_fulfillment(self, &*self.mint_conditions, &ext.mint_fulfillment, tx, ctx)?;
        if ext.nonce.is_nil() {
            return Err(ValidationError::NilNonce);
        }
        check_arbitrary_data(&tx.arbitrary_data, ctx)?;
        check_miner_fees(&tx.miner_fees, ctx)?;
        for co in &tx.coin_outputs {
            if co.value.is_zero() {
                return Err(ValidationError::ZeroOutput);
            }
            if !ctx.confirmed && !co.condition.is_standard() {
                return Err(ValidationError::NonStandardCondition(co.condition.condition_type()));
            }
        }
        self.validate_coin_outputs(tx, ctx)?;
        self.validate_block_stake_outputs(tx, ctx)
    }

    /// Created coins are not backed by any inputs.
    fn validate_coin_outputs(
        &self,
        _tx: &Transaction,
        _ctx: &ValidationContext,
    ) -> Result<(), ValidationError> {
        Ok(())
    }

    fn validate_block_stake_outputs(
        &self,
        _tx: &Transaction,
        _ctx: &ValidationContext,
    ) -> Result<(), ValidationError> {
        Ok(())
    }

    fn sign_extension(&self, tx: &mut Transaction, key: KeyMaterial) -> Result<(), TransactionError> {
        self.extension(tx)?;
        let fulfillment = sign_mint_fulfillment(self, &*self.mint_conditions, tx, key)?;
        if let Extension::CoinCreation(ext) = &mut tx.extension {
            ext.mint_fulfillment = fulfillment;
        }
        Ok(())
    }
}

impl TransactionController for MinterDefinitionTransactionController {
    fn encode_body(&self, e: &mut Encoder, tx: &Transaction) -> Result<(), TransactionError> {
        let ext = self.extension(tx)?;
        e.write(&ext.nonce);
        e.write(&ext.mint_fulfillment);
        e.write(&ext.mint_condition);
        e.write(&tx.miner_fees);
        e.write(&tx.arbitrary_data);
        Ok(())
    }

    fn decode_body(&self, d: &mut Decoder) -> Result<Transaction, TransactionError> {
        let ext = MinterDefinitionExtension {
            nonce: d.read()?,
            mint_fulfillment: d.read()?,
            mint_condition: d.read()?,
        };
        Ok(Transaction {
            miner_fees: d.read()?,
            arbitrary_data: d.read()?,
            extension: Extension::MinterDefinition(ext),
            ..Transaction::default()
        })
    }

    fn to_json(&self, tx: &Transaction) -> Result<serde_json::Value, TransactionError> {
        let ext = self.extension(tx)?;
        Ok(serde_json::to_value(MinterDefinitionData {
            nonce: ext.nonce,
            mint_fulfillment: ext.mint_fulfillment.clone(),
            mint_condition: ext.mint_condition.clone(),
            miner_fees: tx.miner_fees.clone(),
            arbitrary_data: tx.arbitrary_data.clone(),
        })?)
    }

    fn from_json(&self, data: serde_json::Value) -> Result<Transaction, TransactionError> {
        let data: MinterDefinitionData = serde_json::from_value(data)?;
        Ok(Transaction {
            miner_fees: data.miner_fees,
            arbitrary_data: data.arbitrary_data,
            extension: Extension::MinterDefinition(MinterDefinitionExtension {
                nonce: data.nonce,
                mint_fulfillment: data.mint_fulfillment,
                mint_condition: data.mint_condition,
            }),
            ..Transaction::default()
        })
    }

    fn id_input(&self, e: &mut Encoder, tx: &Transaction) -> Result<(), TransactionError> {
        e.write(&SPECIFIER_MINTER_DEFINITION_TX);
        self.encode_body(e, tx)
    }

    fn signature_hash(
        &self,
        tx: &Transaction,
        extra_objects: &[ExtraObject],
    ) -> Result<CryptoHash, TransactionError> {
        let ext = self.extension(tx)?;
        mint_signature_hash(tx, SPECIFIER_MINTER_DEFINITION_TX, &ext.nonce, extra_objects, |e| {
            e.write(&ext.mint_condition)
        })
    }

    fn validate(&self, tx: &Transaction, ctx: &ValidationContext) -> Result<(), ValidationError> {
        check_version_active(tx, ctx)?;
        check_fits_in_block(self, tx, ctx)?;
        let ext = self.extension(tx)?;
        if !ext.mint_condition.is_standard() {
            return Err(ValidationError::NonStandardCondition(
                ext.mint_condition.condition_type(),
            ));
        }
        validate_mint_condition(&ext.mint_condition)?;
        check_mint_fulfillment(self, &*self.mint_conditions, &ext.mint_fulfillment, tx, ctx)?;
        if ext.nonce.is_nil() {
            return Err(ValidationError::NilNonce);
        }
        check_arbitrary_data(&tx.arbitrary_data, ctx)?;
        check_miner_fees(&tx.miner_fees, ctx)
    }

    fn validate_coin_outputs(
        &self,
        _tx: &Transaction,
        _ctx: &ValidationContext,
    ) -> Result<(), ValidationError> {
        Ok(())
    }

    fn validate_block_stake_outputs(
        &self,
        _tx: &Transaction,
        _ctx: &ValidationContext,
    ) -> Result<(), ValidationError> {
        Ok(())
    }

    fn sign_extension(&self, tx: &mut Transaction, key: KeyMaterial) -> Result<(), TransactionError> {
        self.extension(tx)?;
        let fulfillment = sign_mint_fulfillment(self, &*self.mint_conditions, tx, key)?;
        if let Extension::MinterDefinition(ext) = &mut tx.extension {
            ext.mint_fulfillment = fulfillment;
        }
        Ok(())
    }
}

/// Only public key unlock hashes and multisig conditions can become the mint condition,
/// optionally wrapped in a time lock.
pub fn validate_mint_condition(condition: &Condition) -> Result<(), ValidationError> {
    match condition {
        Condition::MultiSignature(_) => Ok(()),
        Condition::UnlockHash(c) if c.target.unlock_type == UnlockType::PUBLIC_KEY => Ok(()),
        Condition::UnlockHash(c) => Err(ValidationError::InvalidMintUnlockType(c.target.unlock_type)),
        Condition::TimeLock(c) => validate_mint_condition(&c.condition),
        c => Err(ValidationError::InvalidMintConditionType(c.condition_type())),
    }
}

/// Mint conditions by the height they became active at.
///
/// Starts out with the genesis mint condition and is extended by every
/// minter definition transaction applied to it.
#[derive(Debug, Default)]
pub struct MintConditionHistory {
    conditions: RwLock<BTreeMap<BlockHeight, Condition>>,
}

impl MintConditionHistory {
    pub fn new(genesis: Condition) -> Self {
        let mut conditions = BTreeMap::new();
        conditions.insert(BlockHeight(0), genesis);
        Self {
            conditions: RwLock::new(conditions),
        }
    }

    /// Makes `condition` the mint condition from `height` on.
    pub fn define(&self, height: BlockHeight, condition: Condition) -> Result<(), MintConditionError> {
        let mut conditions = self
            .conditions
            .write()
            .map_err(|_| MintConditionError("mint condition history is poisoned".into()))?;
        debug!("mint condition redefined at height {}", height);
        conditions.insert(height, condition);
        Ok(())
    }

    /// Records the new mint condition of a minter definition transaction included at `height`.
    /// Other transactions are ignored.
    pub fn apply_transaction(
        &self,
        height: BlockHeight,
        tx: &Transaction,
    ) -> Result<(), MintConditionError> {
        match &tx.extension {
            Extension::MinterDefinition(ext) if tx.version == TRANSACTION_VERSION_MINTER_DEFINITION => {
                self.define(height, ext.mint_condition.clone())
            }
            _ => Ok(()),
        }
    }

    fn lookup(&self, height: Option<BlockHeight>) -> Result<Condition, MintConditionError> {
        let conditions = self
            .conditions
            .read()
            .map_err(|_| MintConditionError("mint condition history is poisoned".into()))?;
        let found = match height {
            Some(height) => conditions.range(..=height).next_back(),
            None => conditions.iter().next_back(),
        };
        found
            .map(|(_, c)| c.clone())
            .ok_or_else(|| MintConditionError("no mint condition defined".into()))
    }
}

impl MintConditionGetter for MintConditionHistory {
    fn get_active_mint_condition(&self) -> Result<Condition, MintConditionError> {
        self.lookup(None)
    }

    fn get_mint_condition_at(&self, height: BlockHeight) -> Result<Condition, MintConditionError> {
        self.lookup(Some(height))
    }
}
