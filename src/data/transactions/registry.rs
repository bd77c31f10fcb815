// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::*;
use crate::crypto::{self, CryptoHash};
use crate::data::unlock::{ExtraObject, KeyMaterial};
use crate::protocol::{
    Codec, Decoder, Encodable, Encoder, Specifier, TransactionVersion, SPECIFIER_BLOCK_STAKE_OUTPUT,
    SPECIFIER_COIN_OUTPUT, TRANSACTION_VERSION_COIN_CREATION, TRANSACTION_VERSION_MINTER_DEFINITION,
    TRANSACTION_VERSION_ONE, TRANSACTION_VERSION_ZERO,
};

/// Maps transaction versions to the controllers that handle them.
///
/// Built once, then only read, so it can be shared between validating threads.
#[derive(Clone, Default)]
pub struct TransactionRegistry {
    controllers: HashMap<TransactionVersion, Arc<dyn TransactionController>>,
}

/// Collects controllers before freezing them into a `TransactionRegistry`.
#[derive(Default)]
pub struct TransactionRegistryBuilder {
    controllers: HashMap<TransactionVersion, Arc<dyn TransactionController>>,
}

impl TransactionRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller, replacing any earlier one for the same version.
    pub fn register(
        mut self,
        version: TransactionVersion,
        controller: impl TransactionController + 'static,
    ) -> Self {
        self.controllers.insert(version, Arc::new(controller));
        self
    }

    pub fn unregister(mut self, version: TransactionVersion) -> Self {
        self.controllers.remove(&version);
        self
    }

    pub fn build(self) -> TransactionRegistry {
        let mut versions: Vec<_> = self.controllers.keys().map(|v| v.0).collect();
        versions.sort_unstable();
        debug!("transaction registry built for versions {:?}", versions);
        TransactionRegistry {
            controllers: self.controllers,
        }
    }
}

/// JSON envelope shared by all transaction versions.
#[derive(Serialize, Deserialize)]
struct JsonTransaction {
    version: TransactionVersion,
    data: serde_json::Value,
}

impl TransactionRegistry {
    pub fn builder() -> TransactionRegistryBuilder {
        TransactionRegistryBuilder::new()
    }

    /// The legacy and the default transaction version.
    pub fn standard() -> Self {
        Self::standard_builder().build()
    }

    /// The standard versions, plus the coin creation and minter definition versions,
    /// both authorized by the mint conditions `getter` provides.
    pub fn with_minting(getter: Arc<dyn MintConditionGetter>) -> Self {
        Self::standard_builder()
            .register(
                TRANSACTION_VERSION_MINTER_DEFINITION,
                MinterDefinitionTransactionController::new(getter.clone()),
            )
            .register(
                TRANSACTION_VERSION_COIN_CREATION,
                CoinCreationTransactionController::new(getter),
            )
            .build()
    }

    fn standard_builder() -> TransactionRegistryBuilder {
        Self::builder()
            .register(TRANSACTION_VERSION_ZERO, LegacyTransactionController)
            .register(TRANSACTION_VERSION_ONE, DefaultTransactionController)
    }

    pub fn is_registered(&self, version: TransactionVersion) -> bool {
        self.controllers.contains_key(&version)
    }

    pub fn controller(
        &self,
        version: TransactionVersion,
    ) -> Result<&dyn TransactionController, TransactionError> {
        self.controllers
            .get(&version)
            .map(|c| c.as_ref())
            .ok_or(TransactionError::UnknownTransactionVersion(version.0))
    }

    /// Writes the version byte followed by the body.
    /// Transactions of unknown versions are written back as they were read.
    pub fn encode_to(&self, e: &mut Encoder, tx: &Transaction) -> Result<(), TransactionError> {
        e.write_u8(tx.version.0);
        if let Extension::Unknown(raw) = &tx.extension {
            e.write_fixed(raw);
            return Ok(());
        }
        self.controller(tx.version)?.encode_body(e, tx)
    }

    pub fn encode(&self, codec: Codec, tx: &Transaction) -> Result<Vec<u8>, TransactionError> {
        let mut e = Encoder::new(codec);
        self.encode_to(&mut e, tx)?;
        Ok(e.finish()?)
    }

    /// Reads one transaction. The body of an unknown version spans the rest of the input.
    pub fn decode_from(&self, d: &mut Decoder) -> Result<Transaction, TransactionError> {
        let version = TransactionVersion(d.read_u8()?);
        let mut tx = match self.controllers.get(&version) {
            Some(controller) => controller.decode_body(d)?,
            None => {
                trace!("relaying transaction of unknown version {}", version);
                Transaction {
                    extension: Extension::Unknown(d.read_rest()),
                    ..Transaction::default()
                }
            }
        };
        tx.version = version;
        Ok(tx)
    }

    /// Decodes a transaction that must span all of `bytes`.
    pub fn decode(&self, codec: Codec, bytes: &[u8]) -> Result<Transaction, TransactionError> {
        let mut d = Decoder::new(codec, bytes);
        let tx = self.decode_from(&mut d)?;
        d.finish()?;
        Ok(tx)
    }

    pub fn to_json_value(&self, tx: &Transaction) -> Result<serde_json::Value, TransactionError> {
        if let Extension::Unknown(_) = tx.extension {
            return Err(TransactionError::UnknownTransactionVersion(tx.version.0));
        }
        let data = self.controller(tx.version)?.to_json(tx)?;
        Ok(serde_json::to_value(JsonTransaction {
            version: tx.version,
            data,
        })?)
    }

    pub fn to_json(&self, tx: &Transaction) -> Result<String, TransactionError> {
        Ok(self.to_json_value(tx)?.to_string())
    }

    pub fn from_json_value(&self, value: serde_json::Value) -> Result<Transaction, TransactionError> {
        let json: JsonTransaction = serde_json::from_value(value)?;
        let mut tx = self.controller(json.version)?.from_json(json.data)?;
        tx.version = json.version;
        Ok(tx)
    }

    pub fn from_json(&self, s: &str) -> Result<Transaction, TransactionError> {
        self.from_json_value(serde_json::from_str(s)?)
    }

    /// Classic encoding of the bytes a transaction is identified by.
    fn id_input(&self, tx: &Transaction) -> Result<Vec<u8>, TransactionError> {
        let mut e = Encoder::new(Codec::Classic);
        self.controller(tx.version)?.id_input(&mut e, tx)?;
        Ok(e.finish()?)
    }

    pub fn id(&self, tx: &Transaction) -> Result<TransactionID, TransactionError> {
        if let Extension::Unknown(raw) = &tx.extension {
            return Ok(Transaction::raw_id(tx.version, raw));
        }
        Ok(TransactionID(crypto::hash(&self.id_input(tx)?)))
    }

    fn output_id(
        &self,
        specifier: Specifier,
        tx: &Transaction,
        index: u64,
    ) -> Result<CryptoHash, TransactionError> {
        let id_input = match &tx.extension {
            Extension::Unknown(raw) => {
                let mut buf = vec![tx.version.0];
                buf.extend_from_slice(raw);
                buf
            }
            _ => self.id_input(tx)?,
        };
        let mut e = Encoder::new(Codec::Classic);
        specifier.encode(&mut e);
        e.write_fixed(&id_input);
        e.write_u64(index);
        Ok(crypto::hash(&e.finish()?))
    }

    /// ID of the coin output at `index`.
    pub fn coin_output_id(
        &self,
        tx: &Transaction,
        index: u64,
    ) -> Result<CoinOutputID, TransactionError> {
        Ok(CoinOutputID(self.output_id(SPECIFIER_COIN_OUTPUT, tx, index)?))
    }

    /// ID of the block stake output at `index`.
    pub fn block_stake_output_id(
        &self,
        tx: &Transaction,
        index: u64,
    ) -> Result<BlockStakeOutputID, TransactionError> {
        Ok(BlockStakeOutputID(self.output_id(SPECIFIER_BLOCK_STAKE_OUTPUT, tx, index)?))
    }

    pub fn signature_hash(
        &self,
        tx: &Transaction,
        extra_objects: &[ExtraObject],
    ) -> Result<CryptoHash, TransactionError> {
        self.controller(tx.version)?.signature_hash(tx, extra_objects)
    }

    /// Binds `tx` to its controller, for use in fulfill and sign contexts.
    pub fn signer<'a>(
        &'a self,
        tx: &'a Transaction,
    ) -> Result<TransactionSigner<'a, dyn TransactionController + 'a>, TransactionError> {
        Ok(TransactionSigner::new(self.controller(tx.version)?, tx))
    }

    /// Validates a transaction with the controller of its version.
    pub fn validate(&self, tx: &Transaction, ctx: &ValidationContext) -> Result<(), ValidationError> {
        let res = self.controller(tx.version)?.validate(tx, ctx);
        if let Err(err) = &res {
            debug!("{} transaction failed validation: {}", tx.version, err);
        }
        res
    }

    /// Signs the extension data of `tx`, if its version has any.
    pub fn sign_extension(&self, tx: &mut Transaction, key: KeyMaterial) -> Result<(), TransactionError> {
        self.controller(tx.version)?.sign_extension(tx, key)
    }
}

impl fmt::Debug for TransactionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut versions: Vec<_> = self.controllers.keys().collect();
        versions.sort();
        f.debug_struct("TransactionRegistry")
            .field("versions", &versions)
            .finish()
    }
}
