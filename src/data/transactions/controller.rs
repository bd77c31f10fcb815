// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use super::*;
use crate::crypto::CryptoHash;
use crate::data::basics::BlockHeight;
use crate::data::unlock::{
    Condition, ExtraObject, KeyMaterial, SignContext, SignatureHashError, SignatureHasher,
};
use crate::protocol::{Decoder, Encoder};

/// Defines everything that differs between transaction versions.
///
/// Controllers never see the version byte; it is handled by the registry.
pub trait TransactionController: Send + Sync {
    /// Binary-encodes all transaction properties except for the version.
    fn encode_body(&self, e: &mut Encoder, tx: &Transaction) -> Result<(), TransactionError>;

    /// Inverse of `encode_body`. The version of the result is set by the caller.
    fn decode_body(&self, d: &mut Decoder) -> Result<Transaction, TransactionError>;

    /// JSON-encodes all transaction properties except for the version.
    fn to_json(&self, tx: &Transaction) -> Result<serde_json::Value, TransactionError>;

    /// Inverse of `to_json`. The version of the result is set by the caller.
    fn from_json(&self, data: serde_json::Value) -> Result<Transaction, TransactionError>;

    /// Writes the bytes hashed into the transaction ID and the IDs of its outputs.
    /// Defaults to the full classic encoding.
    fn id_input(&self, e: &mut Encoder, tx: &Transaction) -> Result<(), TransactionError> {
        e.write_u8(tx.version.0);
        self.encode_body(e, tx)
    }

    /// Computes the hash every input signature of the transaction commits to.
    fn signature_hash(
        &self,
        tx: &Transaction,
        extra_objects: &[ExtraObject],
    ) -> Result<CryptoHash, TransactionError> {
        Ok(default_signature_hash(tx, extra_objects))
    }

    fn validate(&self, tx: &Transaction, ctx: &ValidationContext) -> Result<(), ValidationError> {
        validate_default(self, tx, ctx)
    }

    /// Checks that the coin outputs are backed by the coin inputs.
    fn validate_coin_outputs(
        &self,
        tx: &Transaction,
        ctx: &ValidationContext,
    ) -> Result<(), ValidationError> {
        check_coin_balance(tx, ctx)
    }

    /// Checks that the block stake outputs are backed by the block stake inputs.
    fn validate_block_stake_outputs(
        &self,
        tx: &Transaction,
        ctx: &ValidationContext,
    ) -> Result<(), ValidationError> {
        check_block_stake_balance(tx, ctx)
    }

    /// Signs fulfillments held in the extension data, if any.
    fn sign_extension(
        &self,
        _tx: &mut Transaction,
        _key: KeyMaterial,
    ) -> Result<(), TransactionError> {
        Ok(())
    }
}

/// Provides the mint condition, which is kept by the chain state.
pub trait MintConditionGetter: Send + Sync {
    /// Returns the mint condition of the current chain tip.
    fn get_active_mint_condition(&self) -> Result<Condition, MintConditionError>;

    /// Returns the mint condition that was active at the given height.
    fn get_mint_condition_at(&self, height: BlockHeight) -> Result<Condition, MintConditionError>;
}

/// Binds a transaction to its controller, so fulfillments can compute its signature hash.
pub struct TransactionSigner<'a, C: TransactionController + ?Sized = dyn TransactionController> {
    controller: &'a C,
    transaction: &'a Transaction,
}

impl<'a, C: TransactionController + ?Sized> TransactionSigner<'a, C> {
    pub fn new(controller: &'a C, transaction: &'a Transaction) -> Self {
        Self {
            controller,
            transaction,
        }
    }

    pub fn context(&self) -> SignContext<'_> {
        SignContext { transaction: self }
    }
}

impl<C: TransactionController + ?Sized> SignatureHasher for TransactionSigner<'_, C> {
    fn signature_hash(
        &self,
        extra_objects: &[ExtraObject],
    ) -> Result<CryptoHash, SignatureHashError> {
        self.controller
            .signature_hash(self.transaction, extra_objects)
            .map_err(|e| SignatureHashError(e.to_string()))
    }
}
