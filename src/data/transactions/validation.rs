// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use super::*;
use crate::config::ValidationConstants;
use crate::data::basics::{BlockHeight, ByteSlice, Currency, Timestamp};
use crate::data::unlock::{FulfillContext, SignatureHasher};
use crate::protocol::{Codec, Encoder};

/// Gives access to the outputs spent by the transactions being validated or signed.
pub trait OutputLookup: Sync {
    fn coin_output(&self, id: &CoinOutputID) -> Option<&CoinOutput>;

    fn block_stake_output(&self, id: &BlockStakeOutputID) -> Option<&BlockStakeOutput>;
}

/// In-memory `OutputLookup`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputSet {
    pub coin_outputs: HashMap<CoinOutputID, CoinOutput>,
    pub block_stake_outputs: HashMap<BlockStakeOutputID, BlockStakeOutput>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_coin_output(&mut self, id: CoinOutputID, output: CoinOutput) {
        self.coin_outputs.insert(id, output);
    }

    pub fn insert_block_stake_output(&mut self, id: BlockStakeOutputID, output: BlockStakeOutput) {
        self.block_stake_outputs.insert(id, output);
    }

    /// Removes the outputs spent by `tx` and adds the ones it creates.
    pub fn apply_transaction(
        &mut self,
        registry: &TransactionRegistry,
        tx: &Transaction,
    ) -> Result<(), TransactionError> {
        for ci in &tx.coin_inputs {
            self.coin_outputs.remove(&ci.parent_id);
        }
        for bsi in &tx.block_stake_inputs {
            self.block_stake_outputs.remove(&bsi.parent_id);
        }
        for (i, co) in tx.coin_outputs.iter().enumerate() {
            self.insert_coin_output(registry.coin_output_id(tx, i as u64)?, co.clone());
        }
        for (i, bso) in tx.block_stake_outputs.iter().enumerate() {
            self.insert_block_stake_output(registry.block_stake_output_id(tx, i as u64)?, bso.clone());
        }
        Ok(())
    }
}

impl OutputLookup for OutputSet {
    fn coin_output(&self, id: &CoinOutputID) -> Option<&CoinOutput> {
        self.coin_outputs.get(id)
    }

    fn block_stake_output(&self, id: &BlockStakeOutputID) -> Option<&BlockStakeOutput> {
        self.block_stake_outputs.get(id)
    }
}

/// Chain state a transaction is validated against.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    pub constants: &'a ValidationConstants,
    pub block_height: BlockHeight,
    pub block_time: Timestamp,
    /// Set for transactions already part of a block,
    /// which skips the checks only applied to the transaction pool.
    pub confirmed: bool,
    pub outputs: &'a dyn OutputLookup,
}

impl<'a> ValidationContext<'a> {
    /// Context of an unconfirmed transaction at the given chain position.
    pub fn new(
        constants: &'a ValidationConstants,
        outputs: &'a dyn OutputLookup,
        block_height: BlockHeight,
        block_time: Timestamp,
    ) -> Self {
        Self {
            constants,
            block_height,
            block_time,
            confirmed: false,
            outputs,
        }
    }

    pub fn fulfill_context<'t>(&self, signer: &'t dyn SignatureHasher) -> FulfillContext<'t> {
        FulfillContext {
            block_height: self.block_height,
            block_time: self.block_time,
            transaction: signer,
        }
    }
}

/// Validation applied to every transaction version that does not override it.
pub fn validate_default<C: TransactionController + ?Sized>(
    controller: &C,
    tx: &Transaction,
    ctx: &ValidationContext,
) -> Result<(), ValidationError> {
    check_version_active(tx, ctx)?;
    check_fits_in_block(controller, tx, ctx)?;
    check_arbitrary_data(&tx.arbitrary_data, ctx)?;
    check_outputs_and_fees(tx, ctx)?;
    check_double_spends(tx)?;
    check_inputs_authorized(controller, tx, ctx)?;
    if !ctx.confirmed {
        check_standard(tx)?;
    }
    controller.validate_coin_outputs(tx, ctx)?;
    controller.validate_block_stake_outputs(tx, ctx)
}

pub(super) fn check_version_active(
    tx: &Transaction,
    ctx: &ValidationContext,
) -> Result<(), ValidationError> {
    if ctx.constants.is_version_active(tx.version, ctx.block_height) {
        return Ok(());
    }
    let activation = ctx
        .constants
        .version_activation_heights
        .get(&tx.version)
        .copied()
        .unwrap_or_default();
    Err(ValidationError::InactiveVersion {
        version: tx.version,
        activation,
    })
}

/// Size of the classic encoding, version byte included.
pub fn encoded_size<C: TransactionController + ?Sized>(
    controller: &C,
    tx: &Transaction,
) -> Result<usize, TransactionError> {
    let mut e = Encoder::new(Codec::Classic);
    e.write_u8(tx.version.0);
    controller.encode_body(&mut e, tx)?;
    Ok(e.finish()?.len())
}

pub(super) fn check_fits_in_block<C: TransactionController + ?Sized>(
    controller: &C,
    tx: &Transaction,
    ctx: &ValidationContext,
) -> Result<(), ValidationError> {
    let size = encoded_size(controller, tx)?;
    let max = ctx.constants.max_transaction_size();
    if size as u64 > max {
        return Err(ValidationError::TooLarge { size, max });
    }
    Ok(())
}

pub(super) fn check_arbitrary_data(
    data: &ByteSlice,
    ctx: &ValidationContext,
) -> Result<(), ValidationError> {
    let max = ctx.constants.arbitrary_data_size_limit;
    if data.len() as u64 > max {
        return Err(ValidationError::ArbitraryDataTooLarge(data.len(), max));
    }
    Ok(())
}

pub(super) fn check_miner_fees(
    fees: &[Currency],
    ctx: &ValidationContext,
) -> Result<(), ValidationError> {
    let min = &ctx.constants.minimum_miner_fee;
    for fee in fees {
        if fee < min {
            return Err(ValidationError::FeeLessThanMin(fee.clone(), min.clone()));
        }
    }
    Ok(())
}

fn check_outputs_and_fees(tx: &Transaction, ctx: &ValidationContext) -> Result<(), ValidationError> {
    let zero_coin = tx.coin_outputs.iter().any(|co| co.value.is_zero());
    let zero_stake = tx.block_stake_outputs.iter().any(|bso| bso.value.is_zero());
    if zero_coin || zero_stake {
        return Err(ValidationError::ZeroOutput);
    }
    if tx.miner_fees.is_empty()
        && !ctx.constants.minimum_miner_fee.is_zero()
        && !tx.is_block_creating()
    {
        return Err(ValidationError::MissingMinerFee);
    }
    check_miner_fees(&tx.miner_fees, ctx)
}

fn check_double_spends(tx: &Transaction) -> Result<(), ValidationError> {
    let mut coins = HashSet::with_capacity(tx.coin_inputs.len());
    for ci in &tx.coin_inputs {
        if !coins.insert(ci.parent_id) {
            return Err(ValidationError::DoubleSpendCoin(ci.parent_id));
        }
    }
    let mut stakes = HashSet::with_capacity(tx.block_stake_inputs.len());
    for bsi in &tx.block_stake_inputs {
        if !stakes.insert(bsi.parent_id) {
            return Err(ValidationError::DoubleSpendBlockStake(bsi.parent_id));
        }
    }
    Ok(())
}

fn check_inputs_authorized<C: TransactionController + ?Sized>(
    controller: &C,
    tx: &Transaction,
    ctx: &ValidationContext,
) -> Result<(), ValidationError> {
    let signer = TransactionSigner::new(controller, tx);
    let fctx = ctx.fulfill_context(&signer);

    for (index, ci) in tx.coin_inputs.iter().enumerate() {
        let co = ctx
            .outputs
            .coin_output(&ci.parent_id)
            .ok_or(ValidationError::MissingCoinOutput(ci.parent_id))?;
        co.condition
            .fulfill(&ci.fulfillment, &fctx)
            .map_err(|source| ValidationError::UnauthorizedCoinInput { index, source })?;
    }
    for (index, bsi) in tx.block_stake_inputs.iter().enumerate() {
        let bso = ctx
            .outputs
            .block_stake_output(&bsi.parent_id)
            .ok_or(ValidationError::MissingBlockStakeOutput(bsi.parent_id))?;
        bso.condition
            .fulfill(&bsi.fulfillment, &fctx)
            .map_err(|source| ValidationError::UnauthorizedBlockStakeInput { index, source })?;
    }
    Ok(())
}

fn check_standard(tx: &Transaction) -> Result<(), ValidationError> {
    let fulfillments = tx
        .coin_inputs
        .iter()
        .map(|ci| &ci.fulfillment)
        .chain(tx.block_stake_inputs.iter().map(|bsi| &bsi.fulfillment));
    for f in fulfillments {
        if !f.is_standard() {
            return Err(ValidationError::NonStandardFulfillment(f.fulfillment_type()));
        }
    }
    let conditions = tx
        .coin_outputs
        .iter()
        .map(|co| &co.condition)
        .chain(tx.block_stake_outputs.iter().map(|bso| &bso.condition));
    for c in conditions {
        if !c.is_standard() {
            return Err(ValidationError::NonStandardCondition(c.condition_type()));
        }
    }
    Ok(())
}

/// Checks that the spent coins equal the coin outputs plus the miner fees.
pub fn check_coin_balance(tx: &Transaction, ctx: &ValidationContext) -> Result<(), ValidationError> {
    let mut inputs = Currency::zero();
    for ci in &tx.coin_inputs {
        let co = ctx
            .outputs
            .coin_output(&ci.parent_id)
            .ok_or(ValidationError::MissingCoinOutput(ci.parent_id))?;
        inputs += &co.value;
    }
    let outputs = tx.coin_output_sum();
    if inputs != outputs {
        trace!("coin balance mismatch: {} in, {} out", inputs, outputs);
        return Err(ValidationError::CoinInputOutputMismatch { inputs, outputs });
    }
    Ok(())
}

/// Checks that the spent block stakes equal the block stake outputs.
pub fn check_block_stake_balance(
    tx: &Transaction,
    ctx: &ValidationContext,
) -> Result<(), ValidationError> {
    let mut inputs = Currency::zero();
    for bsi in &tx.block_stake_inputs {
        let bso = ctx
            .outputs
            .block_stake_output(&bsi.parent_id)
            .ok_or(ValidationError::MissingBlockStakeOutput(bsi.parent_id))?;
        inputs += &bso.value;
    }
    let outputs = tx.block_stake_output_sum();
    if inputs != outputs {
        trace!("block stake balance mismatch: {} in, {} out", inputs, outputs);
        return Err(ValidationError::BlockStakeInputOutputMismatch { inputs, outputs });
    }
    Ok(())
}
