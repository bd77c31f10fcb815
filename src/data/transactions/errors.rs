// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use thiserror::Error;

use super::{BlockStakeOutputID, CoinOutputID};
use crate::data::basics::{BlockHeight, Currency, UnlockType};
use crate::data::unlock::{AuthorizationError, SigningError};
use crate::protocol::{CodecError, TransactionVersion};

/// Errors encoding, decoding or hashing a transaction.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction version {0} is not registered")]
    UnknownTransactionVersion(u8),
    #[error("malformed transaction encoding: {0}")]
    Codec(#[from] CodecError),
    #[error("malformed transaction json: {0}")]
    Json(#[from] serde_json::Error),
    /// The transaction holds something its version has no layout for.
    #[error("{version} transactions cannot hold {what}")]
    Unrepresentable {
        version: TransactionVersion,
        what: &'static str,
    },
    #[error("{version} transactions require {what}")]
    MissingField {
        version: TransactionVersion,
        what: &'static str,
    },
    #[error("unexpected extension data for {0} transactions")]
    UnexpectedExtension(TransactionVersion),
    #[error("failed to get the mint condition: {0}")]
    MintCondition(#[from] MintConditionError),
    #[error("failed to sign transaction")]
    Signing(#[from] SigningError),
}

/// The mint condition could not be looked up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MintConditionError(pub String);

/// Defines error types which could be returned from transaction validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{version} transactions are not active before height {activation}")]
    InactiveVersion {
        version: TransactionVersion,
        activation: BlockHeight,
    },
    #[error("transaction of {size} bytes is too large to fit in a block, max is {max}")]
    TooLarge { size: usize, max: u64 },
    #[error("the provided arbitrary data is too long {0}, max is {1}")]
    ArbitraryDataTooLarge(usize, u64),
    #[error("tx has fee of {0} which is less than min ({1})")]
    FeeLessThanMin(Currency, Currency),
    #[error("transaction does not specify any miner fees")]
    MissingMinerFee,
    #[error("transaction cannot have an output that has zero value")]
    ZeroOutput,
    #[error("coin output {0} is spent twice")]
    DoubleSpendCoin(CoinOutputID),
    #[error("block stake output {0} is spent twice")]
    DoubleSpendBlockStake(BlockStakeOutputID),
    #[error("spent coin output {0} not found")]
    MissingCoinOutput(CoinOutputID),
    #[error("spent block stake output {0} not found")]
    MissingBlockStakeOutput(BlockStakeOutputID),
    #[error("coin input {index} is not authorized")]
    UnauthorizedCoinInput {
        index: usize,
        #[source]
        source: AuthorizationError,
    },
    #[error("block stake input {index} is not authorized")]
    UnauthorizedBlockStakeInput {
        index: usize,
        #[source]
        source: AuthorizationError,
    },
    #[error("mint fulfillment does not satisfy the mint condition")]
    UnauthorizedMint(#[source] AuthorizationError),
    #[error("coin inputs ({inputs}) do not equal coin outputs and fees ({outputs})")]
    CoinInputOutputMismatch { inputs: Currency, outputs: Currency },
    #[error("block stake inputs ({inputs}) do not equal block stake outputs ({outputs})")]
    BlockStakeInputOutputMismatch { inputs: Currency, outputs: Currency },
    #[error("nil nonce is not allowed")]
    NilNonce,
    #[error("condition type {0} cannot be used as a mint condition")]
    InvalidMintConditionType(u8),
    #[error("unlock hash of type {0:?} cannot be used as a mint condition")]
    InvalidMintUnlockType(UnlockType),
    #[error("non-standard condition of type {0}")]
    NonStandardCondition(u8),
    #[error("non-standard fulfillment of type {0}")]
    NonStandardFulfillment(u8),
    #[error("invalid transaction")]
    Transaction(#[from] TransactionError),
}
