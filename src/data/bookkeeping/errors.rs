// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use thiserror::Error;

use super::BlockID;
use crate::data::basics::Timestamp;
use crate::data::transactions::{
    BlockStakeOutputID, CoinOutputID, TransactionError, ValidationError,
};
use crate::protocol::CodecError;

#[derive(Debug, Error)]
pub enum InvalidBlock {
    #[error("block is following block {0}, expected parent to be {1}")]
    WrongParent(BlockID, BlockID),
    #[error("bad timestamp: current {0} < parent {1}")]
    BadEarlyTimestamp(Timestamp, Timestamp),
    #[error("block of {size} bytes exceeds the size limit of {max}")]
    TooLarge { size: usize, max: u64 },
    #[error("miner payout {0} has zero value")]
    ZeroMinerPayout(usize),
    #[error("coin output {0} is spent by more than one transaction")]
    DoubleSpendCoin(CoinOutputID),
    #[error("block stake output {0} is spent by more than one transaction")]
    DoubleSpendBlockStake(BlockStakeOutputID),
    #[error("transaction {index} is invalid")]
    Transaction {
        index: usize,
        #[source]
        source: ValidationError,
    },
    #[error("cannot encode block transaction")]
    Encoding(#[from] TransactionError),
    #[error("malformed block encoding")]
    Codec(#[from] CodecError),
}
