// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The first byte of every encoded transaction,
/// selecting the controller that knows how to handle the rest.
#[derive(
    Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TransactionVersion(pub u8);

/// Original transaction layout, which only supports unlock hash conditions.
pub const TRANSACTION_VERSION_ZERO: TransactionVersion = TransactionVersion(0);

/// Default transaction layout, supporting all condition and fulfillment types.
pub const TRANSACTION_VERSION_ONE: TransactionVersion = TransactionVersion(1);

/// Redefines the network-wide mint condition.
pub const TRANSACTION_VERSION_MINTER_DEFINITION: TransactionVersion = TransactionVersion(128);

/// Creates coins out of nothing, authorized by the mint condition.
pub const TRANSACTION_VERSION_COIN_CREATION: TransactionVersion = TransactionVersion(129);

impl TransactionVersion {
    pub fn is_legacy(&self) -> bool {
        *self == TRANSACTION_VERSION_ZERO
    }
}

impl fmt::Display for TransactionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
