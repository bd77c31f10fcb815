// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

//! Conditions lock outputs, fulfillments unlock them.
//!
//! Both are closed sum types with an `Unknown` variant that keeps the raw
//! payload of types introduced by later protocol versions, so such objects
//! can be decoded, hashed and relayed, but never fulfilled.

mod atomicswap;
mod condition;
mod context;
mod errors;
mod fulfillment;
mod multisig;
mod singlesig;
mod timelock;

#[cfg(test)]
mod tests;

pub use atomicswap::*;
pub use condition::*;
pub use context::*;
pub use errors::*;
pub use fulfillment::*;
pub use multisig::*;
pub use singlesig::*;
pub use timelock::*;
