// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

pub mod currency;
pub mod unlockhash;
pub mod units;

pub use currency::*;
pub use unlockhash::*;
pub use units::*;

pub(crate) use units::{base64_bytes, hex_array};
