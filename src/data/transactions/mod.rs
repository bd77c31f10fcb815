// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

pub mod controller;
pub mod errors;
pub mod legacy;
pub mod minting;
pub mod registry;
pub mod standard;
pub mod transaction;
pub mod validation;


pub use controller::*;
pub use errors::*;
pub use legacy::*;
pub use minting::*;
pub use registry::*;
pub use standard::*;
pub use transaction::*;
pub use validation::*;
