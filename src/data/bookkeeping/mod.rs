// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

pub mod block;
pub mod errors;

pub use block::*;
pub use errors::*;
