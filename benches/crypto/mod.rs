// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

mod batch_verifier;
mod merkle;

pub use batch_verifier::*;
pub use merkle::*;
