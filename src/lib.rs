// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

pub mod config;
pub mod crypto;
pub mod data;
pub mod protocol;
