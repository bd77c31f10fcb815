// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

mod constants;
mod keyfile;

#[cfg(test)]
mod tests;

use std::io;

use thiserror::Error;

use crate::crypto::SignatureError;
use crate::protocol;
pub use constants::*;
pub use keyfile::*;

/// Network used by default.
pub const STANDARD: protocol::NetworkID = "standard";

/// Public test network.
pub const TESTNET: protocol::NetworkID = "testnet";

/// Local development network.
pub const DEVNET: protocol::NetworkID = "devnet";

/// The name of the file holding custom validation constants.
pub const CONSTANTS_JSON_FILE: &str = "constants.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading/writing configuration failed")]
    IoError(#[from] io::Error),
    #[error("JSON (de)serialization failed")]
    SerializationError(#[from] serde_json::Error),
    #[error("unknown network {0:?}")]
    UnknownNetwork(String),
    #[error("invalid key file")]
    InvalidKey(#[from] SignatureError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
