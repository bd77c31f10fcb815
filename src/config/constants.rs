// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::*;
use crate::data::basics::{BlockHeight, Currency};
use crate::protocol::{
    TransactionVersion, TRANSACTION_VERSION_COIN_CREATION, TRANSACTION_VERSION_MINTER_DEFINITION,
};

/// Maximum size of an encoded block in bytes.
pub const BLOCK_SIZE_LIMIT: u64 = 2_000_000;

/// Maximum length of the arbitrary data of a transaction.
pub const ARBITRARY_DATA_SIZE_LIMIT: u64 = 83;

/// Space of a block reserved for everything but its transactions.
pub const BLOCK_HEADER_RESERVE: u64 = 5_000;

/// Chain parameters consulted by transaction validation.
///
/// Fields missing from a loaded file keep their default value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConstants {
    #[serde(rename = "blocksizelimit")]
    pub block_size_limit: u64,
    #[serde(rename = "arbitrarydatasizelimit")]
    pub arbitrary_data_size_limit: u64,
    #[serde(rename = "minimumminerfee")]
    pub minimum_miner_fee: Currency,

    /// Transaction versions listed here are rejected below the given height.
    #[serde(rename = "versionactivationheights")]
    pub version_activation_heights: BTreeMap<TransactionVersion, BlockHeight>,
}

impl Default for ValidationConstants {
    fn default() -> Self {
        Self {
            block_size_limit: BLOCK_SIZE_LIMIT,
            arbitrary_data_size_limit: ARBITRARY_DATA_SIZE_LIMIT,
            minimum_miner_fee: Currency::new(1),
            version_activation_heights: BTreeMap::new(),
        }
    }
}

impl ValidationConstants {
    /// Largest encoded transaction that still fits into a block.
    pub fn max_transaction_size(&self) -> u64 {
        self.block_size_limit.saturating_sub(BLOCK_HEADER_RESERVE)
    }

    /// Returns true iff transactions of the given version are allowed at the given height.
    pub fn is_version_active(&self, version: TransactionVersion, height: BlockHeight) -> bool {
        match self.version_activation_heights.get(&version) {
            Some(activation) => height >= *activation,
            None => true,
        }
    }

    /// Returns the preset of a known network.
    pub fn for_network(network: &str) -> Result<Self> {
        CONSTANTS
            .get(network)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownNetwork(network.to_owned()))
    }

    /// Loads `constants.json` from the given directory, see `load_from_file`.
    pub fn load_from_disk(dir: &impl AsRef<OsStr>) -> Result<Self> {
        Self::load_from_file(&Path::new(dir).join(CONSTANTS_JSON_FILE))
    }

    /// Reads constants from a JSON file, merged over the defaults.
    /// A leading `~` or `$VAR` in the path is expanded.
    pub fn load_from_file(file: &impl AsRef<Path>) -> Result<Self> {
        let path = file.as_ref().to_string_lossy();
        let expanded = shellexpand::full(&path)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e.to_string()))?;
        debug!("loading validation constants from {}", expanded);
        let content = fs::read_to_string(expanded.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the constants as pretty-printed JSON into dir/constants.json.
    pub fn save_to_disk(&self, dir: &impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(dir.as_ref().join(CONSTANTS_JSON_FILE), content)?;
        Ok(())
    }
}

fn init_network_constants(networks: &mut HashMap<protocol::NetworkID, ValidationConstants>) {
    let mut standard = ValidationConstants {
        minimum_miner_fee: Currency::new(100_000_000),
        ..ValidationConstants::default()
    };
    standard
        .version_activation_heights
        .insert(TRANSACTION_VERSION_MINTER_DEFINITION, BlockHeight(1));
    standard
        .version_activation_heights
        .insert(TRANSACTION_VERSION_COIN_CREATION, BlockHeight(1));
    networks.insert(TESTNET, standard.clone());
    networks.insert(STANDARD, standard);

    // minting is available from genesis on devnet
    networks.insert(DEVNET, ValidationConstants::default());
}

lazy_static! {
    /// Validation constants of every known network.
    pub static ref CONSTANTS: HashMap<protocol::NetworkID, ValidationConstants> = {
        let mut networks = HashMap::new();
        init_network_constants(&mut networks);
        networks
    };
}
