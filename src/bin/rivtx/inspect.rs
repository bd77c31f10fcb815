// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::error::Error;

use clap::Parser;
use data_encoding::HEXLOWER_PERMISSIVE;

use rivtx::data::transactions::{Extension, TransactionRegistry};
use rivtx::protocol::Codec;

/// Decodes a hex-encoded transaction and prints it with its IDs
#[derive(Parser)]
pub struct InspectCmd {
    /// Hex encoding of the transaction
    #[clap(required = true)]
    tx_hex: String,
    /// Decode the compact encoding instead of the classic one
    #[clap(short = 'c', long = "compact")]
    compact: bool,
}

impl InspectCmd {
    pub fn entrypoint(&self, registry: &TransactionRegistry) -> Result<(), Box<dyn Error>> {
        let bytes = HEXLOWER_PERMISSIVE.decode(self.tx_hex.trim().as_bytes())?;
        let codec = if self.compact {
            Codec::Compact
        } else {
            Codec::Classic
        };
        let tx = registry.decode(codec, &bytes)?;

        println!("Version: {}", tx.version);
        println!("ID: {}", registry.id(&tx)?);
        if let Extension::Unknown(raw) = &tx.extension {
            println!("Unknown version, {} opaque body bytes", raw.len());
            return Ok(());
        }

        for i in 0..tx.coin_outputs.len() {
            println!("Coin output {}: {}", i, registry.coin_output_id(&tx, i as u64)?);
        }
        for i in 0..tx.block_stake_outputs.len() {
            println!(
                "Block stake output {}: {}",
                i,
                registry.block_stake_output_id(&tx, i as u64)?
            );
        }
        let json = registry.to_json_value(&tx)?;
        println!("{}", serde_json::to_string_pretty(&json)?);
        Ok(())
    }
}
