// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::error::Error;
use std::fs;

use clap::Parser;
use tracing::warn;

use rivtx::config;
use rivtx::crypto::PublicKey;
use rivtx::data::basics::{Currency, UnlockHash};
use rivtx::data::transactions::{
    BlockStakeOutput, CoinOutput, Extension, OutputSet, TransactionRegistry,
};
use rivtx::data::unlock::{Condition, KeyMaterial};
use rivtx::protocol::Codec;

/// Signs every input of a JSON transaction that spends an output of the key's address
#[derive(Parser)]
pub struct SignCmd {
    /// Private key filename
    #[clap(short = 'f', long = "keyfile", required = true)]
    key_file: String,
    /// Transaction input filename (JSON)
    #[clap(short = 't', long = "txfile", required = true)]
    tx_file: String,
    /// Signed transaction output filename (JSON), stdout if not given
    #[clap(short = 'o', long = "outfile")]
    out_file: Option<String>,
}

impl SignCmd {
    pub fn entrypoint(&self, registry: &TransactionRegistry) -> Result<(), Box<dyn Error>> {
        let kp = config::read_keypair(&self.key_file)?;
        let condition = Condition::from(UnlockHash::from_public_key(&PublicKey::from(&kp)));

        let content = fs::read_to_string(config::expand_path(&self.tx_file)?)?;
        let mut tx = registry.from_json(&content)?;

        // the spent outputs are not known here, assume they are all locked to this key
        let mut outputs = OutputSet::new();
        for ci in &tx.coin_inputs {
            outputs.insert_coin_output(
                ci.parent_id,
                CoinOutput {
                    value: Currency::zero(),
                    condition: condition.clone(),
                },
            );
        }
        for bsi in &tx.block_stake_inputs {
            outputs.insert_block_stake_output(
                bsi.parent_id,
                BlockStakeOutput {
                    value: Currency::zero(),
                    condition: condition.clone(),
                },
            );
        }

        let signed = tx.sign_inputs(registry, &outputs, |_| Some(KeyMaterial::Ed25519(&kp)))?;
        if matches!(
            tx.extension,
            Extension::CoinCreation(_) | Extension::MinterDefinition(_)
        ) {
            registry.sign_extension(&mut tx, KeyMaterial::Ed25519(&kp))?;
        } else if signed == 0 {
            warn!("transaction has no inputs to sign");
        }

        let json = serde_json::to_string_pretty(&registry.to_json_value(&tx)?)?;
        match &self.out_file {
            Some(file) => fs::write(config::expand_path(file)?, json)?,
            None => println!("{}", json),
        }
        eprintln!("ID: {}", registry.id(&tx)?);
        eprintln!(
            "Hex: {}",
            data_encoding::HEXLOWER.encode(&registry.encode(Codec::Classic, &tx)?)
        );
        Ok(())
    }
}
