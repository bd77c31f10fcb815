// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::error::Error;

use clap::Parser;
use ed25519_dalek::SECRET_KEY_LENGTH;
use rand::{thread_rng, RngCore};

use rivtx::config;
use rivtx::crypto::{self, PublicKey};
use rivtx::data::basics::UnlockHash;

/// Generates a new ed25519 key
#[derive(Parser)]
pub struct GenerateCmd {
    /// Key name, the key is written to <name>.key
    #[clap(short = 'n', long = "name", required = true)]
    name: String,
}

impl GenerateCmd {
    pub fn entrypoint(&self) -> Result<(), Box<dyn Error>> {
        let mut seed = [0; SECRET_KEY_LENGTH];
        thread_rng().fill_bytes(&mut seed);
        let kp = crypto::keypair_from_seed(&seed)?;

        let filename = config::key_filename(&self.name);
        config::write_keypair(&config::expand_path(&filename)?, &kp)?;

        println!("Key written to: {}", filename);
        println!(
            "Address: {}",
            UnlockHash::from_public_key(&PublicKey::from(&kp))
        );
        Ok(())
    }
}
