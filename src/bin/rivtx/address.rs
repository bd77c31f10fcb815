// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::error::Error;

use clap::Parser;

use rivtx::config;
use rivtx::crypto::PublicKey;
use rivtx::data::basics::UnlockHash;

/// Prints the address of a key file
#[derive(Parser)]
pub struct AddressCmd {
    /// Private key filename
    #[clap(short = 'f', long = "keyfile", required = true)]
    key_file: String,
}

impl AddressCmd {
    pub fn entrypoint(&self) -> Result<(), Box<dyn Error>> {
        let kp = config::read_keypair(&self.key_file)?;
        let pk = PublicKey::from(&kp);
        println!("Public key: {}", pk);
        println!("Address: {}", UnlockHash::from_public_key(&pk));
        Ok(())
    }
}
