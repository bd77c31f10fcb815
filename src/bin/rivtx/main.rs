// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

mod address;
mod generate;
mod inspect;
mod sign;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rivtx::config;
use rivtx::crypto::PublicKey;
use rivtx::data::basics::UnlockHash;
use rivtx::data::transactions::{MintConditionHistory, TransactionRegistry};
use rivtx::data::unlock::Condition;

use address::AddressCmd;
use generate::GenerateCmd;
use inspect::InspectCmd;
use sign::SignCmd;

/// CLI for inspecting and signing transactions
#[derive(Parser)]
#[clap(name = "rivtx", version = "0.1")]
#[clap(author = "Quentin M. Kniep <hello@quentinkniep.com>")]
#[clap(arg_required_else_help = true)]
struct RootCmd {
    /// Enables minting transaction versions, authorized by the given key file
    #[clap(long = "minter-keyfile", global = true)]
    minter_keyfile: Option<String>,
    #[clap(subcommand)]
    subcmd: SubCmd,
}

#[derive(Subcommand)]
enum SubCmd {
    Generate(GenerateCmd),
    Address(AddressCmd),
    Inspect(InspectCmd),
    Sign(SignCmd),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cmd: RootCmd = RootCmd::parse();
    let registry = match registry(&cmd.minter_keyfile) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[Error] Could not read minter key: {}", e);
            std::process::exit(1);
        }
    };

    let res = match cmd.subcmd {
        SubCmd::Generate(g) => g.entrypoint(),
        SubCmd::Address(a) => a.entrypoint(),
        SubCmd::Inspect(i) => i.entrypoint(&registry),
        SubCmd::Sign(s) => s.entrypoint(&registry),
    };
    if let Err(e) = res {
        eprintln!("[Error] {}", e);
        std::process::exit(1);
    }
}

/// The standard versions, plus minting when a minter key is given.
fn registry(minter_keyfile: &Option<String>) -> config::Result<TransactionRegistry> {
    match minter_keyfile {
        None => Ok(TransactionRegistry::standard()),
        Some(file) => {
            let kp = config::read_keypair(file)?;
            let minter = UnlockHash::from_public_key(&PublicKey::from(&kp));
            let history = MintConditionHistory::new(Condition::from(minter));
            Ok(TransactionRegistry::with_minting(Arc::new(history)))
        }
    }
}
