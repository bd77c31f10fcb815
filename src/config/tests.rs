// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::fs;

use rand::{thread_rng, RngCore};
use tempfile::TempDir;

use super::*;
use crate::data::basics::{BlockHeight, Currency};
use crate::protocol::{TRANSACTION_VERSION_COIN_CREATION, TRANSACTION_VERSION_ONE};

const TESTDIR: &str = "testdir_iKywQ1m8eeAVRwURWaR0zQMLIdXSoqfpZlo8Wsuz";

#[test]
fn load_missing() {
    let res = ValidationConstants::load_from_disk(&TESTDIR);
    assert!(matches!(res, Err(ConfigError::IoError(_))));
}

#[test]
fn defaults() {
    let c = ValidationConstants::default();
    assert_eq!(c.block_size_limit, BLOCK_SIZE_LIMIT);
    assert_eq!(c.max_transaction_size(), 1_995_000);
    assert_eq!(c.arbitrary_data_size_limit, 83);
    assert!(c.is_version_active(TRANSACTION_VERSION_COIN_CREATION, BlockHeight(0)));
}

#[test]
fn network_presets() {
    let standard = ValidationConstants::for_network(STANDARD).unwrap();
    assert!(!standard.is_version_active(TRANSACTION_VERSION_COIN_CREATION, BlockHeight(0)));
    assert!(standard.is_version_active(TRANSACTION_VERSION_COIN_CREATION, BlockHeight(1)));
    assert!(standard.is_version_active(TRANSACTION_VERSION_ONE, BlockHeight(0)));

    let devnet = ValidationConstants::for_network(DEVNET).unwrap();
    assert!(devnet.is_version_active(TRANSACTION_VERSION_COIN_CREATION, BlockHeight(0)));

    assert!(matches!(
        ValidationConstants::for_network("nonet"),
        Err(ConfigError::UnknownNetwork(_))
    ));
}

#[test]
fn save_then_load() {
    let dir = TempDir::new().unwrap();
    let mut c = ValidationConstants::for_network(TESTNET).unwrap();
    c.minimum_miner_fee = Currency::new(42);
    c.save_to_disk(&dir.path()).unwrap();

    let loaded = ValidationConstants::load_from_disk(&dir.path()).unwrap();
    assert_eq!(loaded, c);
}

#[test]
fn merge_over_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONSTANTS_JSON_FILE),
        r#"{"minimumminerfee": "10", "versionactivationheights": {"129": 500}}"#,
    )
    .unwrap();

    let c = ValidationConstants::load_from_disk(&dir.path()).unwrap();
    assert_eq!(c.minimum_miner_fee, Currency::new(10));
    assert_eq!(c.block_size_limit, BLOCK_SIZE_LIMIT);
    assert!(!c.is_version_active(TRANSACTION_VERSION_COIN_CREATION, BlockHeight(499)));
    assert!(c.is_version_active(TRANSACTION_VERSION_COIN_CREATION, BlockHeight(500)));
}

#[test]
fn malformed_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CONSTANTS_JSON_FILE), "{\"blocksizelimit\": \"big\"}").unwrap();
    assert!(matches!(
        ValidationConstants::load_from_disk(&dir.path()),
        Err(ConfigError::SerializationError(_))
    ));
}

#[test]
fn key_file() {
    let dir = TempDir::new().unwrap();
    let mut seed = [0; 32];
    thread_rng().fill_bytes(&mut seed);
    let kp = crate::crypto::keypair_from_seed(&seed).unwrap();

    let path = dir.path().join(key_filename("alice"));
    write_keypair(&path, &kp).unwrap();
    let read = read_keypair(path.to_str().unwrap()).unwrap();
    assert_eq!(read.public, kp.public);

    fs::write(&path, [1, 2, 3]).unwrap();
    assert!(matches!(
        read_keypair(path.to_str().unwrap()),
        Err(ConfigError::InvalidKey(_))
    ));
}
