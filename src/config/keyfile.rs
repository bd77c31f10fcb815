// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::fs;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use ed25519_dalek::{Keypair, SECRET_KEY_LENGTH};

use super::*;
use crate::crypto::keypair_from_seed;

/// Gives the key filename that corresponds to the given key name.
pub fn key_filename(name: &str) -> String {
    format!("{}.key", name)
}

/// Expands a leading `~` and environment variables in a user-supplied path.
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e.to_string()))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Reads a key file, which holds the raw 32-byte ed25519 seed.
pub fn read_keypair(filename: &str) -> Result<Keypair> {
    let seed = fs::read(expand_path(filename)?)?;
    if seed.len() != SECRET_KEY_LENGTH {
        return Err(ConfigError::InvalidKey(SignatureError::InvalidSecretKey));
    }
    Ok(keypair_from_seed(&seed)?)
}

/// Writes the seed of a key to a file only readable by its owner.
pub fn write_keypair(filename: &impl AsRef<Path>, kp: &Keypair) -> Result<()> {
    let mut f = fs::OpenOptions::new()
        .write(true)
        .read(false)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(filename)?;
    f.write_all(kp.secret.as_bytes())?;
    Ok(())
}
