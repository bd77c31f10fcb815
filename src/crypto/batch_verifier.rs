// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::cmp::max;

use super::keys::{verify_hash, SignatureError};
use super::{CryptoHash, PublicKey};

const MIN_CAPACITY: usize = 16;

/// Collects (key, message, signature) triples and verifies them all at once.
pub struct BatchVerifier {
    messages: Vec<CryptoHash>,
    public_keys: Vec<PublicKey>,
    signatures: Vec<Vec<u8>>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum BatchVerError {
    /// Signature at the given position in the batch failed.
    VerificationFailed(usize, SignatureError),
    ZeroSignaturesInBatch,
}

impl Default for BatchVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchVerifier {
    /// Pre-allocates space for a default number of signatures.
    pub fn new() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        // preallocate enough storage for the expected usage. We will reallocate as needed.
        let capacity = max(capacity, MIN_CAPACITY);
        BatchVerifier {
            messages: Vec::with_capacity(capacity),
            public_keys: Vec::with_capacity(capacity),
            signatures: Vec::with_capacity(capacity),
        }
    }

    pub fn enque_sig(&mut self, pk: PublicKey, msg: CryptoHash, sig: Vec<u8>) {
        self.messages.push(msg);
        self.public_keys.push(pk);
        self.signatures.push(sig);
    }

    pub fn num_sigs_enqued(&self) -> usize {
        self.messages.len()
    }

    /// Verifies that all the signatures are valid.
    /// An empty batch is an error.
    pub fn verify(&self) -> Result<(), BatchVerError> {
        if self.num_sigs_enqued() == 0 {
            return Err(BatchVerError::ZeroSignaturesInBatch);
        }

        for i in 0..self.messages.len() {
            verify_hash(&self.public_keys[i], &self.messages[i], &self.signatures[i])
                .map_err(|err| BatchVerError::VerificationFailed(i, err))?;
        }

        Ok(())
    }
}
