// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use thiserror::Error;

use crate::crypto::SignatureError;
use crate::data::basics::{UnlockHash, UnlockType};

/// The signature hash of the owning transaction could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot compute signature hash: {0}")]
pub struct SignatureHashError(pub String);

/// Reasons a fulfillment does not satisfy a condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("condition type {0} is unknown and cannot be fulfilled")]
    UnknownConditionType(u8),
    #[error("fulfillment type {0} is unknown and cannot fulfill any condition")]
    UnknownFulfillmentType(u8),
    #[error("fulfillment type {fulfillment} cannot fulfill condition type {condition}")]
    UnexpectedFulfillment { condition: u8, fulfillment: u8 },
    #[error("nil fulfillment cannot fulfill any condition")]
    NilFulfillment,
    #[error("unlock hash of type {0:?} cannot be fulfilled by this fulfillment")]
    UnexpectedUnlockType(UnlockType),
    #[error("signer {actual} is not the expected {expected}")]
    WrongSigner {
        expected: UnlockHash,
        actual: UnlockHash,
    },
    #[error("atomic swap can only be claimed with a secret")]
    MissingSecret,
    #[error("secret does not match the hashed secret")]
    InvalidSecret,
    #[error("embedded atomic swap condition does not match the condition being fulfilled")]
    ConditionMismatch,
    #[error("{provided} signatures given, at least {required} required")]
    InsufficientSignatures { required: u64, provided: usize },
    #[error("public key {0} signed more than once")]
    DuplicatePublicKey(UnlockHash),
    #[error("public key {0} is not part of the multisig condition")]
    UnauthorizedPublicKey(UnlockHash),
    #[error("time lock {0} not yet reached")]
    PrematureTimeLock(u64),
    #[error("invalid signature")]
    InvalidSignature(#[from] SignatureError),
    #[error(transparent)]
    SignatureHash(#[from] SignatureHashError),
}

/// Reasons a condition could not be signed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("condition type {0} is unknown and cannot be signed")]
    UnknownConditionType(u8),
    #[error("the given key material cannot sign condition type {0}")]
    UnexpectedKeyMaterial(u8),
    #[error("key {0} is not authorized by the condition")]
    UnauthorizedKey(UnlockHash),
    #[error("key {0} already signed")]
    DuplicateKey(UnlockHash),
    #[error("condition cannot be signed: {0}")]
    UnsupportedCondition(&'static str),
    #[error("secret does not match the hashed secret")]
    InvalidSecret,
    #[error("fulfillment type {0} cannot be co-signed")]
    UnexpectedFulfillment(u8),
    #[error(transparent)]
    SignatureHash(#[from] SignatureHashError),
}
