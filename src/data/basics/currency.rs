// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};
use std::str::FromStr;

use num::{BigUint, CheckedSub, Zero};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::protocol::{CodecError, Decodable, Decoder, Encodable, Encoder};

/// Main unit of value. It is arbitrary-precision and can never become negative.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Currency(BigUint);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("invalid currency string {0:?}")]
    InvalidString(String),
}

impl Currency {
    pub fn new(v: u64) -> Self {
        Self(BigUint::from(v))
    }

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `None` instead of going below zero.
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        self.0.checked_sub(&other.0).map(Self)
    }

    /// Big-endian magnitude, empty for zero.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.is_zero() {
            Vec::new()
        } else {
            self.0.to_bytes_be()
        }
    }
}

impl From<u64> for Currency {
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl Add for Currency {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl<'a> Add<&'a Currency> for Currency {
    type Output = Self;

    fn add(self, other: &'a Currency) -> Self {
        Self(self.0 + &other.0)
    }
}

impl AddAssign<&Currency> for Currency {
    fn add_assign(&mut self, other: &Currency) {
        self.0 += &other.0;
    }
}

impl Mul<u64> for Currency {
    type Output = Self;

    fn mul(self, other: u64) -> Self {
        Self(self.0 * other)
    }
}

impl<'a> Sum<&'a Currency> for Currency {
    fn sum<I: Iterator<Item = &'a Currency>>(iter: I) -> Self {
        iter.fold(Currency::zero(), |acc, c| acc + c)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CurrencyError::InvalidString(s.to_owned()));
        }
        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| CurrencyError::InvalidString(s.to_owned()))
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl Encodable for Currency {
    fn encode(&self, e: &mut Encoder) {
        e.write_bytes(&self.to_bytes());
    }
}

impl Decodable for Currency {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        let b = d.read_bytes()?;
        if b.first() == Some(&0) {
            return Err(CodecError::InvalidValue(
                "currency with leading zero byte".into(),
            ));
        }
        Ok(Self(BigUint::from_bytes_be(&b)))
    }
}
