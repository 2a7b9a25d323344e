//! Account and contract addresses (`0x`-prefixed, 20 bytes hex).

use crate::error::CurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An address identifying either a participant (applicant, voter, admin)
/// or a subject (the factory or vault contract under review).
///
/// Always stored lowercase so that two spellings of the same address compare
/// equal and map to the same storage key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Address(String);

impl Address {
    /// The standard prefix for all addresses.
    pub const PREFIX: &'static str = "0x";

    /// Number of raw bytes behind the hex encoding.
    pub const BYTE_LEN: usize = 20;

    /// Parse and normalize an address.
    pub fn parse(raw: &str) -> Result<Self, CurationError> {
        let body = raw
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| CurationError::InvalidAddress(raw.to_string()))?;
        let bytes =
            hex::decode(body).map_err(|_| CurationError::InvalidAddress(raw.to_string()))?;
        if bytes.len() != Self::BYTE_LEN {
            return Err(CurationError::InvalidAddress(raw.to_string()));
        }
        Ok(Self(format!("{}{}", Self::PREFIX, hex::encode(bytes))))
    }

    /// Create an address from a raw string.
    ///
    /// # Panics
    /// Panics if the string is not a well-formed address.
    pub fn new(raw: impl AsRef<str>) -> Self {
        match Self::parse(raw.as_ref()) {
            Ok(address) => address,
            Err(e) => panic!("{e}"),
        }
    }

    /// Build an address from its raw bytes.
    pub fn from_bytes(bytes: [u8; Self::BYTE_LEN]) -> Self {
        Self(format!("{}{}", Self::PREFIX, hex::encode(bytes)))
    }

    /// Return the normalized address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = CurationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl FromStr for Address {
    type Err = CurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
