//! Kinds of subject that can be curated into the registry.

use crate::error::CurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What kind of entity an application asks to register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectKind {
    /// A factory template that deploys vaults.
    Factory,
    /// A vault fund.
    Vault,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Factory => "factory",
            Self::Vault => "vault",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectKind {
    type Err = CurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "factory" => Ok(Self::Factory),
            "vault" => Ok(Self::Vault),
            _ => Err(CurationError::UnknownSubjectKind(s.to_string())),
        }
    }
}
