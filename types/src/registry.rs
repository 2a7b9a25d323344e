//! The master registry collaborator that receives approved subjects.

use crate::address::Address;
use crate::subject::SubjectKind;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the master registry is told about a newly registered subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub subject: Address,
    pub kind: SubjectKind,
    pub applicant: Address,
    pub title: String,
    pub metadata_uri: String,
    pub registered_at: Timestamp,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("registry rejected {subject}: {reason}")]
    Rejected { subject: String, reason: String },
}

/// External registry of admitted factories and vaults.
///
/// Implementations should treat a repeated registration of the same subject
/// as success: the engine retries until one call is acknowledged.
pub trait MasterRegistry: Send + Sync {
    fn register(&self, record: &RegistrationRecord) -> Result<(), RegistryError>;
}
