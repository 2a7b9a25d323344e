//! Storage failures surfaced to the engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not read or commit (IO, LMDB, injected failure).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A record could not be encoded or decoded.
    #[error("record encoding error: {0}")]
    Serialization(String),

    /// Stored records contradict each other, e.g. an application pointing
    /// at a round that does not exist.
    #[error("governance records are inconsistent: {0}")]
    Corruption(String),
}
