//! Top-level error type shared across crates.

use thiserror::Error;

/// Errors raised while constructing or validating shared types.
#[derive(Debug, Error)]
pub enum CurationError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("unknown subject kind: {0}")]
    UnknownSubjectKind(String),

    #[error("invalid governance parameters: {0}")]
    InvalidParams(String),
}
