use crate::application::ApplicationStatus;
use curation_store::StoreError;
use curation_types::{Amount, CurationError, LedgerError, Timestamp};
use thiserror::Error;

/// Broad class of a [`GovernanceError`], for callers deciding how to react.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; the caller can fix the request.
    Validation,
    /// The operation is not valid in the application's current phase.
    State,
    /// The caller may not perform the operation.
    Authorization,
    /// A collaborator (ledger) refused or failed.
    Downstream,
    /// Storage or encoding failure.
    Storage,
}

#[derive(Debug, Error)]
pub enum GovernanceError {
    // ── Validation ──────────────────────────────────────────────────────
    #[error("insufficient fee: required {required}, provided {provided}")]
    InsufficientFee { required: Amount, provided: Amount },

    #[error("deposit below minimum: required {required}, provided {provided}")]
    BelowMinDeposit { required: Amount, provided: Amount },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("message is {len} bytes, longer than the {max} byte limit")]
    MessageTooLong { len: usize, max: usize },

    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] CurationError),

    // ── State ───────────────────────────────────────────────────────────
    #[error("no application for subject {0}")]
    ApplicationNotFound(String),

    #[error("subject {subject} has no round {round}")]
    RoundNotFound { subject: String, round: u32 },

    #[error("{voter} has no deposit in round {round} of {subject}")]
    DepositNotFound {
        subject: String,
        voter: String,
        round: u32,
    },

    #[error("subject {subject} already has an application in status {current}")]
    DuplicateSubject {
        subject: String,
        current: ApplicationStatus,
    },

    #[error("application is {current}, votes need Voting or ChallengeVoting with an open round")]
    NotVoting { current: ApplicationStatus },

    #[error("round {round} ends at {ends_at}, now is {now}")]
    RoundNotEnded {
        round: u32,
        ends_at: Timestamp,
        now: Timestamp,
    },

    #[error("round {round} is already finalized (application is {current})")]
    AlreadyFinalized {
        round: u32,
        current: ApplicationStatus,
    },

    #[error("round {round} is not finalized yet")]
    RoundNotFinalized { round: u32 },

    #[error("deposit of {voter} in round {round} was already claimed")]
    AlreadyClaimed { voter: String, round: u32 },

    #[error("application is {current}, challenges need an open ChallengeWindow")]
    NotInWindow { current: ApplicationStatus },

    #[error("this challenge window was already challenged by {challenger}")]
    AlreadyChallenged { challenger: String },

    #[error("voter's stake in round {round} is locked to approve={approve}")]
    DirectionLocked { round: u32, approve: bool },

    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    // ── Authorization ───────────────────────────────────────────────────
    #[error("unauthorized")]
    Unauthorized,

    #[error("lame duck mode is active")]
    LameDuckActive,

    #[error("engine is frozen")]
    EngineFrozen,

    // ── Downstream / storage ────────────────────────────────────────────
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("stake arithmetic overflow")]
    Overflow,
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientFee { .. }
            | Self::BelowMinDeposit { .. }
            | Self::MissingField(_)
            | Self::MessageTooLong { .. }
            | Self::InvalidParams(_)
            | Self::Overflow => ErrorKind::Validation,
            Self::ApplicationNotFound(_)
            | Self::RoundNotFound { .. }
            | Self::DepositNotFound { .. }
            | Self::DuplicateSubject { .. }
            | Self::NotVoting { .. }
            | Self::RoundNotEnded { .. }
            | Self::AlreadyFinalized { .. }
            | Self::RoundNotFinalized { .. }
            | Self::AlreadyClaimed { .. }
            | Self::NotInWindow { .. }
            | Self::AlreadyChallenged { .. }
            | Self::DirectionLocked { .. }
            | Self::InvalidTransition { .. } => ErrorKind::State,
            Self::Unauthorized | Self::LameDuckActive | Self::EngineFrozen => {
                ErrorKind::Authorization
            }
            Self::Ledger(_) => ErrorKind::Downstream,
            Self::Store(_) => ErrorKind::Storage,
        }
    }
}
