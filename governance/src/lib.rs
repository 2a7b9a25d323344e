//! Stake-weighted curation governance for the factory and vault registry.
//!
//! Lifecycle: Submitted → Voting → (Approved → ChallengeWindow →
//! ChallengeVoting → …) → Registered | Rejected.
//!
//! Voters lock stake behind their vote; a round needs a minimum combined
//! stake (quorum) to decide anything, ties reject. Every approval opens a
//! challenge window in which anyone may force another round. Windows that
//! close unchallenged register the subject with the master registry.
//!
//! There are no timers: deadlines are evaluated lazily against the clock by
//! whichever operation touches an application next.

pub mod admin;
pub mod application;
pub mod challenge;
pub mod deposit;
pub mod engine;
pub mod error;
pub mod message;
pub mod registry;
pub mod round;
pub mod store;

pub use admin::{AdminControls, LameDuck};
pub use application::{
    Application, ApplicationId, ApplicationStatus, ChallengeWindow, NewApplication,
};
pub use challenge::ChallengeController;
pub use deposit::{Deposit, DepositLedger, Settlement, Transfer};
pub use engine::{CurationEngine, Receipt};
pub use error::{ErrorKind, GovernanceError};
pub use message::{GovernanceMessage, MessageKind, MessageLog};
pub use registry::{ReconcileReport, RegistryBridge};
pub use round::{FinalizeOutcome, Round, RoundEngine, RoundOutcome};
pub use store::{ApplicationStore, Batch, SubjectLocks};
