//! Fundamental types for the curation governance engine.
//!
//! This crate defines the types shared by every other crate in the workspace:
//! addresses, amounts, timestamps, identities, governance parameters, and the
//! capability traits the engine consumes from its environment (clock, ledger,
//! master registry).

pub mod address;
pub mod amount;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod params;
pub mod registry;
pub mod subject;
pub mod time;

pub use address::Address;
pub use amount::Amount;
pub use error::CurationError;
pub use identity::{Identity, Role};
pub use ledger::{EscrowRef, Ledger, LedgerError};
pub use params::{ForfeitPolicy, GovernanceParams};
pub use registry::{MasterRegistry, RegistrationRecord, RegistryError};
pub use subject::SubjectKind;
pub use time::{Clock, SystemClock, Timestamp};
