//! Abstract storage traits for the curation governance engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements
//! [`GovernanceStore`]. The engine depends only on the trait and hands it
//! `bincode`-encoded records; backends never interpret values.

pub mod error;
pub mod governance;
pub mod write_set;

pub use error::StoreError;
pub use governance::{GovernanceStore, StoredMessage};
pub use write_set::{CommitReceipt, WriteOp, WriteSet};
