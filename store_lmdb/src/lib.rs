//! LMDB storage backend for the curation governance engine.
//!
//! Implements [`curation_store::GovernanceStore`] using the `heed` LMDB
//! bindings. Each table maps to one LMDB database within a single
//! environment, and every write set is applied in one write transaction.

pub mod environment;
pub mod error;
pub mod governance;
pub mod migration;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use governance::LmdbGovernanceStore;
