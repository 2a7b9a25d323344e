//! Nullable infrastructure for deterministic testing.
//!
//! Every capability the engine consumes from its environment (clock, storage,
//! ledger, master registry) has a test-friendly implementation here that:
//! - Returns deterministic values
//! - Can be controlled programmatically, including injected failures
//! - Never touches the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod ledger;
pub mod registry;
pub mod store;

pub use clock::NullClock;
pub use ledger::{LedgerEvent, NullLedger};
pub use registry::NullRegistry;
pub use store::NullStore;
