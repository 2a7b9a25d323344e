//! Collaborators the daemon hands the engine.
//!
//! The daemon is an operator tool: it never moves funds, so its ledger
//! refuses every transfer. Registrations are appended as JSON lines to an
//! outbox file that the master registry's importer consumes.

use curation_types::{
    Address, Amount, EscrowRef, Ledger, LedgerError, MasterRegistry, RegistrationRecord,
    RegistryError,
};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Appends one JSON object per registration to a file.
///
/// The importer treats a subject seen twice as one registration, so retries
/// after a partial failure are safe.
pub struct OutboxRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl OutboxRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }
}

impl MasterRegistry for OutboxRegistry {
    fn register(&self, record: &RegistrationRecord) -> Result<(), RegistryError> {
        let mut line = serde_json::to_string(record).map_err(|e| RegistryError::Rejected {
            subject: record.subject.to_string(),
            reason: e.to_string(),
        })?;
        line.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RegistryError::Unavailable(format!("{}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|e| RegistryError::Unavailable(format!("{}: {e}", self.path.display())))
    }
}

/// A ledger that refuses every transfer.
pub struct OfflineLedger;

impl OfflineLedger {
    fn refuse() -> Result<(), LedgerError> {
        Err(LedgerError::Unavailable(
            "the daemon has no ledger backend".to_string(),
        ))
    }
}

impl Ledger for OfflineLedger {
    fn collect_fee(&self, _: &Address, _: Amount, _: &EscrowRef) -> Result<(), LedgerError> {
        Self::refuse()
    }

    fn hold(&self, _: &Address, _: Amount, _: &EscrowRef) -> Result<(), LedgerError> {
        Self::refuse()
    }

    fn release(&self, _: &Address, _: Amount, _: &EscrowRef) -> Result<(), LedgerError> {
        Self::refuse()
    }

    fn forfeit(&self, _: Amount, _: &EscrowRef) -> Result<(), LedgerError> {
        Self::refuse()
    }

    fn reverse(&self, _: &Address, _: Amount, _: &EscrowRef) -> Result<(), LedgerError> {
        Self::refuse()
    }
}
