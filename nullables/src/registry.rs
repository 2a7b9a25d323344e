//! Nullable master registry — records registrations, can be made to fail.

use curation_types::{Address, MasterRegistry, RegistrationRecord, RegistryError};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct NullRegistry {
    records: Mutex<Vec<RegistrationRecord>>,
    failing: AtomicBool,
    calls: AtomicU32,
}

impl NullRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every registration fails with `Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Accepted registrations, one per subject.
    pub fn registrations(&self) -> Vec<RegistrationRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn is_registered(&self, subject: &Address) -> bool {
        self.records
            .lock()
            .unwrap()
            .iter()
            .any(|r| &r.subject == subject)
    }

    /// Number of `register` calls, failed ones included.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MasterRegistry for NullRegistry {
    fn register(&self, record: &RegistrationRecord) -> Result<(), RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("null registry offline".into()));
        }
        let mut records = self.records.lock().unwrap();
        if !records.iter().any(|r| r.subject == record.subject) {
            records.push(record.clone());
        }
        Ok(())
    }
}
