//! Typed access to governance records and per-subject write serialization.
//!
//! Records are `bincode`-encoded on their way into the byte-level
//! [`GovernanceStore`]. Writers of a subject hold that subject's lock from
//! their first read to their commit; readers go straight to the store, which
//! only ever exposes fully committed write sets.

use crate::admin::LameDuck;
use crate::application::Application;
use crate::deposit::Deposit;
use crate::error::GovernanceError;
use crate::message::{GovernanceMessage, MessageEntry, MessageLog};
use crate::round::Round;
use curation_store::{CommitReceipt, GovernanceStore, StoreError, WriteSet};
use curation_types::Address;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

const LAME_DUCK_KEY: &str = "lame_duck";

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, GovernanceError> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()).into())
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, GovernanceError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()).into())
}

/// One lock per subject, created on first use.
///
/// The table only holds weak references: a lock lives as long as some caller
/// holds its handle, and dead entries are dropped whenever a new one is added.
#[derive(Default)]
pub struct SubjectLocks {
    locks: Mutex<HashMap<Address, Weak<Mutex<()>>>>,
}

impl SubjectLocks {
    /// The lock guarding writes to `subject`.
    pub fn handle(&self, subject: &Address) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = locks.get(subject).and_then(Weak::upgrade) {
            return lock;
        }
        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(Mutex::new(()));
        locks.insert(subject.clone(), Arc::downgrade(&lock));
        lock
    }

    /// Number of entries in the table, live or not yet pruned.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Acquire a subject lock. The lock guards no data, so a panic in a previous
/// holder leaves nothing inconsistent and poisoning is ignored.
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Typed record changes committed together.
#[derive(Default)]
pub struct Batch {
    writes: WriteSet,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_application(&mut self, app: &Application) -> Result<(), GovernanceError> {
        self.writes.put_application(&app.subject, encode(app)?);
        Ok(())
    }

    pub fn archive_application(&mut self, app: &Application) -> Result<(), GovernanceError> {
        self.writes
            .archive_application(&app.subject, app.sequence, encode(app)?);
        Ok(())
    }

    pub fn put_round(&mut self, round: &Round) -> Result<(), GovernanceError> {
        self.writes
            .put_round(&round.subject, round.index, encode(round)?);
        Ok(())
    }

    pub fn put_deposit(&mut self, deposit: &Deposit) -> Result<(), GovernanceError> {
        self.writes.put_deposit(
            &deposit.subject,
            &deposit.voter,
            deposit.round,
            encode(deposit)?,
        );
        Ok(())
    }

    pub fn append_message(&mut self, entry: &MessageEntry) -> Result<(), GovernanceError> {
        self.writes.append_message(encode(entry)?);
        Ok(())
    }

    pub fn put_lame_duck(&mut self, state: &LameDuck) -> Result<(), GovernanceError> {
        self.writes.put_meta(LAME_DUCK_KEY, encode(state)?);
        Ok(())
    }
}

/// Owns application records keyed by subject, plus their rounds, deposits
/// and the message log.
pub struct ApplicationStore {
    store: Arc<dyn GovernanceStore>,
    locks: SubjectLocks,
}

impl ApplicationStore {
    pub fn new(store: Arc<dyn GovernanceStore>) -> Self {
        Self {
            store,
            locks: SubjectLocks::default(),
        }
    }

    pub fn lock_handle(&self, subject: &Address) -> Arc<Mutex<()>> {
        self.locks.handle(subject)
    }

    pub fn lock_table_len(&self) -> usize {
        self.locks.len()
    }

    pub fn application(&self, subject: &Address) -> Result<Option<Application>, GovernanceError> {
        self.store
            .get_application(subject)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn archived_application(
        &self,
        subject: &Address,
        sequence: u32,
    ) -> Result<Option<Application>, GovernanceError> {
        self.store
            .get_archived_application(subject, sequence)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn applications(&self) -> Result<Vec<Application>, GovernanceError> {
        self.store
            .list_applications()?
            .iter()
            .map(|bytes| decode(bytes))
            .collect()
    }

    pub fn round(&self, subject: &Address, index: u32) -> Result<Option<Round>, GovernanceError> {
        self.store
            .get_round(subject, index)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// The round an application is currently on. Missing means the store
    /// lost a record the application points at.
    pub fn current_round(&self, app: &Application) -> Result<Round, GovernanceError> {
        self.round(&app.subject, app.current_round)?.ok_or_else(|| {
            StoreError::Corruption(format!(
                "application {} points at missing round {}",
                app.id(),
                app.current_round
            ))
            .into()
        })
    }

    pub fn deposit(
        &self,
        subject: &Address,
        voter: &Address,
        round: u32,
    ) -> Result<Option<Deposit>, GovernanceError> {
        self.store
            .get_deposit(subject, voter, round)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn round_deposits(
        &self,
        subject: &Address,
        round: u32,
    ) -> Result<Vec<Deposit>, GovernanceError> {
        self.store
            .get_round_deposits(subject, round)?
            .iter()
            .map(|bytes| decode(bytes))
            .collect()
    }

    pub fn message_count(&self) -> Result<u64, GovernanceError> {
        Ok(self.store.message_count()?)
    }

    pub fn messages(&self, start: u64, end: u64) -> Result<Vec<GovernanceMessage>, GovernanceError> {
        let Some((start, end)) = MessageLog::page_bounds(start, end, self.message_count()?) else {
            return Ok(Vec::new());
        };
        self.store
            .get_messages(start, end)?
            .into_iter()
            .map(|m| decode(&m.data).map(|entry| GovernanceMessage::from_entry(m.id, entry)))
            .collect()
    }

    pub fn lame_duck(&self) -> Result<Option<LameDuck>, GovernanceError> {
        self.store
            .get_meta(LAME_DUCK_KEY)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn commit(&self, batch: Batch) -> Result<CommitReceipt, GovernanceError> {
        Ok(self.store.commit(batch.writes)?)
    }
}
