//! Nullable store — thread-safe in-memory storage for testing.

use curation_store::{
    CommitReceipt, GovernanceStore, StoreError, StoredMessage, WriteOp, WriteSet,
};
use curation_types::Address;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct Tables {
    applications: BTreeMap<String, Vec<u8>>,
    history: BTreeMap<(String, u32), Vec<u8>>,
    rounds: BTreeMap<(String, u32), Vec<u8>>,
    /// Keyed (subject, round, voter) so one round's deposits are contiguous.
    deposits: BTreeMap<(String, u32, String), Vec<u8>>,
    messages: Vec<Vec<u8>>,
    meta: HashMap<String, Vec<u8>>,
}

/// An in-memory governance store for testing.
///
/// All tables sit behind one lock, so a commit is trivially atomic.
#[derive(Default)]
pub struct NullStore {
    tables: Mutex<Tables>,
    fail_next_commit: AtomicBool,
    commits: Mutex<u64>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commit fail with a backend error, applying nothing.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> u64 {
        *self.commits.lock().unwrap()
    }
}

impl GovernanceStore for NullStore {
    fn get_application(&self, subject: &Address) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .applications
            .get(subject.as_str())
            .cloned())
    }

    fn get_archived_application(
        &self,
        subject: &Address,
        sequence: u32,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .history
            .get(&(subject.to_string(), sequence))
            .cloned())
    }

    fn list_applications(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .applications
            .values()
            .cloned()
            .collect())
    }

    fn get_round(&self, subject: &Address, index: u32) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .rounds
            .get(&(subject.to_string(), index))
            .cloned())
    }

    fn get_deposit(
        &self,
        subject: &Address,
        voter: &Address,
        round: u32,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .deposits
            .get(&(subject.to_string(), round, voter.to_string()))
            .cloned())
    }

    fn get_round_deposits(
        &self,
        subject: &Address,
        round: u32,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .deposits
            .iter()
            .filter(|((s, r, _), _)| s == subject.as_str() && *r == round)
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn get_messages(&self, start: u64, end: u64) -> Result<Vec<StoredMessage>, StoreError> {
        let tables = self.tables.lock().unwrap();
        let end = end.min(tables.messages.len() as u64);
        Ok((start..end)
            .map(|id| StoredMessage {
                id,
                data: tables.messages[id as usize].clone(),
            })
            .collect())
    }

    fn message_count(&self) -> Result<u64, StoreError> {
        Ok(self.tables.lock().unwrap().messages.len() as u64)
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables.lock().unwrap().meta.get(key).cloned())
    }

    fn commit(&self, batch: WriteSet) -> Result<CommitReceipt, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".into()));
        }

        let mut receipt = CommitReceipt::default();
        for op in batch.into_ops() {
            match op {
                WriteOp::PutApplication { subject, data } => {
                    tables.applications.insert(subject.to_string(), data);
                }
                WriteOp::ArchiveApplication {
                    subject,
                    sequence,
                    data,
                } => {
                    tables.history.insert((subject.to_string(), sequence), data);
                }
                WriteOp::PutRound {
                    subject,
                    index,
                    data,
                } => {
                    tables.rounds.insert((subject.to_string(), index), data);
                }
                WriteOp::PutDeposit {
                    subject,
                    voter,
                    round,
                    data,
                } => {
                    tables
                        .deposits
                        .insert((subject.to_string(), round, voter.to_string()), data);
                }
                WriteOp::AppendMessage { data } => {
                    receipt.message_ids.push(tables.messages.len() as u64);
                    tables.messages.push(data);
                }
                WriteOp::PutMeta { key, data } => {
                    tables.meta.insert(key, data);
                }
            }
        }
        *self.commits.lock().unwrap() += 1;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(seed: u8) -> Address {
        Address::from_bytes([seed; 20])
    }

    #[test]
    fn messages_get_dense_ids() {
        let store = NullStore::new();
        let mut batch = WriteSet::new();
        batch.append_message(vec![1]);
        batch.append_message(vec![2]);
        assert_eq!(store.commit(batch).unwrap().message_ids, vec![0, 1]);

        let mut batch = WriteSet::new();
        batch.append_message(vec![3]);
        assert_eq!(store.commit(batch).unwrap().message_ids, vec![2]);

        let page = store.get_messages(1, 10).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, 1);
        assert_eq!(page[1].data, vec![3]);
    }

    #[test]
    fn failed_commit_applies_nothing() {
        let store = NullStore::new();
        store.fail_next_commit();
        let mut batch = WriteSet::new();
        batch.put_application(&addr(1), vec![1]);
        batch.append_message(vec![1]);
        assert!(store.commit(batch).is_err());
        assert_eq!(store.get_application(&addr(1)).unwrap(), None);
        assert_eq!(store.message_count().unwrap(), 0);
        assert_eq!(store.commit_count(), 0);
    }

    #[test]
    fn round_deposits_are_scoped() {
        let store = NullStore::new();
        let mut batch = WriteSet::new();
        batch.put_deposit(&addr(1), &addr(5), 0, vec![1]);
        batch.put_deposit(&addr(1), &addr(6), 0, vec![2]);
        batch.put_deposit(&addr(1), &addr(5), 1, vec![3]);
        batch.put_deposit(&addr(2), &addr(5), 0, vec![4]);
        store.commit(batch).unwrap();
        assert_eq!(
            store.get_round_deposits(&addr(1), 0).unwrap(),
            vec![vec![1], vec![2]]
        );
    }
}
