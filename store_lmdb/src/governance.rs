//! LMDB implementation of GovernanceStore.
//!
//! Key formats (binary composite keys; addresses all have the same length,
//! so prefix scans per subject or per round are exact):
//! - applications: `subject`
//! - application_history: `subject ++ sequence_be`
//! - rounds: `subject ++ index_be`
//! - deposits: `subject ++ round_be ++ voter`
//! - messages: `id_be`
//! - meta: the key's UTF-8 bytes

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use curation_store::{CommitReceipt, GovernanceStore, StoreError, StoredMessage, WriteSet};
use curation_types::Address;

use crate::write_batch::WriteBatch;
use crate::LmdbError;

pub(crate) const NEXT_MESSAGE_ID_KEY: &[u8] = b"next_message_id";

pub struct LmdbGovernanceStore {
    pub(crate) env: Arc<Env>,
    pub(crate) applications_db: Database<Bytes, Bytes>,
    pub(crate) history_db: Database<Bytes, Bytes>,
    pub(crate) rounds_db: Database<Bytes, Bytes>,
    pub(crate) deposits_db: Database<Bytes, Bytes>,
    pub(crate) messages_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

pub(crate) fn subject_key(subject: &Address) -> Vec<u8> {
    subject.as_str().as_bytes().to_vec()
}

/// `subject ++ n_be`, used for both history and round keys.
pub(crate) fn indexed_key(subject: &Address, n: u32) -> Vec<u8> {
    let mut key = subject_key(subject);
    key.extend_from_slice(&n.to_be_bytes());
    key
}

pub(crate) fn deposit_key(subject: &Address, round: u32, voter: &Address) -> Vec<u8> {
    let mut key = indexed_key(subject, round);
    key.extend_from_slice(voter.as_str().as_bytes());
    key
}

pub(crate) fn message_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// Turn `prefix` into the smallest key greater than every key it prefixes.
pub(crate) fn increment_prefix(prefix: &mut Vec<u8>) {
    while let Some(last) = prefix.pop() {
        if last < u8::MAX {
            prefix.push(last + 1);
            return;
        }
    }
}

pub(crate) fn read_next_message_id(
    meta_db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
) -> Result<u64, LmdbError> {
    match meta_db.get(txn, NEXT_MESSAGE_ID_KEY)? {
        Some(bytes) => {
            let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                LmdbError::Serialization("next_message_id has unexpected byte length".into())
            })?;
            Ok(u64::from_be_bytes(arr))
        }
        None => Ok(0),
    }
}

impl GovernanceStore for LmdbGovernanceStore {
    fn get_application(&self, subject: &Address) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .applications_db
            .get(&rtxn, &subject_key(subject))
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn get_archived_application(
        &self,
        subject: &Address,
        sequence: u32,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .history_db
            .get(&rtxn, &indexed_key(subject, sequence))
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn list_applications(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for result in self.applications_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (_key, val) = result.map_err(LmdbError::from)?;
            results.push(val.to_vec());
        }
        Ok(results)
    }

    fn get_round(&self, subject: &Address, index: u32) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .rounds_db
            .get(&rtxn, &indexed_key(subject, index))
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn get_deposit(
        &self,
        subject: &Address,
        voter: &Address,
        round: u32,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .deposits_db
            .get(&rtxn, &deposit_key(subject, round, voter))
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn get_round_deposits(
        &self,
        subject: &Address,
        round: u32,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let prefix = indexed_key(subject, round);
        let mut upper = prefix.clone();
        increment_prefix(&mut upper);

        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bounds = (
            Bound::Included(prefix.as_slice()),
            Bound::Excluded(upper.as_slice()),
        );
        let iter = self
            .deposits_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for result in iter {
            let (_key, val) = result.map_err(LmdbError::from)?;
            results.push(val.to_vec());
        }
        Ok(results)
    }

    fn get_messages(&self, start: u64, end: u64) -> Result<Vec<StoredMessage>, StoreError> {
        if start >= end {
            return Ok(Vec::new());
        }
        let lower = message_key(start);
        let upper = message_key(end);
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bounds = (
            Bound::Included(lower.as_slice()),
            Bound::Excluded(upper.as_slice()),
        );
        let iter = self
            .messages_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for result in iter {
            let (key, val) = result.map_err(LmdbError::from)?;
            let id: [u8; 8] = key
                .try_into()
                .map_err(|_| StoreError::Corruption("message key is not 8 bytes".into()))?;
            results.push(StoredMessage {
                id: u64::from_be_bytes(id),
                data: val.to_vec(),
            });
        }
        Ok(results)
    }

    fn message_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(read_next_message_id(&self.meta_db, &rtxn)?)
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn commit(&self, batch: WriteSet) -> Result<CommitReceipt, StoreError> {
        let mut writer = WriteBatch::new(self)?;
        for op in batch.into_ops() {
            writer.apply(op)?;
        }
        writer.commit()
    }
}
