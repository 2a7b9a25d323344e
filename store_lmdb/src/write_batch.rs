//! Write batching — applies a whole [`WriteSet`] inside a single LMDB write
//! transaction.
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).
//!
//! [`WriteSet`]: curation_store::WriteSet

use heed::RwTxn;

use curation_store::{CommitReceipt, StoreError, WriteOp};

use crate::governance::{
    deposit_key, indexed_key, message_key, read_next_message_id, subject_key,
    LmdbGovernanceStore, NEXT_MESSAGE_ID_KEY,
};
use crate::LmdbError;

pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    store: &'a LmdbGovernanceStore,
    next_message_id: u64,
    receipt: CommitReceipt,
}

impl<'a> WriteBatch<'a> {
    /// Begin a new write batch.
    pub(crate) fn new(store: &'a LmdbGovernanceStore) -> Result<Self, StoreError> {
        let txn = store.env.write_txn().map_err(LmdbError::from)?;
        let next_message_id = read_next_message_id(&store.meta_db, &txn)?;
        Ok(Self {
            txn,
            store,
            next_message_id,
            receipt: CommitReceipt::default(),
        })
    }

    pub fn apply(&mut self, op: WriteOp) -> Result<(), StoreError> {
        let s = self.store;
        let result = match op {
            WriteOp::PutApplication { subject, data } => s
                .applications_db
                .put(&mut self.txn, &subject_key(&subject), &data),
            WriteOp::ArchiveApplication {
                subject,
                sequence,
                data,
            } => s
                .history_db
                .put(&mut self.txn, &indexed_key(&subject, sequence), &data),
            WriteOp::PutRound {
                subject,
                index,
                data,
            } => s
                .rounds_db
                .put(&mut self.txn, &indexed_key(&subject, index), &data),
            WriteOp::PutDeposit {
                subject,
                voter,
                round,
                data,
            } => s
                .deposits_db
                .put(&mut self.txn, &deposit_key(&subject, round, &voter), &data),
            WriteOp::AppendMessage { data } => {
                let id = self.next_message_id;
                self.next_message_id += 1;
                self.receipt.message_ids.push(id);
                s.messages_db
                    .put(&mut self.txn, &message_key(id), &data)
            }
            WriteOp::PutMeta { key, data } => s.meta_db.put(&mut self.txn, key.as_bytes(), &data),
        };
        result.map_err(LmdbError::from)?;
        Ok(())
    }

    /// Commit all operations in this batch atomically.
    pub fn commit(mut self) -> Result<CommitReceipt, StoreError> {
        if !self.receipt.message_ids.is_empty() {
            self.store
                .meta_db
                .put(
                    &mut self.txn,
                    NEXT_MESSAGE_ID_KEY,
                    &self.next_message_id.to_be_bytes(),
                )
                .map_err(LmdbError::from)?;
        }
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(self.receipt)
    }
}
