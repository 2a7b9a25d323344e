//! Governance storage trait.

use crate::write_set::{CommitReceipt, WriteSet};
use crate::StoreError;
use curation_types::Address;

/// A message log entry as stored: its id and encoded body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: u64,
    pub data: Vec<u8>,
}

/// Storage for applications, rounds, deposits, the message log and engine
/// metadata.
///
/// Reads see only fully committed write sets: a backend must never expose a
/// state in which part of a [`WriteSet`] has been applied.
pub trait GovernanceStore: Send + Sync {
    /// Get the current application for a subject.
    fn get_application(&self, subject: &Address) -> Result<Option<Vec<u8>>, StoreError>;

    /// Get an earlier, archived application of a subject.
    fn get_archived_application(
        &self,
        subject: &Address,
        sequence: u32,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    /// All current applications, in subject order.
    fn list_applications(&self) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Get a round of a subject.
    fn get_round(&self, subject: &Address, index: u32) -> Result<Option<Vec<u8>>, StoreError>;

    /// Get one voter's deposit in a round.
    fn get_deposit(
        &self,
        subject: &Address,
        voter: &Address,
        round: u32,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    /// All deposits of a round, in voter order.
    fn get_round_deposits(&self, subject: &Address, round: u32)
        -> Result<Vec<Vec<u8>>, StoreError>;

    /// Messages with `start <= id < end`.
    fn get_messages(&self, start: u64, end: u64) -> Result<Vec<StoredMessage>, StoreError>;

    /// Number of messages ever appended (also the next message id).
    fn message_count(&self) -> Result<u64, StoreError>;

    /// Get an engine metadata value.
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Apply every operation of `batch` atomically.
    ///
    /// Appended messages receive consecutive ids in batch order.
    fn commit(&self, batch: WriteSet) -> Result<CommitReceipt, StoreError>;
}
