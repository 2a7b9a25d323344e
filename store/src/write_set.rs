//! Write sets — the unit of atomic commit.
//!
//! An engine operation collects every record it changes into one
//! [`WriteSet`]. The store applies the whole set or nothing, which is what
//! keeps a finalized round and its application status from ever being seen
//! out of step.

use curation_types::Address;

/// One record change inside a write set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    PutApplication {
        subject: Address,
        data: Vec<u8>,
    },
    ArchiveApplication {
        subject: Address,
        sequence: u32,
        data: Vec<u8>,
    },
    PutRound {
        subject: Address,
        index: u32,
        data: Vec<u8>,
    },
    PutDeposit {
        subject: Address,
        voter: Address,
        round: u32,
        data: Vec<u8>,
    },
    AppendMessage {
        data: Vec<u8>,
    },
    PutMeta {
        key: String,
        data: Vec<u8>,
    },
}

/// Ordered collection of record changes committed together.
#[derive(Clone, Debug, Default)]
pub struct WriteSet {
    ops: Vec<WriteOp>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_application(&mut self, subject: &Address, data: Vec<u8>) {
        self.ops.push(WriteOp::PutApplication {
            subject: subject.clone(),
            data,
        });
    }

    pub fn archive_application(&mut self, subject: &Address, sequence: u32, data: Vec<u8>) {
        self.ops.push(WriteOp::ArchiveApplication {
            subject: subject.clone(),
            sequence,
            data,
        });
    }

    pub fn put_round(&mut self, subject: &Address, index: u32, data: Vec<u8>) {
        self.ops.push(WriteOp::PutRound {
            subject: subject.clone(),
            index,
            data,
        });
    }

    pub fn put_deposit(&mut self, subject: &Address, voter: &Address, round: u32, data: Vec<u8>) {
        self.ops.push(WriteOp::PutDeposit {
            subject: subject.clone(),
            voter: voter.clone(),
            round,
            data,
        });
    }

    pub fn append_message(&mut self, data: Vec<u8>) {
        self.ops.push(WriteOp::AppendMessage { data });
    }

    pub fn put_meta(&mut self, key: &str, data: Vec<u8>) {
        self.ops.push(WriteOp::PutMeta {
            key: key.to_string(),
            data,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// What a commit produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Ids assigned to the batch's appended messages, in batch order.
    pub message_ids: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_keep_insertion_order() {
        let subject = Address::from_bytes([1; 20]);
        let mut batch = WriteSet::new();
        batch.put_round(&subject, 0, vec![1]);
        batch.append_message(vec![2]);
        batch.put_application(&subject, vec![3]);
        assert_eq!(batch.len(), 3);
        assert!(matches!(batch.ops()[0], WriteOp::PutRound { index: 0, .. }));
        assert!(matches!(batch.ops()[1], WriteOp::AppendMessage { .. }));
        assert!(matches!(batch.ops()[2], WriteOp::PutApplication { .. }));
    }
}
