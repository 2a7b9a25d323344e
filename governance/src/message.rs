//! Governance message log — the append-only record of submission notes,
//! vote comments and challenge rationale.

use crate::error::GovernanceError;
use curation_types::params::{MAX_MESSAGE_LEN, MAX_MESSAGE_PAGE};
use curation_types::{Address, Timestamp};
use serde::{Deserialize, Serialize};

/// Which operation produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Application,
    Vote,
    Challenge,
}

/// A message as stored; the id is the storage key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntry {
    pub sender: Address,
    pub subject: Address,
    pub body: String,
    pub timestamp: Timestamp,
    pub kind: MessageKind,
}

/// A message with its position in the global log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceMessage {
    pub id: u64,
    pub sender: Address,
    pub subject: Address,
    pub body: String,
    pub timestamp: Timestamp,
    pub kind: MessageKind,
}

impl GovernanceMessage {
    pub fn from_entry(id: u64, entry: MessageEntry) -> Self {
        Self {
            id,
            sender: entry.sender,
            subject: entry.subject,
            body: entry.body,
            timestamp: entry.timestamp,
            kind: entry.kind,
        }
    }
}

pub struct MessageLog;

impl MessageLog {
    /// Refuse bodies over the size limit. Empty bodies are allowed.
    pub fn validate(body: &str) -> Result<(), GovernanceError> {
        if body.len() > MAX_MESSAGE_LEN {
            return Err(GovernanceError::MessageTooLong {
                len: body.len(),
                max: MAX_MESSAGE_LEN,
            });
        }
        Ok(())
    }

    pub fn entry(
        sender: &Address,
        subject: &Address,
        body: &str,
        kind: MessageKind,
        now: Timestamp,
    ) -> MessageEntry {
        MessageEntry {
            sender: sender.clone(),
            subject: subject.clone(),
            body: body.to_string(),
            timestamp: now,
            kind,
        }
    }

    /// Clamp a `[start, end)` query to one page of an `count`-message log.
    ///
    /// Returns `None` when the range is empty.
    pub fn page_bounds(start: u64, end: u64, count: u64) -> Option<(u64, u64)> {
        let end = end.min(count).min(start.saturating_add(MAX_MESSAGE_PAGE));
        (start < end).then_some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_is_clamped_to_log_and_page_size() {
        assert_eq!(MessageLog::page_bounds(0, 10, 5), Some((0, 5)));
        assert_eq!(MessageLog::page_bounds(0, u64::MAX, 5_000), Some((0, MAX_MESSAGE_PAGE)));
        assert_eq!(MessageLog::page_bounds(5, 5, 10), None);
        assert_eq!(MessageLog::page_bounds(8, 3, 10), None);
        assert_eq!(MessageLog::page_bounds(12, 20, 10), None);
    }

    #[test]
    fn oversized_body_is_refused() {
        let body = "x".repeat(MAX_MESSAGE_LEN + 1);
        assert!(matches!(
            MessageLog::validate(&body),
            Err(GovernanceError::MessageTooLong { .. })
        ));
        MessageLog::validate("").unwrap();
    }
}
