//! Applications and their status graph.

use crate::error::GovernanceError;
use curation_types::{Address, Amount, SubjectKind, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Phases of an application.
///
/// ```text
/// Submitted -> Voting -> Approved | Rejected
/// Approved -> ChallengeWindow -> ChallengeVoting | Registered
/// ChallengeVoting -> Approved | Rejected
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    /// Created, round 0 not yet open. Only ever seen inside a submission.
    Submitted,
    /// Initial voting round is open or awaiting finalization.
    Voting,
    /// Approved; anyone may challenge until the window closes.
    ChallengeWindow,
    /// A challenge round is open or awaiting finalization.
    ChallengeVoting,
    /// A round just approved the application. Immediately followed by a new
    /// challenge window.
    Approved,
    /// Terminal: rejected by vote or by quorum failure.
    Rejected,
    /// Terminal: admitted and handed to the master registry.
    Registered,
}

impl ApplicationStatus {
    /// Whether the status graph has an edge `self -> next`.
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Submitted, Voting)
                | (Voting, Approved)
                | (Voting, Rejected)
                | (Approved, ChallengeWindow)
                | (ChallengeWindow, ChallengeVoting)
                | (ChallengeWindow, Registered)
                | (ChallengeVoting, Approved)
                | (ChallengeVoting, Rejected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Registered)
    }

    /// Whether the current round of an application in this status takes votes.
    pub fn accepts_votes(self) -> bool {
        matches!(self, Self::Voting | Self::ChallengeVoting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::Voting => "Voting",
            Self::ChallengeWindow => "ChallengeWindow",
            Self::ChallengeVoting => "ChallengeVoting",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Registered => "Registered",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one submission of a subject.
///
/// A subject rejected for good may be submitted again; each submission gets
/// the next `sequence`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId {
    pub subject: Address,
    pub sequence: u32,
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.subject, self.sequence)
    }
}

/// The challenge window opened by an approval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeWindow {
    pub opened_at: Timestamp,
    pub closes_at: Timestamp,
    /// Set once someone challenges inside this window.
    pub challenged_by: Option<Address>,
}

/// A request to admit a subject into the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub subject: Address,
    pub subject_kind: SubjectKind,
    pub title: String,
    pub display_title: String,
    pub metadata_uri: String,
    pub features: BTreeSet<String>,
    /// Fee attached to the submission.
    pub fee: Amount,
    /// Free-text note recorded in the message log.
    pub message: String,
}

/// A submitted application and its progress through governance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub applicant: Address,
    pub subject: Address,
    pub subject_kind: SubjectKind,
    /// Submission count of this subject, starting at 0.
    pub sequence: u32,
    pub title: String,
    pub display_title: String,
    pub metadata_uri: String,
    pub features: BTreeSet<String>,
    pub status: ApplicationStatus,
    pub submitted_at: Timestamp,
    /// Index of this application's first round. Round indexes keep counting
    /// across resubmissions of the same subject.
    pub first_round: u32,
    pub current_round: u32,
    /// Running stake totals across all rounds, informational only.
    pub cumulative_approval: Amount,
    pub cumulative_rejection: Amount,
    pub challenge_window: Option<ChallengeWindow>,
    /// Whether the master registry acknowledged the registration.
    pub registry_synced: bool,
}

impl Application {
    pub fn id(&self) -> ApplicationId {
        ApplicationId {
            subject: self.subject.clone(),
            sequence: self.sequence,
        }
    }

    /// Move along one edge of the status graph.
    pub(crate) fn transition(&mut self, next: ApplicationStatus) -> Result<(), GovernanceError> {
        if !self.status.can_transition_to(next) {
            return Err(GovernanceError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Whether the challenge window closed at or before `now` without a
    /// challenge.
    pub fn window_elapsed(&self, now: Timestamp) -> bool {
        self.status == ApplicationStatus::ChallengeWindow
            && self
                .challenge_window
                .as_ref()
                .is_some_and(|w| w.challenged_by.is_none() && now >= w.closes_at)
    }

    /// Number of rounds this application has opened so far.
    pub fn round_count(&self) -> u32 {
        self.current_round - self.first_round + 1
    }
}
