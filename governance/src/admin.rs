//! Administrative controls — lame duck mode.
//!
//! Entering lame duck stops new business (submissions, votes, challenges)
//! immediately. Rounds already in flight can still be finalized and their
//! deposits settled until `freezes_at`; after that the engine only serves
//! reads.

use crate::error::GovernanceError;
use curation_types::{Address, Identity, Role, Timestamp};
use serde::{Deserialize, Serialize};

/// Persisted lame duck state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LameDuck {
    pub entered_at: Timestamp,
    pub freezes_at: Timestamp,
    pub entered_by: Address,
}

impl LameDuck {
    pub fn is_frozen(&self, now: Timestamp) -> bool {
        now >= self.freezes_at
    }
}

/// Gate checks against the current lame duck state.
pub struct AdminControls {
    period_secs: u64,
}

impl AdminControls {
    pub fn new(period_secs: u64) -> Self {
        Self { period_secs }
    }

    /// Build the lame duck state `caller` would enter at `now`.
    pub fn enter(
        &self,
        current: Option<&LameDuck>,
        caller: &Identity,
        now: Timestamp,
    ) -> Result<LameDuck, GovernanceError> {
        if !caller.has_role(Role::Admin) {
            return Err(GovernanceError::Unauthorized);
        }
        if current.is_some() {
            return Err(GovernanceError::LameDuckActive);
        }
        Ok(LameDuck {
            entered_at: now,
            freezes_at: now.plus(self.period_secs),
            entered_by: caller.address.clone(),
        })
    }

    /// Submissions, votes and challenges.
    pub fn check_new_business(&self, current: Option<&LameDuck>) -> Result<(), GovernanceError> {
        match current {
            Some(_) => Err(GovernanceError::LameDuckActive),
            None => Ok(()),
        }
    }

    /// Finalization and settlement.
    pub fn check_wind_down(
        &self,
        current: Option<&LameDuck>,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        match current {
            Some(state) if state.is_frozen(now) => Err(GovernanceError::EngineFrozen),
            _ => Ok(()),
        }
    }
}
