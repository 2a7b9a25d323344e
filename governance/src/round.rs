//! Voting rounds — stake-weighted tallies with a quorum rule.
//!
//! Every application runs one round at a time: the initial round, then one
//! per challenge. A round is open while `now < end_time`; once it has ended
//! anyone may finalize it.

use crate::application::{Application, ApplicationStatus, ChallengeWindow};
use crate::deposit::Deposit;
use crate::error::GovernanceError;
use curation_types::{Address, Amount, GovernanceParams, Timestamp};
use serde::{Deserialize, Serialize};

/// How a finalized round ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// Quorum met and approval stake strictly above rejection stake.
    Approved,
    /// Quorum met and rejection stake at least equal to approval stake.
    Rejected,
    /// Total stake below quorum. The application is rejected but nobody
    /// loses their stake.
    NoQuorum,
}

impl RoundOutcome {
    /// Whether the round's result was carried by stake (as opposed to a
    /// quorum failure).
    pub fn is_decisive(self) -> bool {
        self != Self::NoQuorum
    }

    /// The side whose deposits won, if any.
    pub fn winning_side(self) -> Option<bool> {
        match self {
            Self::Approved => Some(true),
            Self::Rejected => Some(false),
            Self::NoQuorum => None,
        }
    }
}

/// One bounded voting period of an application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub subject: Address,
    pub index: u32,
    pub approval_stake: Amount,
    pub rejection_stake: Amount,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub is_challenge: bool,
    pub finalized: bool,
    pub outcome: Option<RoundOutcome>,
}

impl Round {
    pub fn is_open(&self, now: Timestamp) -> bool {
        !self.finalized && now < self.end_time
    }

    pub fn total_stake(&self) -> Amount {
        self.approval_stake.saturating_add(self.rejection_stake)
    }

    /// Stake on one side of the round.
    pub fn side_stake(&self, approve: bool) -> Amount {
        if approve {
            self.approval_stake
        } else {
            self.rejection_stake
        }
    }

    /// Apply the quorum and majority rule to the current totals.
    ///
    /// A total of exactly `min_quorum` is decisive. Ties reject.
    pub fn tally(&self, min_quorum: Amount) -> RoundOutcome {
        if self.total_stake() < min_quorum {
            RoundOutcome::NoQuorum
        } else if self.approval_stake > self.rejection_stake {
            RoundOutcome::Approved
        } else {
            RoundOutcome::Rejected
        }
    }
}

/// Result of a vote, before it is committed.
#[derive(Clone, Debug)]
pub struct VoteEffect {
    /// The voter's deposit after the vote.
    pub deposit: Deposit,
    /// Which top-up of this deposit the vote was (0 for the first stake).
    pub top_up: u32,
}

/// Result of finalizing a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeOutcome {
    pub round: u32,
    /// `Approved` or `Rejected`: what the round decided for the application.
    pub status: ApplicationStatus,
    pub approval_stake: Amount,
    pub rejection_stake: Amount,
    pub decisive: bool,
}

/// Opens, votes on and finalizes rounds.
pub struct RoundEngine {
    params: GovernanceParams,
}

impl RoundEngine {
    pub fn new(params: GovernanceParams) -> Self {
        Self { params }
    }

    /// Create the initial round of an application.
    pub fn open_initial(&self, subject: &Address, index: u32, now: Timestamp) -> Round {
        self.open(subject, index, now, self.params.initial_voting_period_secs, false)
    }

    /// Create a challenge round.
    pub fn open_challenge(&self, subject: &Address, index: u32, now: Timestamp) -> Round {
        self.open(
            subject,
            index,
            now,
            self.params.challenge_voting_period_secs,
            true,
        )
    }

    fn open(
        &self,
        subject: &Address,
        index: u32,
        now: Timestamp,
        duration_secs: u64,
        is_challenge: bool,
    ) -> Round {
        Round {
            subject: subject.clone(),
            index,
            approval_stake: Amount::ZERO,
            rejection_stake: Amount::ZERO,
            start_time: now,
            end_time: now.plus(duration_secs),
            is_challenge,
            finalized: false,
            outcome: None,
        }
    }

    /// Record a stake on the application's current round.
    ///
    /// Stakes by the same voter within a round add up; switching direction
    /// mid-round is refused.
    #[allow(clippy::too_many_arguments)]
    pub fn record_vote(
        &self,
        app: &mut Application,
        round: &mut Round,
        existing: Option<Deposit>,
        voter: &Address,
        approve: bool,
        amount: Amount,
        now: Timestamp,
    ) -> Result<VoteEffect, GovernanceError> {
        if !app.status.accepts_votes() || !round.is_open(now) {
            return Err(GovernanceError::NotVoting {
                current: app.status,
            });
        }
        if amount < self.params.min_deposit {
            return Err(GovernanceError::BelowMinDeposit {
                required: self.params.min_deposit,
                provided: amount,
            });
        }

        let mut deposit = match existing {
            Some(d) if d.approve != approve => {
                return Err(GovernanceError::DirectionLocked {
                    round: round.index,
                    approve: d.approve,
                });
            }
            Some(d) => d,
            None => Deposit::new(&app.subject, voter, round.index, approve),
        };
        let top_up = deposit.top_ups;
        deposit.amount = deposit
            .amount
            .checked_add(amount)
            .ok_or(GovernanceError::Overflow)?;
        deposit.top_ups += 1;

        if approve {
            round.approval_stake = round
                .approval_stake
                .checked_add(amount)
                .ok_or(GovernanceError::Overflow)?;
            app.cumulative_approval = app.cumulative_approval.saturating_add(amount);
        } else {
            round.rejection_stake = round
                .rejection_stake
                .checked_add(amount)
                .ok_or(GovernanceError::Overflow)?;
            app.cumulative_rejection = app.cumulative_rejection.saturating_add(amount);
        }

        Ok(VoteEffect { deposit, top_up })
    }

    /// Close the current round and move the application accordingly.
    ///
    /// An approval opens a fresh challenge window; anything else rejects.
    pub fn finalize(
        &self,
        app: &mut Application,
        round: &mut Round,
        now: Timestamp,
    ) -> Result<FinalizeOutcome, GovernanceError> {
        if round.finalized {
            return Err(GovernanceError::AlreadyFinalized {
                round: round.index,
                current: app.status,
            });
        }
        if now < round.end_time {
            return Err(GovernanceError::RoundNotEnded {
                round: round.index,
                ends_at: round.end_time,
                now,
            });
        }

        let outcome = round.tally(self.params.min_quorum);
        round.finalized = true;
        round.outcome = Some(outcome);

        let status = match outcome {
            RoundOutcome::Approved => {
                app.transition(ApplicationStatus::Approved)?;
                app.transition(ApplicationStatus::ChallengeWindow)?;
                app.challenge_window = Some(ChallengeWindow {
                    opened_at: now,
                    closes_at: now.plus(self.params.challenge_window_secs),
                    challenged_by: None,
                });
                ApplicationStatus::Approved
            }
            RoundOutcome::Rejected | RoundOutcome::NoQuorum => {
                app.transition(ApplicationStatus::Rejected)?;
                app.challenge_window = None;
                ApplicationStatus::Rejected
            }
        };

        Ok(FinalizeOutcome {
            round: round.index,
            status,
            approval_stake: round.approval_stake,
            rejection_stake: round.rejection_stake,
            decisive: outcome.is_decisive(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn addr(seed: u8) -> Address {
        Address::from_bytes([seed; 20])
    }

    fn params() -> GovernanceParams {
        GovernanceParams {
            min_quorum: Amount::new(100),
            min_deposit: Amount::new(10),
            ..GovernanceParams::testnet_defaults()
        }
    }

    fn voting_app() -> Application {
        Application {
            applicant: addr(1),
            subject: addr(2),
            subject_kind: curation_types::SubjectKind::Factory,
            sequence: 0,
            title: "factory".into(),
            display_title: "Factory".into(),
            metadata_uri: "ipfs://factory".into(),
            features: BTreeSet::new(),
            status: ApplicationStatus::Voting,
            submitted_at: Timestamp::new(0),
            first_round: 0,
            current_round: 0,
            cumulative_approval: Amount::ZERO,
            cumulative_rejection: Amount::ZERO,
            challenge_window: None,
            registry_synced: false,
        }
    }

    fn round_with(approve: u128, reject: u128) -> Round {
        let mut round = RoundEngine::new(params()).open_initial(&addr(2), 0, Timestamp::new(0));
        round.approval_stake = Amount::new(approve);
        round.rejection_stake = Amount::new(reject);
        round
    }

    #[test]
    fn quorum_boundary_is_decisive() {
        assert_eq!(round_with(60, 40).tally(Amount::new(100)), RoundOutcome::Approved);
        assert_eq!(round_with(60, 39).tally(Amount::new(100)), RoundOutcome::NoQuorum);
    }

    #[test]
    fn ties_reject() {
        assert_eq!(round_with(50, 50).tally(Amount::new(100)), RoundOutcome::Rejected);
    }

    #[test]
    fn empty_round_has_no_quorum() {
        assert_eq!(round_with(0, 0).tally(Amount::new(1)), RoundOutcome::NoQuorum);
    }

    #[test]
    fn end_time_after_start_time() {
        let engine = RoundEngine::new(params());
        let round = engine.open_challenge(&addr(2), 3, Timestamp::new(500));
        assert!(round.end_time > round.start_time);
        assert!(round.is_challenge);
        assert_eq!(round.index, 3);
    }

    #[test]
    fn stakes_accumulate_per_voter() {
        let engine = RoundEngine::new(params());
        let mut app = voting_app();
        let mut round = engine.open_initial(&app.subject, 0, Timestamp::new(0));
        let voter = addr(9);

        let first = engine
            .record_vote(&mut app, &mut round, None, &voter, true, Amount::new(10), Timestamp::new(1))
            .unwrap();
        assert_eq!(first.top_up, 0);
        let second = engine
            .record_vote(
                &mut app,
                &mut round,
                Some(first.deposit),
                &voter,
                true,
                Amount::new(15),
                Timestamp::new(2),
            )
            .unwrap();
        assert_eq!(second.top_up, 1);
        assert_eq!(second.deposit.amount, Amount::new(25));
        assert_eq!(round.approval_stake, Amount::new(25));
        assert_eq!(app.cumulative_approval, Amount::new(25));
    }

    #[test]
    fn direction_change_is_locked() {
        let engine = RoundEngine::new(params());
        let mut app = voting_app();
        let mut round = engine.open_initial(&app.subject, 0, Timestamp::new(0));
        let voter = addr(9);
        let first = engine
            .record_vote(&mut app, &mut round, None, &voter, true, Amount::new(10), Timestamp::new(1))
            .unwrap();

        let err = engine
            .record_vote(
                &mut app,
                &mut round,
                Some(first.deposit),
                &voter,
                false,
                Amount::new(10),
                Timestamp::new(2),
            )
            .unwrap_err();
        assert!(matches!(err, GovernanceError::DirectionLocked { approve: true, .. }));
        assert_eq!(round.rejection_stake, Amount::ZERO);
    }

    #[test]
    fn votes_after_end_are_refused() {
        let engine = RoundEngine::new(params());
        let mut app = voting_app();
        let mut round = engine.open_initial(&app.subject, 0, Timestamp::new(0));
        let end = round.end_time;
        let err = engine
            .record_vote(&mut app, &mut round, None, &addr(9), true, Amount::new(10), end)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::NotVoting { .. }));
    }

    #[test]
    fn finalize_before_end_is_refused() {
        let engine = RoundEngine::new(params());
        let mut app = voting_app();
        let mut round = engine.open_initial(&app.subject, 0, Timestamp::new(0));
        let err = engine
            .finalize(&mut app, &mut round, Timestamp::new(1))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::RoundNotEnded { .. }));
        assert!(!round.finalized);
        assert_eq!(app.status, ApplicationStatus::Voting);
    }

    #[test]
    fn approval_opens_challenge_window() {
        let engine = RoundEngine::new(params());
        let mut app = voting_app();
        let mut round = round_with(80, 20);
        let end = round.end_time;
        let outcome = engine.finalize(&mut app, &mut round, end).unwrap();

        assert_eq!(outcome.status, ApplicationStatus::Approved);
        assert!(outcome.decisive);
        assert_eq!(app.status, ApplicationStatus::ChallengeWindow);
        let window = app.challenge_window.unwrap();
        assert_eq!(window.opened_at, end);
        assert_eq!(window.closes_at, end.plus(params().challenge_window_secs));

        let again = engine.finalize(&mut voting_app(), &mut round, end).unwrap_err();
        assert!(matches!(again, GovernanceError::AlreadyFinalized { .. }));
    }
}
