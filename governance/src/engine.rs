//! The curation engine: the one entry point wiring storage, ledger, clock and
//! registry around the governance state machine.
//!
//! Every mutating operation on a subject runs under that subject's lock and
//! ends in exactly one store commit. Ledger calls happen after all checks
//! pass and right before the commit; if the commit fails the debit is undone
//! with `Ledger::reverse`.

use crate::admin::{AdminControls, LameDuck};
use crate::application::{Application, ApplicationId, ApplicationStatus, NewApplication};
use crate::challenge::ChallengeController;
use crate::deposit::{Deposit, DepositLedger, Transfer};
use crate::error::GovernanceError;
use crate::message::{GovernanceMessage, MessageKind, MessageLog};
use crate::registry::{ReconcileReport, RegistryBridge};
use crate::round::{FinalizeOutcome, Round, RoundEngine};
use crate::store::{acquire, ApplicationStore, Batch};
use curation_store::{CommitReceipt, GovernanceStore};
use curation_types::{
    Address, Amount, Clock, EscrowRef, GovernanceParams, Identity, Ledger, MasterRegistry,
    Timestamp,
};
use curation_utils::StatsCounter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

pub const STAT_APPLICATIONS_SUBMITTED: &str = "applications_submitted";
pub const STAT_VOTES_CAST: &str = "votes_cast";
pub const STAT_CHALLENGES_OPENED: &str = "challenges_opened";
pub const STAT_ROUNDS_FINALIZED: &str = "rounds_finalized";
pub const STAT_DEPOSITS_SETTLED: &str = "deposits_settled";
pub const STAT_REGISTRATIONS_DELIVERED: &str = "registrations_delivered";
pub const STAT_REGISTRATIONS_FAILED: &str = "registrations_failed";

const STATS: &[&str] = &[
    STAT_APPLICATIONS_SUBMITTED,
    STAT_VOTES_CAST,
    STAT_CHALLENGES_OPENED,
    STAT_ROUNDS_FINALIZED,
    STAT_DEPOSITS_SETTLED,
    STAT_REGISTRATIONS_DELIVERED,
    STAT_REGISTRATIONS_FAILED,
];

/// Acknowledgement of a vote or challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub application: ApplicationId,
    /// The round the operation acted on.
    pub round: u32,
    /// Id of the message the operation appended to the log.
    pub message_id: u64,
    pub at: Timestamp,
}

pub struct CurationEngine {
    store: ApplicationStore,
    ledger: Arc<dyn Ledger>,
    registry: RegistryBridge,
    clock: Arc<dyn Clock>,
    params: GovernanceParams,
    rounds: RoundEngine,
    deposits: DepositLedger,
    challenges: ChallengeController,
    admin: AdminControls,
    lame_duck: RwLock<Option<LameDuck>>,
    stats: StatsCounter,
}

impl CurationEngine {
    /// Build an engine over `store`, picking up any persisted lame duck state.
    pub fn new(
        store: Arc<dyn GovernanceStore>,
        ledger: Arc<dyn Ledger>,
        registry: Arc<dyn MasterRegistry>,
        clock: Arc<dyn Clock>,
        params: GovernanceParams,
    ) -> Result<Self, GovernanceError> {
        params.validate()?;
        let store = ApplicationStore::new(store);
        let lame_duck = store.lame_duck()?;
        Ok(Self {
            store,
            ledger,
            registry: RegistryBridge::new(registry),
            clock,
            rounds: RoundEngine::new(params.clone()),
            deposits: DepositLedger::new(params.forfeit_policy),
            challenges: ChallengeController,
            admin: AdminControls::new(params.lame_duck_period_secs),
            lame_duck: RwLock::new(lame_duck),
            stats: StatsCounter::new(STATS),
            params,
        })
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    /// Operation counters since the engine was built.
    pub fn stats(&self) -> BTreeMap<&'static str, u64> {
        self.stats.snapshot()
    }

    // ── Mutations ──────────────────────────────────────────────────────

    /// Submit a subject for admission and open its first voting round.
    pub fn submit_application(
        &self,
        caller: &Identity,
        new: NewApplication,
    ) -> Result<ApplicationId, GovernanceError> {
        if new.title.trim().is_empty() {
            return Err(GovernanceError::MissingField("title"));
        }
        if new.display_title.trim().is_empty() {
            return Err(GovernanceError::MissingField("display_title"));
        }
        if new.metadata_uri.trim().is_empty() {
            return Err(GovernanceError::MissingField("metadata_uri"));
        }
        MessageLog::validate(&new.message)?;
        if new.fee < self.params.application_fee {
            return Err(GovernanceError::InsufficientFee {
                required: self.params.application_fee,
                provided: new.fee,
            });
        }
        self.admin.check_new_business(self.lame_duck_state().as_ref())?;

        let lock = self.store.lock_handle(&new.subject);
        let _guard = acquire(&lock);
        let now = self.clock.now();

        let previous = match self.store.application(&new.subject)? {
            Some(app) => Some(self.refresh(app, now)?),
            None => None,
        };
        if let Some(app) = &previous {
            if app.status != ApplicationStatus::Rejected {
                return Err(GovernanceError::DuplicateSubject {
                    subject: new.subject.to_string(),
                    current: app.status,
                });
            }
        }
        let (sequence, first_round) = previous
            .as_ref()
            .map_or((0, 0), |app| (app.sequence + 1, app.current_round + 1));

        let mut app = Application {
            applicant: caller.address.clone(),
            subject: new.subject.clone(),
            subject_kind: new.subject_kind,
            sequence,
            title: new.title,
            display_title: new.display_title,
            metadata_uri: new.metadata_uri,
            features: new.features,
            status: ApplicationStatus::Submitted,
            submitted_at: now,
            first_round,
            current_round: first_round,
            cumulative_approval: Amount::ZERO,
            cumulative_rejection: Amount::ZERO,
            challenge_window: None,
            registry_synced: false,
        };
        let round = self.rounds.open_initial(&app.subject, first_round, now);
        app.transition(ApplicationStatus::Voting)?;

        let mut batch = Batch::new();
        if let Some(old) = &previous {
            batch.archive_application(old)?;
        }
        batch.put_application(&app)?;
        batch.put_round(&round)?;
        batch.append_message(&MessageLog::entry(
            &caller.address,
            &app.subject,
            &new.message,
            MessageKind::Application,
            now,
        ))?;

        let fee_ref = EscrowRef::ApplicationFee {
            subject: app.subject.clone(),
            sequence,
        };
        self.ledger.collect_fee(&caller.address, new.fee, &fee_ref)?;
        if let Err(e) = self.store.commit(batch) {
            self.compensate(&caller.address, new.fee, &fee_ref);
            return Err(e);
        }

        self.stats.increment(STAT_APPLICATIONS_SUBMITTED);
        tracing::info!(
            subject = %app.subject,
            kind = %app.subject_kind,
            sequence,
            round = first_round,
            ends_at = %round.end_time,
            "application submitted"
        );
        Ok(app.id())
    }

    /// Stake `amount` for or against the application's current round.
    pub fn vote(
        &self,
        subject: &Address,
        caller: &Identity,
        approve: bool,
        amount: Amount,
        message: &str,
    ) -> Result<Receipt, GovernanceError> {
        MessageLog::validate(message)?;
        self.admin.check_new_business(self.lame_duck_state().as_ref())?;

        let lock = self.store.lock_handle(subject);
        let _guard = acquire(&lock);
        let now = self.clock.now();

        let mut app = self.load_current(subject, now)?;
        let mut round = self.store.current_round(&app)?;
        let existing = self.store.deposit(subject, &caller.address, round.index)?;
        let effect = self.rounds.record_vote(
            &mut app,
            &mut round,
            existing,
            &caller.address,
            approve,
            amount,
            now,
        )?;

        let mut batch = Batch::new();
        batch.put_application(&app)?;
        batch.put_round(&round)?;
        batch.put_deposit(&effect.deposit)?;
        batch.append_message(&MessageLog::entry(
            &caller.address,
            subject,
            message,
            MessageKind::Vote,
            now,
        ))?;

        let stake_ref = EscrowRef::Stake {
            subject: subject.clone(),
            voter: caller.address.clone(),
            round: round.index,
            top_up: effect.top_up,
        };
        self.ledger.hold(&caller.address, amount, &stake_ref)?;
        let receipt = match self.store.commit(batch) {
            Ok(receipt) => receipt,
            Err(e) => {
                self.compensate(&caller.address, amount, &stake_ref);
                return Err(e);
            }
        };

        self.stats.increment(STAT_VOTES_CAST);
        tracing::info!(
            subject = %subject,
            voter = %caller.address,
            round = round.index,
            approve,
            amount = %amount,
            deposit = %effect.deposit.amount,
            "vote recorded"
        );
        Ok(self.receipt(&app, round.index, &receipt, now))
    }

    /// Challenge an approval inside its window, opening a challenge round.
    pub fn initiate_challenge(
        &self,
        subject: &Address,
        caller: &Identity,
        message: &str,
    ) -> Result<Receipt, GovernanceError> {
        MessageLog::validate(message)?;
        self.admin.check_new_business(self.lame_duck_state().as_ref())?;

        let lock = self.store.lock_handle(subject);
        let _guard = acquire(&lock);
        let now = self.clock.now();

        let mut app = self.load_current(subject, now)?;
        let round = self
            .challenges
            .initiate(&self.rounds, &mut app, &caller.address, now)?;

        let mut batch = Batch::new();
        batch.put_application(&app)?;
        batch.put_round(&round)?;
        batch.append_message(&MessageLog::entry(
            &caller.address,
            subject,
            message,
            MessageKind::Challenge,
            now,
        ))?;
        let receipt = self.store.commit(batch)?;

        self.stats.increment(STAT_CHALLENGES_OPENED);
        tracing::info!(
            subject = %subject,
            challenger = %caller.address,
            round = round.index,
            ends_at = %round.end_time,
            "challenge opened"
        );
        Ok(self.receipt(&app, round.index, &receipt, now))
    }

    /// Close the application's current round once its voting period ended.
    /// Permissionless.
    pub fn finalize_round(&self, subject: &Address) -> Result<FinalizeOutcome, GovernanceError> {
        let lock = self.store.lock_handle(subject);
        let _guard = acquire(&lock);
        let now = self.clock.now();
        self.admin
            .check_wind_down(self.lame_duck_state().as_ref(), now)?;

        let mut app = self.load_current(subject, now)?;
        let mut round = self.store.current_round(&app)?;
        let outcome = self.rounds.finalize(&mut app, &mut round, now)?;

        let mut batch = Batch::new();
        batch.put_application(&app)?;
        batch.put_round(&round)?;
        self.store.commit(batch)?;

        self.stats.increment(STAT_ROUNDS_FINALIZED);
        tracing::info!(
            subject = %subject,
            round = round.index,
            status = %outcome.status,
            decisive = outcome.decisive,
            approval = %outcome.approval_stake,
            rejection = %outcome.rejection_stake,
            "round finalized"
        );
        Ok(outcome)
    }

    /// Pay out a voter's deposit in a finalized round. Permissionless; funds
    /// always go to the voter.
    pub fn settle(
        &self,
        subject: &Address,
        round_index: u32,
        voter: &Address,
    ) -> Result<Amount, GovernanceError> {
        let lock = self.store.lock_handle(subject);
        let _guard = acquire(&lock);
        let now = self.clock.now();
        self.admin
            .check_wind_down(self.lame_duck_state().as_ref(), now)?;

        if let Some(app) = self.store.application(subject)? {
            self.refresh(app, now)?;
        }
        let round = self
            .store
            .round(subject, round_index)?
            .ok_or_else(|| GovernanceError::RoundNotFound {
                subject: subject.to_string(),
                round: round_index,
            })?;
        let mut deposit = self
            .store
            .deposit(subject, voter, round_index)?
            .ok_or_else(|| GovernanceError::DepositNotFound {
                subject: subject.to_string(),
                voter: voter.to_string(),
                round: round_index,
            })?;
        let settlement = self.deposits.settlement(&deposit, &round)?;

        let settle_ref = EscrowRef::Settlement {
            subject: subject.clone(),
            voter: voter.clone(),
            round: round_index,
        };
        match settlement.transfer {
            Transfer::Release(amount) if !amount.is_zero() => {
                self.ledger.release(voter, amount, &settle_ref)?
            }
            Transfer::Forfeit(amount) if !amount.is_zero() => {
                self.ledger.forfeit(amount, &settle_ref)?
            }
            _ => {}
        }

        deposit.claimed = true;
        deposit.payout = Some(settlement.payout);
        let mut batch = Batch::new();
        batch.put_deposit(&deposit)?;
        self.store.commit(batch)?;

        self.stats.increment(STAT_DEPOSITS_SETTLED);
        tracing::info!(
            subject = %subject,
            voter = %voter,
            round = round_index,
            stake = %deposit.amount,
            payout = %settlement.payout,
            "deposit settled"
        );
        Ok(settlement.payout)
    }

    /// Enter lame duck mode. Admin only, once.
    pub fn enter_lame_duck(&self, caller: &Identity) -> Result<LameDuck, GovernanceError> {
        let mut current = self
            .lame_duck
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        let state = self.admin.enter(current.as_ref(), caller, now)?;

        let mut batch = Batch::new();
        batch.put_lame_duck(&state)?;
        self.store.commit(batch)?;
        *current = Some(state.clone());

        tracing::warn!(
            admin = %caller.address,
            freezes_at = %state.freezes_at,
            "lame duck mode entered"
        );
        Ok(state)
    }

    /// Retry registry delivery for every registered application the master
    /// registry has not acknowledged, registering elapsed windows on the way.
    pub fn reconcile_registrations(&self) -> Result<ReconcileReport, GovernanceError> {
        let now = self.clock.now();
        let mut report = ReconcileReport::default();
        for candidate in self.store.applications()? {
            let pending = candidate.status == ApplicationStatus::Registered
                && !candidate.registry_synced;
            if !pending && !candidate.window_elapsed(now) {
                continue;
            }

            let lock = self.store.lock_handle(&candidate.subject);
            let _guard = acquire(&lock);
            let Some(mut app) = self.store.application(&candidate.subject)? else {
                continue;
            };
            if app.window_elapsed(now) {
                self.expire_window(&mut app, now)?;
            }
            if app.status != ApplicationStatus::Registered || app.registry_synced {
                continue;
            }
            report.attempted += 1;
            if self.deliver(&mut app, now) {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }
        if report.attempted > 0 {
            tracing::info!(
                attempted = report.attempted,
                delivered = report.delivered,
                failed = report.failed,
                "registry reconciliation finished"
            );
        }
        Ok(report)
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// The subject's current application, with any elapsed challenge window
    /// already resolved.
    pub fn get_application(&self, subject: &Address) -> Result<Application, GovernanceError> {
        let now = self.clock.now();
        let app = self
            .store
            .application(subject)?
            .ok_or_else(|| GovernanceError::ApplicationNotFound(subject.to_string()))?;
        if !app.window_elapsed(now) {
            return Ok(app);
        }
        let lock = self.store.lock_handle(subject);
        let _guard = acquire(&lock);
        self.load_current(subject, now)
    }

    /// A previous submission of the subject, superseded by a resubmission.
    pub fn get_archived_application(
        &self,
        subject: &Address,
        sequence: u32,
    ) -> Result<Application, GovernanceError> {
        self.store
            .archived_application(subject, sequence)?
            .ok_or_else(|| GovernanceError::ApplicationNotFound(format!("{subject}#{sequence}")))
    }

    /// Every current application, ordered by subject.
    pub fn list_applications(&self) -> Result<Vec<Application>, GovernanceError> {
        self.store.applications()
    }

    pub fn get_round(&self, subject: &Address, index: u32) -> Result<Round, GovernanceError> {
        self.store
            .round(subject, index)?
            .ok_or_else(|| GovernanceError::RoundNotFound {
                subject: subject.to_string(),
                round: index,
            })
    }

    pub fn get_deposit(
        &self,
        subject: &Address,
        voter: &Address,
        round: u32,
    ) -> Result<Deposit, GovernanceError> {
        self.store
            .deposit(subject, voter, round)?
            .ok_or_else(|| GovernanceError::DepositNotFound {
                subject: subject.to_string(),
                voter: voter.to_string(),
                round,
            })
    }

    pub fn get_round_deposits(
        &self,
        subject: &Address,
        round: u32,
    ) -> Result<Vec<Deposit>, GovernanceError> {
        self.store.round_deposits(subject, round)
    }

    /// Messages with `start <= id < end`, at most one page.
    pub fn get_messages(
        &self,
        start: u64,
        end: u64,
    ) -> Result<Vec<GovernanceMessage>, GovernanceError> {
        self.store.messages(start, end)
    }

    pub fn message_count(&self) -> Result<u64, GovernanceError> {
        self.store.message_count()
    }

    pub fn lame_duck_status(&self) -> Option<LameDuck> {
        self.lame_duck_state()
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn lame_duck_state(&self) -> Option<LameDuck> {
        self.lame_duck
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Load the subject's application and resolve an elapsed window.
    /// Caller holds the subject lock.
    fn load_current(&self, subject: &Address, now: Timestamp) -> Result<Application, GovernanceError> {
        let app = self
            .store
            .application(subject)?
            .ok_or_else(|| GovernanceError::ApplicationNotFound(subject.to_string()))?;
        self.refresh(app, now)
    }

    /// Caller holds the subject lock.
    fn refresh(&self, mut app: Application, now: Timestamp) -> Result<Application, GovernanceError> {
        if app.window_elapsed(now) {
            self.expire_window(&mut app, now)?;
            self.deliver(&mut app, now);
        }
        Ok(app)
    }

    /// Commit the move of an unchallenged approval to `Registered`.
    fn expire_window(&self, app: &mut Application, now: Timestamp) -> Result<(), GovernanceError> {
        let mut expired = app.clone();
        if !self.challenges.expire_if_elapsed(&mut expired, now)? {
            return Ok(());
        }
        let mut batch = Batch::new();
        batch.put_application(&expired)?;
        self.store.commit(batch)?;
        *app = expired;

        tracing::info!(
            subject = %app.subject,
            kind = %app.subject_kind,
            "challenge window closed unchallenged, application registered"
        );
        Ok(())
    }

    /// Hand a registered application to the master registry and record the
    /// acknowledgement. Failures are logged and left for reconciliation.
    fn deliver(&self, app: &mut Application, now: Timestamp) -> bool {
        let registered_at = app
            .challenge_window
            .as_ref()
            .map_or(now, |w| w.closes_at);
        if !self.registry.on_registered(app, registered_at) {
            self.stats.increment(STAT_REGISTRATIONS_FAILED);
            return false;
        }

        let mut synced = app.clone();
        synced.registry_synced = true;
        let mut batch = Batch::new();
        let result = batch
            .put_application(&synced)
            .and_then(|()| self.store.commit(batch));
        match result {
            Ok(_) => {
                *app = synced;
                self.stats.increment(STAT_REGISTRATIONS_DELIVERED);
                true
            }
            Err(e) => {
                tracing::warn!(
                    subject = %app.subject,
                    "registry acknowledged but sync flag not stored: {e}"
                );
                self.stats.increment(STAT_REGISTRATIONS_FAILED);
                false
            }
        }
    }

    /// Reverse a ledger debit whose commit failed.
    fn compensate(&self, to: &Address, amount: Amount, reference: &EscrowRef) {
        if let Err(e) = self.ledger.reverse(to, amount, reference) {
            tracing::error!(
                to = %to,
                amount = %amount,
                reference = %reference,
                "compensating reversal failed: {e}"
            );
        }
    }

    fn receipt(
        &self,
        app: &Application,
        round: u32,
        commit: &CommitReceipt,
        now: Timestamp,
    ) -> Receipt {
        Receipt {
            application: app.id(),
            round,
            message_id: commit.message_ids.first().copied().unwrap_or_default(),
            at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curation_nullables::{NullClock, NullLedger, NullRegistry, NullStore};

    fn engine() -> CurationEngine {
        CurationEngine::new(
            Arc::new(NullStore::new()),
            Arc::new(NullLedger::new()),
            Arc::new(NullRegistry::new()),
            Arc::new(NullClock::new(1_000)),
            GovernanceParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn unknown_subjects_leave_no_locks_behind() {
        let engine = engine();
        let caller = Identity::new(Address::from_bytes([99; 20]));
        for seed in 0..64 {
            let subject = Address::from_bytes([seed; 20]);
            assert!(matches!(
                engine.vote(&subject, &caller, true, Amount::new(10), ""),
                Err(GovernanceError::ApplicationNotFound(_))
            ));
            assert!(matches!(
                engine.finalize_round(&subject),
                Err(GovernanceError::ApplicationNotFound(_))
            ));
            assert!(matches!(
                engine.settle(&subject, 0, &caller.address),
                Err(GovernanceError::RoundNotFound { .. })
            ));
        }
        // Only the entry for the last subject may remain, and it is dead.
        assert!(engine.store.lock_table_len() <= 1);
    }
}
