//! Challenge windows — anyone may force a second vote on an approval.
//!
//! Window expiry is evaluated lazily: there is no timer, the engine calls
//! [`ChallengeController::expire_if_elapsed`] whenever it touches an
//! application.

use crate::application::{Application, ApplicationStatus};
use crate::error::GovernanceError;
use crate::round::{Round, RoundEngine};
use curation_types::{Address, Timestamp};

pub struct ChallengeController;

impl ChallengeController {
    /// Challenge an approved application inside its window.
    ///
    /// Returns the challenge round to persist alongside the application.
    pub fn initiate(
        &self,
        rounds: &RoundEngine,
        app: &mut Application,
        challenger: &Address,
        now: Timestamp,
    ) -> Result<Round, GovernanceError> {
        match app.status {
            ApplicationStatus::ChallengeWindow => {}
            ApplicationStatus::ChallengeVoting => {
                if let Some(by) = app
                    .challenge_window
                    .as_ref()
                    .and_then(|w| w.challenged_by.as_ref())
                {
                    return Err(GovernanceError::AlreadyChallenged {
                        challenger: by.to_string(),
                    });
                }
                return Err(GovernanceError::NotInWindow {
                    current: app.status,
                });
            }
            current => return Err(GovernanceError::NotInWindow { current }),
        }

        let not_in_window = GovernanceError::NotInWindow {
            current: app.status,
        };
        let window = app.challenge_window.as_mut().ok_or(not_in_window)?;
        if let Some(by) = &window.challenged_by {
            return Err(GovernanceError::AlreadyChallenged {
                challenger: by.to_string(),
            });
        }
        if now >= window.closes_at {
            return Err(GovernanceError::NotInWindow {
                current: app.status,
            });
        }
        window.challenged_by = Some(challenger.clone());

        let index = app.current_round + 1;
        let round = rounds.open_challenge(&app.subject, index, now);
        app.transition(ApplicationStatus::ChallengeVoting)?;
        app.current_round = index;
        Ok(round)
    }

    /// Register the application if its window elapsed unchallenged.
    ///
    /// Returns whether the application changed.
    pub fn expire_if_elapsed(
        &self,
        app: &mut Application,
        now: Timestamp,
    ) -> Result<bool, GovernanceError> {
        if !app.window_elapsed(now) {
            return Ok(false);
        }
        app.transition(ApplicationStatus::Registered)?;
        app.registry_synced = false;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ChallengeWindow;
    use curation_types::{Amount, GovernanceParams, SubjectKind};
    use std::collections::BTreeSet;

    fn addr(seed: u8) -> Address {
        Address::from_bytes([seed; 20])
    }

    fn windowed_app(closes_at: u64) -> Application {
        Application {
            applicant: addr(1),
            subject: addr(2),
            subject_kind: SubjectKind::Vault,
            sequence: 0,
            title: "vault".into(),
            display_title: "Vault".into(),
            metadata_uri: "ipfs://vault".into(),
            features: BTreeSet::new(),
            status: ApplicationStatus::ChallengeWindow,
            submitted_at: Timestamp::new(0),
            first_round: 0,
            current_round: 0,
            cumulative_approval: Amount::ZERO,
            cumulative_rejection: Amount::ZERO,
            challenge_window: Some(ChallengeWindow {
                opened_at: Timestamp::new(0),
                closes_at: Timestamp::new(closes_at),
                challenged_by: None,
            }),
            registry_synced: false,
        }
    }

    #[test]
    fn challenge_opens_next_round() {
        let rounds = RoundEngine::new(GovernanceParams::testnet_defaults());
        let mut app = windowed_app(100);
        let round = ChallengeController
            .initiate(&rounds, &mut app, &addr(7), Timestamp::new(50))
            .unwrap();

        assert_eq!(round.index, 1);
        assert!(round.is_challenge);
        assert_eq!(app.current_round, 1);
        assert_eq!(app.status, ApplicationStatus::ChallengeVoting);
        assert_eq!(
            round.end_time,
            Timestamp::new(50 + GovernanceParams::testnet_defaults().challenge_voting_period_secs)
        );
    }

    #[test]
    fn second_challenge_in_same_window_is_refused() {
        let rounds = RoundEngine::new(GovernanceParams::testnet_defaults());
        let mut app = windowed_app(100);
        ChallengeController
            .initiate(&rounds, &mut app, &addr(7), Timestamp::new(50))
            .unwrap();
        let err = ChallengeController
            .initiate(&rounds, &mut app, &addr(8), Timestamp::new(51))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::AlreadyChallenged { .. }));
    }

    #[test]
    fn challenge_after_close_is_refused() {
        let rounds = RoundEngine::new(GovernanceParams::testnet_defaults());
        let mut app = windowed_app(100);
        let err = ChallengeController
            .initiate(&rounds, &mut app, &addr(7), Timestamp::new(100))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::NotInWindow { .. }));
        assert_eq!(app.status, ApplicationStatus::ChallengeWindow);
    }

    #[test]
    fn expiry_registers_once() {
        let mut app = windowed_app(100);
        assert!(!ChallengeController
            .expire_if_elapsed(&mut app, Timestamp::new(99))
            .unwrap());
        assert!(ChallengeController
            .expire_if_elapsed(&mut app, Timestamp::new(100))
            .unwrap());
        assert_eq!(app.status, ApplicationStatus::Registered);
        assert!(!ChallengeController
            .expire_if_elapsed(&mut app, Timestamp::new(200))
            .unwrap());
    }
}
