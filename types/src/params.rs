//! Governance parameters — fees, stake thresholds and phase durations.
//!
//! The protocol constants are surfaced read-only through [`GovernanceParams`].
//! Deployments may override them from configuration; the engine never changes
//! them at runtime.

use crate::amount::Amount;
use crate::error::CurationError;
use serde::{Deserialize, Serialize};

/// Fee charged for every application submission.
pub const APPLICATION_FEE: Amount = Amount::tokens(100);
/// Minimum combined stake for a round to be decisive.
pub const MIN_QUORUM: Amount = Amount::tokens(1_000);
/// Minimum stake per vote call.
pub const MIN_DEPOSIT: Amount = Amount::tokens(10);
/// Duration of the initial voting round.
pub const INITIAL_VOTING_PERIOD: u64 = 7 * 24 * 3600;
/// Grace period after an approval during which anyone may challenge.
pub const CHALLENGE_WINDOW: u64 = 3 * 24 * 3600;
/// Duration of a challenge voting round.
pub const CHALLENGE_VOTING_PERIOD: u64 = 5 * 24 * 3600;
/// How long in-flight rounds may still be finalized and settled after lame
/// duck mode is entered.
pub const LAME_DUCK_PERIOD: u64 = 14 * 24 * 3600;

/// Longest accepted governance message body, in bytes.
pub const MAX_MESSAGE_LEN: usize = 4096;
/// Largest page returned by a single message log query.
pub const MAX_MESSAGE_PAGE: u64 = 1000;

/// Where a losing voter's stake goes on settlement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForfeitPolicy {
    /// Split pro-rata among the winning side's deposits.
    #[default]
    Redistribute,
    /// Sent to the treasury; winners only get their own deposit back.
    Treasury,
}

/// All governance parameters the engine runs with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceParams {
    /// Fee (raw) required to submit an application.
    pub application_fee: Amount,

    /// Minimum combined approval + rejection stake (raw) for a decisive round.
    pub min_quorum: Amount,

    /// Minimum stake (raw) per vote call.
    pub min_deposit: Amount,

    /// Duration of the initial voting round in seconds.
    pub initial_voting_period_secs: u64,

    /// Duration of the challenge window in seconds.
    pub challenge_window_secs: u64,

    /// Duration of a challenge voting round in seconds.
    pub challenge_voting_period_secs: u64,

    /// Grace period (seconds) for finalize/settle after lame duck is entered.
    pub lame_duck_period_secs: u64,

    /// Destination of forfeited stakes.
    pub forfeit_policy: ForfeitPolicy,
}

impl GovernanceParams {
    /// The production constants.
    pub fn mainnet_defaults() -> Self {
        Self {
            application_fee: APPLICATION_FEE,
            min_quorum: MIN_QUORUM,
            min_deposit: MIN_DEPOSIT,
            initial_voting_period_secs: INITIAL_VOTING_PERIOD,
            challenge_window_secs: CHALLENGE_WINDOW,
            challenge_voting_period_secs: CHALLENGE_VOTING_PERIOD,
            lame_duck_period_secs: LAME_DUCK_PERIOD,
            forfeit_policy: ForfeitPolicy::Redistribute,
        }
    }

    /// Same thresholds with minutes instead of days, for test deployments.
    pub fn testnet_defaults() -> Self {
        Self {
            initial_voting_period_secs: 10 * 60,
            challenge_window_secs: 5 * 60,
            challenge_voting_period_secs: 10 * 60,
            lame_duck_period_secs: 30 * 60,
            ..Self::mainnet_defaults()
        }
    }

    /// Reject parameter sets the state machine cannot run with.
    pub fn validate(&self) -> Result<(), CurationError> {
        if self.min_deposit.is_zero() {
            return Err(CurationError::InvalidParams(
                "min_deposit must be positive".to_string(),
            ));
        }
        if self.min_quorum < self.min_deposit {
            return Err(CurationError::InvalidParams(format!(
                "min_quorum {} is below min_deposit {}",
                self.min_quorum, self.min_deposit
            )));
        }
        let periods = [
            ("initial_voting_period_secs", self.initial_voting_period_secs),
            ("challenge_window_secs", self.challenge_window_secs),
            (
                "challenge_voting_period_secs",
                self.challenge_voting_period_secs,
            ),
        ];
        for (name, secs) in periods {
            if secs == 0 {
                return Err(CurationError::InvalidParams(format!(
                    "{name} must be positive"
                )));
            }
        }
        Ok(())
    }
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self::mainnet_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        GovernanceParams::mainnet_defaults().validate().unwrap();
        GovernanceParams::testnet_defaults().validate().unwrap();
    }

    #[test]
    fn zero_period_is_rejected() {
        let params = GovernanceParams {
            challenge_window_secs: 0,
            ..GovernanceParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn quorum_below_deposit_is_rejected() {
        let params = GovernanceParams {
            min_quorum: Amount::new(1),
            ..GovernanceParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let params: GovernanceParams = toml::from_str(
            r#"
                min_deposit = 5
                forfeit_policy = "treasury"
            "#,
        )
        .unwrap();
        assert_eq!(params.min_deposit, Amount::new(5));
        assert_eq!(params.forfeit_policy, ForfeitPolicy::Treasury);
        assert_eq!(params.min_quorum, MIN_QUORUM);
    }
}
