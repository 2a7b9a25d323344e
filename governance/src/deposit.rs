//! Voter deposits and their settlement.
//!
//! Settlement outcomes:
//! - Quorum failure: every deposit is refunded in full.
//! - Winning side: stake returned, plus (under `Redistribute`) a pro-rata
//!   share of the losing side's stake.
//! - Losing side: stake forfeited. Under `Redistribute` it stays in escrow to
//!   fund the winners' shares; under `Treasury` it moves to the treasury.

use crate::error::GovernanceError;
use crate::round::Round;
use curation_types::{Address, Amount, ForfeitPolicy};
use serde::{Deserialize, Serialize};

/// A voter's stake in one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub subject: Address,
    pub voter: Address,
    pub round: u32,
    pub amount: Amount,
    pub approve: bool,
    pub claimed: bool,
    /// Number of vote calls that funded this deposit.
    pub top_ups: u32,
    /// What settlement paid out, once claimed.
    pub payout: Option<Amount>,
}

impl Deposit {
    pub(crate) fn new(subject: &Address, voter: &Address, round: u32, approve: bool) -> Self {
        Self {
            subject: subject.clone(),
            voter: voter.clone(),
            round,
            amount: Amount::ZERO,
            approve,
            claimed: false,
            top_ups: 0,
            payout: None,
        }
    }
}

/// The ledger movement a settlement requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    /// Pay `amount` out of escrow to the voter.
    Release(Amount),
    /// Move `amount` from escrow to the treasury.
    Forfeit(Amount),
    /// Nothing moves.
    None,
}

/// How one deposit settles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    /// Amount the voter receives.
    pub payout: Amount,
    pub transfer: Transfer,
}

/// Computes settlements for finalized rounds.
pub struct DepositLedger {
    policy: ForfeitPolicy,
}

impl DepositLedger {
    pub fn new(policy: ForfeitPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ForfeitPolicy {
        self.policy
    }

    /// Decide what `deposit` is owed from `round`.
    pub fn settlement(
        &self,
        deposit: &Deposit,
        round: &Round,
    ) -> Result<Settlement, GovernanceError> {
        if !round.finalized {
            return Err(GovernanceError::RoundNotFinalized { round: round.index });
        }
        if deposit.claimed {
            return Err(GovernanceError::AlreadyClaimed {
                voter: deposit.voter.to_string(),
                round: deposit.round,
            });
        }

        let winning_side = round.outcome.and_then(|o| o.winning_side());
        let settlement = match winning_side {
            None => Settlement {
                payout: deposit.amount,
                transfer: Transfer::Release(deposit.amount),
            },
            Some(side) if side == deposit.approve => {
                let payout = match self.policy {
                    ForfeitPolicy::Redistribute => {
                        let winning = round.side_stake(side);
                        let losing = round.side_stake(!side);
                        let share = deposit
                            .amount
                            .mul_div(losing, winning)
                            .ok_or(GovernanceError::Overflow)?;
                        deposit
                            .amount
                            .checked_add(share)
                            .ok_or(GovernanceError::Overflow)?
                    }
                    ForfeitPolicy::Treasury => deposit.amount,
                };
                Settlement {
                    payout,
                    transfer: Transfer::Release(payout),
                }
            }
            Some(_) => Settlement {
                payout: Amount::ZERO,
                transfer: match self.policy {
                    ForfeitPolicy::Redistribute => Transfer::None,
                    ForfeitPolicy::Treasury => Transfer::Forfeit(deposit.amount),
                },
            },
        };
        Ok(settlement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::RoundOutcome;
    use curation_types::Timestamp;

    fn addr(seed: u8) -> Address {
        Address::from_bytes([seed; 20])
    }

    fn finalized_round(approve: u128, reject: u128, outcome: RoundOutcome) -> Round {
        Round {
            subject: addr(1),
            index: 0,
            approval_stake: Amount::new(approve),
            rejection_stake: Amount::new(reject),
            start_time: Timestamp::new(0),
            end_time: Timestamp::new(10),
            is_challenge: false,
            finalized: true,
            outcome: Some(outcome),
        }
    }

    fn deposit(amount: u128, approve: bool) -> Deposit {
        Deposit {
            amount: Amount::new(amount),
            top_ups: 1,
            ..Deposit::new(&addr(1), &addr(2), 0, approve)
        }
    }

    #[test]
    fn winners_split_losing_stake_pro_rata() {
        let ledger = DepositLedger::new(ForfeitPolicy::Redistribute);
        let round = finalized_round(300, 150, RoundOutcome::Approved);

        let big = ledger.settlement(&deposit(200, true), &round).unwrap();
        let small = ledger.settlement(&deposit(100, true), &round).unwrap();
        assert_eq!(big.payout, Amount::new(300));
        assert_eq!(small.payout, Amount::new(150));
        assert_eq!(big.payout + small.payout, Amount::new(450));
    }

    #[test]
    fn losers_get_nothing() {
        let round = finalized_round(300, 150, RoundOutcome::Approved);

        let redistributed = DepositLedger::new(ForfeitPolicy::Redistribute)
            .settlement(&deposit(150, false), &round)
            .unwrap();
        assert_eq!(redistributed.payout, Amount::ZERO);
        assert_eq!(redistributed.transfer, Transfer::None);

        let treasury = DepositLedger::new(ForfeitPolicy::Treasury)
            .settlement(&deposit(150, false), &round)
            .unwrap();
        assert_eq!(treasury.payout, Amount::ZERO);
        assert_eq!(treasury.transfer, Transfer::Forfeit(Amount::new(150)));
    }

    #[test]
    fn treasury_policy_returns_only_own_stake() {
        let round = finalized_round(300, 150, RoundOutcome::Approved);
        let s = DepositLedger::new(ForfeitPolicy::Treasury)
            .settlement(&deposit(300, true), &round)
            .unwrap();
        assert_eq!(s.payout, Amount::new(300));
        assert_eq!(s.transfer, Transfer::Release(Amount::new(300)));
    }

    #[test]
    fn quorum_failure_refunds_everyone() {
        let ledger = DepositLedger::new(ForfeitPolicy::Redistribute);
        let round = finalized_round(30, 10, RoundOutcome::NoQuorum);
        for (amount, approve) in [(30, true), (10, false)] {
            let s = ledger.settlement(&deposit(amount, approve), &round).unwrap();
            assert_eq!(s.payout, Amount::new(amount));
        }
    }

    #[test]
    fn tie_pays_rejecters() {
        let ledger = DepositLedger::new(ForfeitPolicy::Redistribute);
        let round = finalized_round(100, 100, RoundOutcome::Rejected);
        let s = ledger.settlement(&deposit(100, false), &round).unwrap();
        assert_eq!(s.payout, Amount::new(200));
    }

    #[test]
    fn large_stakes_do_not_overflow() {
        let ledger = DepositLedger::new(ForfeitPolicy::Redistribute);
        let round = finalized_round(
            Amount::tokens(5_000_000).raw(),
            Amount::tokens(3_000_000).raw(),
            RoundOutcome::Approved,
        );
        let s = ledger
            .settlement(&deposit(Amount::tokens(5_000_000).raw(), true), &round)
            .unwrap();
        assert_eq!(s.payout, Amount::tokens(8_000_000));
    }

    #[test]
    fn unfinalized_and_claimed_are_refused() {
        let ledger = DepositLedger::new(ForfeitPolicy::Redistribute);
        let mut round = finalized_round(100, 0, RoundOutcome::Approved);
        let mut d = deposit(100, true);

        d.claimed = true;
        assert!(matches!(
            ledger.settlement(&d, &round),
            Err(GovernanceError::AlreadyClaimed { .. })
        ));

        round.finalized = false;
        assert!(matches!(
            ledger.settlement(&d, &round),
            Err(GovernanceError::RoundNotFinalized { .. })
        ));
    }
}
