//! The ledger capability: fee collection, deposit escrow and payouts.
//!
//! The engine never moves money implicitly. Every transfer is an explicit call
//! on a [`Ledger`] keyed by an [`EscrowRef`], so the payment backend can be
//! swapped without touching governance logic.

use crate::address::Address;
use crate::amount::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifies the governance event a ledger movement belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowRef {
    /// Application fee for the `sequence`-th submission of `subject`.
    ApplicationFee { subject: Address, sequence: u32 },
    /// One stake top-up of a voter in a round. `top_up` counts the voter's
    /// calls within that round, starting at 0.
    Stake {
        subject: Address,
        voter: Address,
        round: u32,
        top_up: u32,
    },
    /// Settlement of a voter's whole deposit in a round.
    Settlement {
        subject: Address,
        voter: Address,
        round: u32,
    },
}

impl fmt::Display for EscrowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApplicationFee { subject, sequence } => write!(f, "fee:{subject}#{sequence}"),
            Self::Stake {
                subject,
                voter,
                round,
                top_up,
            } => write!(f, "stake:{subject}/{round}/{voter}/{top_up}"),
            Self::Settlement {
                subject,
                voter,
                round,
            } => write!(f, "settle:{subject}/{round}/{voter}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },

    #[error("ledger rejected transfer {reference}: {reason}")]
    Rejected { reference: String, reason: String },

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Payment backend consumed by the engine.
///
/// `release` and `forfeit` must be idempotent per `reference`: a repeated
/// call with a reference the ledger has already executed succeeds without
/// moving funds again. Settlement relies on this to stay exactly-once across
/// crashes.
pub trait Ledger: Send + Sync {
    /// Take a non-refundable fee from `payer` into the treasury.
    fn collect_fee(
        &self,
        payer: &Address,
        amount: Amount,
        reference: &EscrowRef,
    ) -> Result<(), LedgerError>;

    /// Move `amount` from `from` into escrow.
    fn hold(&self, from: &Address, amount: Amount, reference: &EscrowRef)
        -> Result<(), LedgerError>;

    /// Pay `amount` out of escrow to `to`.
    fn release(&self, to: &Address, amount: Amount, reference: &EscrowRef)
        -> Result<(), LedgerError>;

    /// Move `amount` out of escrow into the treasury.
    fn forfeit(&self, amount: Amount, reference: &EscrowRef) -> Result<(), LedgerError>;

    /// Undo one `collect_fee` or `hold` made under `reference`, paying the
    /// debited amount back to `to`.
    ///
    /// Called when the commit the debit paid for failed. A retried operation
    /// debits the same reference again, so reversals are counted per debit,
    /// not per reference: each debit is reversed at most once, and a reversal
    /// with no unreversed debit left succeeds without moving funds.
    fn reverse(&self, to: &Address, amount: Amount, reference: &EscrowRef)
        -> Result<(), LedgerError>;
}
