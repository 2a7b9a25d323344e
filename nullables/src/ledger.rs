//! Nullable ledger — in-memory balances, escrow and treasury.

use curation_types::{Address, Amount, EscrowRef, Ledger, LedgerError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A ledger movement, as recorded by [`NullLedger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    FeeCollected { payer: Address, amount: Amount },
    Held { from: Address, amount: Amount },
    Released { to: Address, amount: Amount },
    Forfeited { amount: Amount },
    Reversed { to: Address, amount: Amount },
}

#[derive(Default)]
struct Books {
    balances: HashMap<Address, Amount>,
    escrow: Amount,
    treasury: Amount,
    /// References already released or forfeited.
    executed: HashSet<EscrowRef>,
    /// Fee and stake debits not yet reversed, per reference.
    debits: HashMap<EscrowRef, Vec<Amount>>,
    events: Vec<LedgerEvent>,
}

impl Books {
    fn debit(&mut self, from: &Address, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balances.get(from).copied().unwrap_or(Amount::ZERO);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                needed: amount,
                available,
            })?;
        self.balances.insert(from.clone(), remaining);
        Ok(())
    }

    fn record_debit(&mut self, reference: &EscrowRef, amount: Amount) {
        self.debits.entry(reference.clone()).or_default().push(amount);
    }

    fn credit(&mut self, to: &Address, amount: Amount) {
        let entry = self.balances.entry(to.clone()).or_insert(Amount::ZERO);
        *entry = entry.saturating_add(amount);
    }
}

/// A ledger for testing: funds are plain numbers, every movement is logged,
/// and the whole ledger can be switched offline.
///
/// Releases of fee references come out of the treasury (fee refunds); every
/// other release comes out of escrow.
#[derive(Default)]
pub struct NullLedger {
    books: Mutex<Books>,
    unavailable: AtomicBool,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `owner` spendable funds.
    pub fn fund(&self, owner: &Address, amount: Amount) {
        self.books.lock().unwrap().credit(owner, amount);
    }

    pub fn balance(&self, owner: &Address) -> Amount {
        self.books
            .lock()
            .unwrap()
            .balances
            .get(owner)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn escrow(&self) -> Amount {
        self.books.lock().unwrap().escrow
    }

    pub fn treasury(&self) -> Amount {
        self.books.lock().unwrap().treasury
    }

    pub fn events(&self) -> Vec<LedgerEvent> {
        self.books.lock().unwrap().events.clone()
    }

    /// Make every call fail with `LedgerError::Unavailable` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("null ledger offline".into()));
        }
        Ok(())
    }
}

impl Ledger for NullLedger {
    fn collect_fee(
        &self,
        payer: &Address,
        amount: Amount,
        reference: &EscrowRef,
    ) -> Result<(), LedgerError> {
        self.check_available()?;
        let mut books = self.books.lock().unwrap();
        books.debit(payer, amount)?;
        books.treasury = books.treasury.saturating_add(amount);
        books.record_debit(reference, amount);
        books.events.push(LedgerEvent::FeeCollected {
            payer: payer.clone(),
            amount,
        });
        Ok(())
    }

    fn hold(
        &self,
        from: &Address,
        amount: Amount,
        reference: &EscrowRef,
    ) -> Result<(), LedgerError> {
        self.check_available()?;
        let mut books = self.books.lock().unwrap();
        books.debit(from, amount)?;
        books.escrow = books.escrow.saturating_add(amount);
        books.record_debit(reference, amount);
        books.events.push(LedgerEvent::Held {
            from: from.clone(),
            amount,
        });
        Ok(())
    }

    fn release(
        &self,
        to: &Address,
        amount: Amount,
        reference: &EscrowRef,
    ) -> Result<(), LedgerError> {
        self.check_available()?;
        let mut books = self.books.lock().unwrap();
        if books.executed.contains(reference) {
            return Ok(());
        }
        books.escrow = books
            .escrow
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::Rejected {
                reference: reference.to_string(),
                reason: format!("release of {amount} exceeds escrow"),
            })?;
        books.credit(to, amount);
        books.executed.insert(reference.clone());
        books.events.push(LedgerEvent::Released {
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    fn forfeit(&self, amount: Amount, reference: &EscrowRef) -> Result<(), LedgerError> {
        self.check_available()?;
        let mut books = self.books.lock().unwrap();
        if books.executed.contains(reference) {
            return Ok(());
        }
        books.escrow = books
            .escrow
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::Rejected {
                reference: reference.to_string(),
                reason: format!("forfeit of {amount} exceeds escrow"),
            })?;
        books.treasury = books.treasury.saturating_add(amount);
        books.executed.insert(reference.clone());
        books.events.push(LedgerEvent::Forfeited { amount });
        Ok(())
    }

    fn reverse(
        &self,
        to: &Address,
        amount: Amount,
        reference: &EscrowRef,
    ) -> Result<(), LedgerError> {
        self.check_available()?;
        let mut books = self.books.lock().unwrap();
        let Some(debited) = books.debits.get_mut(reference).and_then(Vec::pop) else {
            return Ok(());
        };
        if debited != amount {
            books.record_debit(reference, debited);
            return Err(LedgerError::Rejected {
                reference: reference.to_string(),
                reason: format!("reversal of {amount} does not match debit of {debited}"),
            });
        }
        match reference {
            EscrowRef::ApplicationFee { .. } => {
                books.treasury = books.treasury.saturating_sub(amount)
            }
            _ => books.escrow = books.escrow.saturating_sub(amount),
        }
        books.credit(to, amount);
        books.events.push(LedgerEvent::Reversed {
            to: to.clone(),
            amount,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(seed: u8) -> Address {
        Address::from_bytes([seed; 20])
    }

    fn settle_ref() -> EscrowRef {
        EscrowRef::Settlement {
            subject: addr(1),
            voter: addr(2),
            round: 0,
        }
    }

    #[test]
    fn hold_needs_funds() {
        let ledger = NullLedger::new();
        ledger.fund(&addr(2), Amount::new(5));
        let stake = EscrowRef::Stake {
            subject: addr(1),
            voter: addr(2),
            round: 0,
            top_up: 0,
        };
        assert!(matches!(
            ledger.hold(&addr(2), Amount::new(6), &stake),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        ledger.hold(&addr(2), Amount::new(5), &stake).unwrap();
        assert_eq!(ledger.escrow(), Amount::new(5));
        assert_eq!(ledger.balance(&addr(2)), Amount::ZERO);
    }

    #[test]
    fn release_is_idempotent_per_reference() {
        let ledger = NullLedger::new();
        ledger.fund(&addr(2), Amount::new(10));
        let stake = EscrowRef::Stake {
            subject: addr(1),
            voter: addr(2),
            round: 0,
            top_up: 0,
        };
        ledger.hold(&addr(2), Amount::new(10), &stake).unwrap();

        ledger.release(&addr(2), Amount::new(10), &settle_ref()).unwrap();
        ledger.release(&addr(2), Amount::new(10), &settle_ref()).unwrap();
        assert_eq!(ledger.balance(&addr(2)), Amount::new(10));
        assert_eq!(ledger.escrow(), Amount::ZERO);
    }

    #[test]
    fn each_debit_is_reversed_once_even_when_the_reference_repeats() {
        let ledger = NullLedger::new();
        let voter = addr(2);
        ledger.fund(&voter, Amount::new(100));
        let stake = EscrowRef::Stake {
            subject: addr(1),
            voter: voter.clone(),
            round: 0,
            top_up: 0,
        };

        for _ in 0..2 {
            ledger.hold(&voter, Amount::new(50), &stake).unwrap();
            ledger.reverse(&voter, Amount::new(50), &stake).unwrap();
            assert_eq!(ledger.balance(&voter), Amount::new(100));
            assert_eq!(ledger.escrow(), Amount::ZERO);
        }

        // Nothing left to reverse.
        ledger.reverse(&voter, Amount::new(50), &stake).unwrap();
        assert_eq!(ledger.balance(&voter), Amount::new(100));
    }

    #[test]
    fn fee_reversal_comes_out_of_treasury() {
        let ledger = NullLedger::new();
        ledger.fund(&addr(1), Amount::new(5));
        let fee = EscrowRef::ApplicationFee {
            subject: addr(9),
            sequence: 0,
        };
        ledger.collect_fee(&addr(1), Amount::new(5), &fee).unwrap();
        assert!(matches!(
            ledger.reverse(&addr(1), Amount::new(4), &fee),
            Err(LedgerError::Rejected { .. })
        ));
        ledger.reverse(&addr(1), Amount::new(5), &fee).unwrap();
        assert_eq!(ledger.treasury(), Amount::ZERO);
        assert_eq!(ledger.balance(&addr(1)), Amount::new(5));
    }

    #[test]
    fn offline_ledger_refuses_everything() {
        let ledger = NullLedger::new();
        ledger.set_unavailable(true);
        assert!(matches!(
            ledger.forfeit(Amount::new(1), &settle_ref()),
            Err(LedgerError::Unavailable(_))
        ));
    }
}
