//! Core ledger engine implementation.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument, warn};

use savevault_common::{
    Identity, Operation, Result, SaveVaultError, ShortfallReason, ValueOperation, Wei,
};

use crate::config::LedgerConfig;
use crate::journal::{EntryKind, Journal};
use crate::payout::{Payout, Reentry};

/// The custody ledger.
///
/// Owns the identity → balance map and the custody total. Every mutating
/// operation either commits completely or returns an error with no
/// observable change.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Identity that created the ledger.
    owner: Identity,
    /// Savings per identity. Entries are never removed.
    balances: BTreeMap<Identity, Wei>,
    /// Value currently held on behalf of all identities.
    custody_total: Wei,
    /// Set while a withdrawal's payout runs.
    payout_in_flight: bool,
    /// Committed operations.
    journal: Journal,
}

impl Ledger {
    /// Create an empty ledger owned by `owner`.
    pub fn new(owner: Identity) -> Self {
        Self::with_config(owner, LedgerConfig::default())
    }

    /// Create an empty ledger with explicit configuration.
    pub fn with_config(owner: Identity, config: LedgerConfig) -> Self {
        info!(owner = %owner, journal_capacity = config.journal_capacity, "Ledger created");

        Self {
            owner,
            balances: BTreeMap::new(),
            custody_total: Wei::ZERO,
            payout_in_flight: false,
            journal: Journal::new(config.journal_capacity),
        }
    }

    /// Identity that created the ledger.
    pub fn owner(&self) -> Identity {
        self.owner
    }

    /// Credit `amount` of attached value to `caller`.
    #[instrument(skip_all, fields(caller = %caller, amount = %amount))]
    pub fn deposit(&mut self, caller: Identity, amount: Wei) -> Result<()> {
        self.enter(Operation::Deposit)?;

        if amount.is_zero() {
            warn!("Rejected zero-value deposit");
            return Err(SaveVaultError::InvalidAmount {
                operation: ValueOperation::Deposit,
            });
        }

        let overflow = SaveVaultError::Overflow {
            operation: Operation::Deposit,
        };
        let balance = self
            .check_savings(caller)
            .checked_add(amount)
            .ok_or_else(|| overflow.clone())?;
        let custody_total = self.custody_total.checked_add(amount).ok_or(overflow)?;

        self.balances.insert(caller, balance);
        self.custody_total = custody_total;

        self.journal.record(
            EntryKind::Deposited,
            caller,
            None,
            amount,
            balance,
            custody_total,
        );

        info!(
            balance = %balance,
            custody_total = %custody_total,
            "Deposit committed"
        );

        Ok(())
    }

    /// Pay out the caller's entire savings.
    ///
    /// The balance is zeroed before `payout` runs. If the payout fails or
    /// panics the withdrawal is reverted. Returns the amount paid.
    #[instrument(skip_all, fields(caller = %caller))]
    pub fn withdraw<P>(&mut self, caller: Identity, payout: &mut P) -> Result<Wei>
    where
        P: Payout + ?Sized,
    {
        self.enter(Operation::Withdraw)?;

        let amount = self.check_savings(caller);
        if amount.is_zero() {
            warn!("Rejected withdrawal with no savings");
            return Err(SaveVaultError::NoSavings { identity: caller });
        }

        let previous_total = self.custody_total;
        let custody_total = previous_total.checked_sub(amount).ok_or_else(|| {
            SaveVaultError::IntegrityViolation {
                custody_total: previous_total,
                sum_of_balances: self.sum_of_balances(),
            }
        })?;

        // Effects before the payout so a re-entrant call sees zero savings.
        self.balances.insert(caller, Wei::ZERO);
        self.custody_total = custody_total;

        let outcome = {
            let mut guard = PayoutGuard::new(self, caller, amount, previous_total);
            let outcome = payout.pay(&mut Reentry::new(&mut *guard.ledger), caller, amount);
            guard.committed = outcome.is_ok();
            outcome
        };

        if let Err(e) = outcome {
            warn!(amount = %amount, error = %e, "Payout failed, withdrawal reverted");
            return Err(SaveVaultError::PayoutFailed(e.to_string()));
        }

        self.journal.record(
            EntryKind::Withdrawn,
            caller,
            None,
            amount,
            Wei::ZERO,
            custody_total,
        );

        info!(
            amount = %amount,
            custody_total = %custody_total,
            "Withdrawal committed"
        );

        Ok(amount)
    }

    /// Move `amount` of savings from `sender` to `receiver`.
    ///
    /// Both a null receiver and a short balance fail as
    /// [`SaveVaultError::InsufficientSavings`].
    #[instrument(skip_all, fields(sender = %sender, receiver = %receiver, amount = %amount))]
    pub fn send_out_savings(
        &mut self,
        sender: Identity,
        receiver: Identity,
        amount: Wei,
    ) -> Result<()> {
        self.enter(Operation::SendOutSavings)?;

        if amount.is_zero() {
            warn!("Rejected zero-value transfer");
            return Err(SaveVaultError::InvalidAmount {
                operation: ValueOperation::SendOutSavings,
            });
        }

        if receiver.is_null() {
            warn!("Rejected transfer to the null identity");
            return Err(SaveVaultError::InsufficientSavings {
                reason: ShortfallReason::NullReceiver,
            });
        }

        let available = self.check_savings(sender);
        let Some(sender_balance) = available.checked_sub(amount) else {
            warn!(available = %available, "Rejected transfer exceeding savings");
            return Err(SaveVaultError::InsufficientSavings {
                reason: ShortfallReason::Balance {
                    required: amount,
                    available,
                },
            });
        };

        if sender == receiver {
            debug!("Self-transfer, nothing to move");
        } else {
            let receiver_balance = self
                .check_savings(receiver)
                .checked_add(amount)
                .ok_or(SaveVaultError::Overflow {
                    operation: Operation::SendOutSavings,
                })?;

            self.balances.insert(sender, sender_balance);
            self.balances.insert(receiver, receiver_balance);
        }

        self.journal.record(
            EntryKind::SavingsSent,
            sender,
            Some(receiver),
            amount,
            self.check_savings(sender),
            self.custody_total,
        );

        info!(
            sender_balance = %self.check_savings(sender),
            receiver_balance = %self.check_savings(receiver),
            "Transfer committed"
        );

        Ok(())
    }

    /// Aggregate value held by the ledger.
    pub fn check_balance(&self) -> Wei {
        self.custody_total
    }

    /// Savings of `identity`; zero if it never held any.
    pub fn check_savings(&self, identity: Identity) -> Wei {
        self.balances.get(&identity).copied().unwrap_or(Wei::ZERO)
    }

    /// Verify the custody total equals the sum of balances.
    pub fn verify_integrity(&self) -> Result<()> {
        let sum_of_balances = self.sum_of_balances();

        if sum_of_balances != self.custody_total {
            return Err(SaveVaultError::IntegrityViolation {
                custody_total: self.custody_total,
                sum_of_balances,
            });
        }

        Ok(())
    }

    /// All known identities and their savings, in identity order.
    pub fn accounts(&self) -> impl Iterator<Item = (Identity, Wei)> + '_ {
        self.balances.iter().map(|(id, balance)| (*id, *balance))
    }

    /// Committed operation history.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Check if a withdrawal's payout is currently running.
    pub fn is_payout_in_flight(&self) -> bool {
        self.payout_in_flight
    }

    fn enter(&self, operation: Operation) -> Result<()> {
        if self.payout_in_flight {
            warn!(operation = %operation, "Rejected re-entrant call");
            return Err(SaveVaultError::ReentrantCall { operation });
        }

        Ok(())
    }

    fn sum_of_balances(&self) -> Wei {
        self.balances
            .values()
            .fold(Wei::ZERO, |acc, balance| acc.saturating_add(*balance))
    }
}

/// Holds the reentrancy flag for the duration of a payout.
///
/// Dropping the guard clears the flag. Unless the payout was marked
/// committed, it also puts back the caller's balance and the custody total,
/// which covers both a refused payout and one that unwinds.
struct PayoutGuard<'a> {
    ledger: &'a mut Ledger,
    caller: Identity,
    amount: Wei,
    previous_total: Wei,
    committed: bool,
}

impl<'a> PayoutGuard<'a> {
    fn new(ledger: &'a mut Ledger, caller: Identity, amount: Wei, previous_total: Wei) -> Self {
        ledger.payout_in_flight = true;
        Self {
            ledger,
            caller,
            amount,
            previous_total,
            committed: false,
        }
    }
}

impl Drop for PayoutGuard<'_> {
    fn drop(&mut self) {
        self.ledger.payout_in_flight = false;

        if !self.committed {
            self.ledger.balances.insert(self.caller, self.amount);
            self.ledger.custody_total = self.previous_total;
        }
    }
}
