//! The external payout step of a withdrawal.

use savevault_common::{Identity, Result, Wei};
use thiserror::Error;

use crate::Ledger;

/// The transport refused to move value out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct PayoutError {
    /// Human-readable reason.
    pub reason: String,
}

impl PayoutError {
    /// Create a new payout error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The ledger as seen by a recipient while its payout runs.
///
/// Only the public operations are reachable. The ledger itself cannot be
/// replaced or swapped out from here:
///
/// ```compile_fail
/// use savevault_common::{Identity, Wei};
/// use savevault_ledger::{Ledger, Payout, PayoutError, Reentry};
///
/// struct Replace;
///
/// impl Payout for Replace {
///     fn pay(
///         &mut self,
///         ledger: &mut Reentry<'_>,
///         to: Identity,
///         _amount: Wei,
///     ) -> Result<(), PayoutError> {
///         *ledger = Reentry::new(&mut Ledger::new(to));
///         Err(PayoutError::new("revert"))
///     }
/// }
/// ```
pub struct Reentry<'a> {
    ledger: &'a mut Ledger,
}

impl<'a> Reentry<'a> {
    pub(crate) fn new(ledger: &'a mut Ledger) -> Self {
        Self { ledger }
    }

    /// See [`Ledger::deposit`].
    pub fn deposit(&mut self, caller: Identity, amount: Wei) -> Result<()> {
        self.ledger.deposit(caller, amount)
    }

    /// See [`Ledger::withdraw`].
    pub fn withdraw<P>(&mut self, caller: Identity, payout: &mut P) -> Result<Wei>
    where
        P: Payout + ?Sized,
    {
        self.ledger.withdraw(caller, payout)
    }

    /// See [`Ledger::send_out_savings`].
    pub fn send_out_savings(
        &mut self,
        sender: Identity,
        receiver: Identity,
        amount: Wei,
    ) -> Result<()> {
        self.ledger.send_out_savings(sender, receiver, amount)
    }

    /// See [`Ledger::check_balance`].
    pub fn check_balance(&self) -> Wei {
        self.ledger.check_balance()
    }

    /// See [`Ledger::check_savings`].
    pub fn check_savings(&self, identity: Identity) -> Wei {
        self.ledger.check_savings(identity)
    }

    /// See [`Ledger::owner`].
    pub fn owner(&self) -> Identity {
        self.ledger.owner()
    }

    /// See [`Ledger::is_payout_in_flight`].
    pub fn is_payout_in_flight(&self) -> bool {
        self.ledger.is_payout_in_flight()
    }
}

/// Moves withdrawn value out of the ledger's holding account.
///
/// The recipient may run its own logic on receipt, so implementations get
/// a [`Reentry`] view and may call into the ledger. Any mutating call made
/// from here is rejected; read queries observe the already-zeroed balance.
pub trait Payout {
    /// Transfer `amount` to `to`. An error or a panic reverts the withdrawal.
    fn pay(
        &mut self,
        ledger: &mut Reentry<'_>,
        to: Identity,
        amount: Wei,
    ) -> std::result::Result<(), PayoutError>;
}

/// Payout that accepts every transfer without side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPayout;

impl Payout for NoopPayout {
    fn pay(
        &mut self,
        _ledger: &mut Reentry<'_>,
        _to: Identity,
        _amount: Wei,
    ) -> std::result::Result<(), PayoutError> {
        Ok(())
    }
}
