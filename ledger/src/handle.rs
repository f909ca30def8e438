//! Shared, serialized access to a ledger.

use std::sync::Arc;

use parking_lot::Mutex;

use savevault_common::{Identity, Result, Wei};

use crate::engine::Ledger;
use crate::payout::Payout;

/// Cloneable handle giving many callers serialized access to one ledger.
///
/// Each call holds the lock for the whole operation, including the payout
/// of a withdrawal, so no two operations ever interleave.
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    inner: Arc<Mutex<Ledger>>,
}

impl LedgerHandle {
    /// Wrap a ledger.
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// See [`Ledger::deposit`].
    pub fn deposit(&self, caller: Identity, amount: Wei) -> Result<()> {
        self.inner.lock().deposit(caller, amount)
    }

    /// See [`Ledger::withdraw`].
    pub fn withdraw<P>(&self, caller: Identity, payout: &mut P) -> Result<Wei>
    where
        P: Payout + ?Sized,
    {
        self.inner.lock().withdraw(caller, payout)
    }

    /// See [`Ledger::send_out_savings`].
    pub fn send_out_savings(
        &self,
        sender: Identity,
        receiver: Identity,
        amount: Wei,
    ) -> Result<()> {
        self.inner.lock().send_out_savings(sender, receiver, amount)
    }

    /// See [`Ledger::check_balance`].
    pub fn check_balance(&self) -> Wei {
        self.inner.lock().check_balance()
    }

    /// See [`Ledger::check_savings`].
    pub fn check_savings(&self, identity: Identity) -> Wei {
        self.inner.lock().check_savings(identity)
    }

    /// See [`Ledger::verify_integrity`].
    pub fn verify_integrity(&self) -> Result<()> {
        self.inner.lock().verify_integrity()
    }

    /// Run a read-only closure against the ledger.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        let ledger = self.inner.lock();
        f(&*ledger)
    }
}
