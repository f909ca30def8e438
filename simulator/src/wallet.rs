//! Simulated wallets and the transport that carries value into the ledger.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use savevault_common::{Identity, SaveVaultError, Wei};
use savevault_ledger::{LedgerHandle, NoopPayout, Payout, PayoutError, Reentry};

/// Failure of a call made through the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The caller's wallet cannot cover the attached value.
    #[error("Wallet {identity} holds {available}, cannot attach {required}")]
    InsufficientWalletFunds {
        identity: Identity,
        required: Wei,
        available: Wei,
    },

    /// The ledger's account cannot cover value it has to hand back.
    #[error("Vault holds {available}, cannot return {required}")]
    VaultShortfall { required: Wei, available: Wei },

    /// The ledger rejected the call.
    #[error(transparent)]
    Ledger(#[from] SaveVaultError),
}

impl TransportError {
    /// Error code for metrics.
    pub fn error_code(&self) -> &'static str {
        match self {
            TransportError::InsufficientWalletFunds { .. } => "WALLET_FUNDS",
            TransportError::VaultShortfall { .. } => "VAULT_SHORTFALL",
            TransportError::Ledger(e) => e.error_code(),
        }
    }
}

/// Native value held outside the ledger, plus the ledger's holding account.
#[derive(Debug, Default)]
pub struct Wallets {
    /// Per-identity wallet balances.
    balances: HashMap<Identity, Wei>,
    /// Value held by the ledger's own account.
    vault: Wei,
    /// Recipients that revert on receipt.
    refusing: HashSet<Identity>,
    /// Recipients that call back into the ledger on receipt.
    hostile: HashSet<Identity>,
}

impl Wallets {
    /// Create an empty wallet set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint value into a wallet.
    pub fn fund(&mut self, identity: Identity, amount: Wei) {
        let balance = self.balances.entry(identity).or_insert(Wei::ZERO);
        *balance = balance.saturating_add(amount);
    }

    /// Wallet balance of an identity.
    pub fn balance(&self, identity: Identity) -> Wei {
        self.balances.get(&identity).copied().unwrap_or(Wei::ZERO)
    }

    /// Value held by the ledger's account.
    pub fn vault(&self) -> Wei {
        self.vault
    }

    /// Make a recipient revert on receipt.
    pub fn mark_refusing(&mut self, identity: Identity) {
        self.refusing.insert(identity);
    }

    /// Make a recipient re-enter the ledger on receipt.
    pub fn mark_hostile(&mut self, identity: Identity) {
        self.hostile.insert(identity);
    }

    fn attach(&mut self, from: Identity, amount: Wei) -> Result<(), TransportError> {
        let available = self.balance(from);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or(TransportError::InsufficientWalletFunds {
                    identity: from,
                    required: amount,
                    available,
                })?;

        self.balances.insert(from, remaining);
        self.vault = self.vault.saturating_add(amount);
        Ok(())
    }

    fn refund(&mut self, to: Identity, amount: Wei) -> Result<(), TransportError> {
        let available = self.vault;
        self.vault = available
            .checked_sub(amount)
            .ok_or(TransportError::VaultShortfall {
                required: amount,
                available,
            })?;
        self.fund(to, amount);
        Ok(())
    }
}

impl Payout for Wallets {
    fn pay(
        &mut self,
        ledger: &mut Reentry<'_>,
        to: Identity,
        amount: Wei,
    ) -> Result<(), PayoutError> {
        if self.refusing.contains(&to) {
            return Err(PayoutError::new(format!("recipient {} reverted", to)));
        }

        self.vault = self
            .vault
            .checked_sub(amount)
            .ok_or_else(|| PayoutError::new("vault holds less than the payout"))?;
        self.fund(to, amount);

        if self.hostile.contains(&to) {
            match ledger.withdraw(to, &mut NoopPayout) {
                Ok(paid) => warn!(recipient = %to, paid = %paid, "Re-entrant withdrawal succeeded"),
                Err(e) => debug!(recipient = %to, error = %e, "Re-entrant withdrawal rejected"),
            }
        }

        Ok(())
    }
}

/// Carries calls and attached value between wallets and the ledger.
///
/// Wallets are always locked before the ledger.
#[derive(Debug, Clone)]
pub struct Transport {
    ledger: LedgerHandle,
    wallets: Arc<Mutex<Wallets>>,
}

impl Transport {
    /// Create a transport over a ledger and a wallet set.
    pub fn new(ledger: LedgerHandle, wallets: Wallets) -> Self {
        Self {
            ledger,
            wallets: Arc::new(Mutex::new(wallets)),
        }
    }

    /// The ledger behind this transport.
    pub fn ledger(&self) -> &LedgerHandle {
        &self.ledger
    }

    /// Run a closure with exclusive access to the wallets.
    pub fn with_wallets<R>(&self, f: impl FnOnce(&mut Wallets) -> R) -> R {
        let mut wallets = self.wallets.lock();
        f(&mut wallets)
    }

    /// Attach `amount` from the caller's wallet and deposit it.
    ///
    /// Value is returned to the wallet if the ledger rejects the call.
    pub fn deposit(&self, caller: Identity, amount: Wei) -> Result<(), TransportError> {
        let mut wallets = self.wallets.lock();
        wallets.attach(caller, amount)?;

        if let Err(e) = self.ledger.deposit(caller, amount) {
            wallets.refund(caller, amount)?;
            return Err(e.into());
        }

        Ok(())
    }

    /// Withdraw the caller's savings into their wallet.
    pub fn withdraw(&self, caller: Identity) -> Result<Wei, TransportError> {
        let mut wallets = self.wallets.lock();
        Ok(self.ledger.withdraw(caller, &mut *wallets)?)
    }

    /// Move savings inside the ledger; no value is attached.
    pub fn send_out_savings(
        &self,
        sender: Identity,
        receiver: Identity,
        amount: Wei,
    ) -> Result<(), TransportError> {
        let _wallets = self.wallets.lock();
        Ok(self.ledger.send_out_savings(sender, receiver, amount)?)
    }

    /// Check that the ledger's account holds exactly its custody total.
    pub fn reconcile(&self) -> anyhow::Result<()> {
        let wallets = self.wallets.lock();
        let custody_total = self.ledger.check_balance();

        if wallets.vault() != custody_total {
            anyhow::bail!(
                "Vault holds {} but ledger reports custody of {}",
                wallets.vault(),
                custody_total
            );
        }

        self.ledger.verify_integrity()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use savevault_ledger::Ledger;

    fn transport() -> (Transport, Identity, Identity) {
        let owner = Identity::from_label("owner");
        let addr1 = Identity::from_label("addr1");

        let mut wallets = Wallets::new();
        wallets.fund(owner, Wei::from_ether(10));
        wallets.fund(addr1, Wei::from_ether(10));

        let ledger = LedgerHandle::new(Ledger::new(owner));
        (Transport::new(ledger, wallets), owner, addr1)
    }

    #[test]
    fn test_deposit_moves_value_into_vault() {
        let (transport, owner, _) = transport();

        transport.deposit(owner, Wei::from_ether(3)).unwrap();

        assert_eq!(transport.with_wallets(|w| w.balance(owner)), Wei::from_ether(7));
        assert_eq!(transport.with_wallets(|w| w.vault()), Wei::from_ether(3));
        assert!(transport.reconcile().is_ok());
    }

    #[test]
    fn test_rejected_deposit_is_refunded() {
        let (transport, owner, _) = transport();

        let err = transport.deposit(owner, Wei::ZERO).unwrap_err();

        assert_eq!(err.to_string(), "cannot save 0 value");
        assert_eq!(transport.with_wallets(|w| w.balance(owner)), Wei::from_ether(10));
        assert!(transport.reconcile().is_ok());
    }

    #[test]
    fn test_deposit_beyond_wallet_funds() {
        let (transport, owner, _) = transport();

        let err = transport.deposit(owner, Wei::from_ether(11)).unwrap_err();

        assert_eq!(err.error_code(), "WALLET_FUNDS");
        assert_eq!(transport.ledger().check_balance(), Wei::ZERO);
    }

    #[test]
    fn test_withdraw_returns_value_to_wallet() {
        let (transport, owner, addr1) = transport();

        transport.deposit(owner, Wei::from_ether(2)).unwrap();
        transport
            .send_out_savings(owner, addr1, Wei::from_ether(1))
            .unwrap();
        let paid = transport.withdraw(addr1).unwrap();

        assert_eq!(paid, Wei::from_ether(1));
        assert_eq!(transport.with_wallets(|w| w.balance(addr1)), Wei::from_ether(11));
        assert_eq!(transport.with_wallets(|w| w.vault()), Wei::from_ether(1));
        assert!(transport.reconcile().is_ok());
    }

    #[test]
    fn test_refusing_recipient_keeps_savings() {
        let (transport, owner, _) = transport();
        transport.deposit(owner, Wei::from_ether(2)).unwrap();
        transport.with_wallets(|w| w.mark_refusing(owner));

        let err = transport.withdraw(owner).unwrap_err();

        assert_eq!(err.error_code(), "PAYOUT_FAILED");
        assert_eq!(transport.ledger().check_savings(owner), Wei::from_ether(2));
        assert!(transport.reconcile().is_ok());
    }

    #[test]
    fn test_hostile_recipient_paid_once() {
        let (transport, owner, _) = transport();
        transport.deposit(owner, Wei::from_ether(2)).unwrap();
        transport.with_wallets(|w| w.mark_hostile(owner));

        transport.withdraw(owner).unwrap();

        assert_eq!(transport.with_wallets(|w| w.balance(owner)), Wei::from_ether(10));
        assert!(transport.reconcile().is_ok());
    }

    #[test]
    fn test_refund_beyond_vault_is_reported() {
        let (transport, owner, _) = transport();
        transport.deposit(owner, Wei::from_ether(1)).unwrap();

        let err = transport
            .with_wallets(|w| w.refund(owner, Wei::from_ether(2)))
            .unwrap_err();

        assert_eq!(err.error_code(), "VAULT_SHORTFALL");
        assert_eq!(
            err,
            TransportError::VaultShortfall {
                required: Wei::from_ether(2),
                available: Wei::from_ether(1),
            }
        );
        assert_eq!(transport.with_wallets(|w| w.vault()), Wei::from_ether(1));
        assert_eq!(transport.with_wallets(|w| w.balance(owner)), Wei::from_ether(9));
        assert!(transport.reconcile().is_ok());
    }
}
