//! Error types for SaveVault.

use crate::{Identity, Operation, ValueOperation, Wei};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a transfer was refused as insufficient.
///
/// Both causes surface as [`SaveVaultError::InsufficientSavings`] with the
/// same message; the reason is kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShortfallReason {
    /// The receiver was the null identity.
    NullReceiver,
    /// The sender's savings do not cover the amount.
    Balance { required: Wei, available: Wei },
}

impl fmt::Display for ShortfallReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortfallReason::NullReceiver => write!(f, "receiver is the null identity"),
            ShortfallReason::Balance {
                required,
                available,
            } => write!(f, "required {}, available {}", required, available),
        }
    }
}

/// Main error type for SaveVault operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaveVaultError {
    /// Zero-value deposit or transfer.
    #[error("{}", .operation.zero_amount_message())]
    InvalidAmount { operation: ValueOperation },

    /// Withdrawal with nothing to withdraw.
    #[error("You don't have any savings")]
    NoSavings { identity: Identity },

    /// Transfer exceeding available savings or targeting the null identity.
    #[error("You do not have enough value to transfer")]
    InsufficientSavings { reason: ShortfallReason },

    /// A mutating call arrived while a payout was in flight.
    #[error("Reentrant {operation} rejected while a payout is in flight")]
    ReentrantCall { operation: Operation },

    /// A balance or the custody total would exceed the value range.
    #[error("Arithmetic overflow during {operation}")]
    Overflow { operation: Operation },

    /// The external payout step refused the transfer.
    #[error("Payout failed: {0}")]
    PayoutFailed(String),

    /// Custody total diverged from the sum of balances.
    #[error("Integrity violation: custody total {custody_total}, sum of balances {sum_of_balances}")]
    IntegrityViolation {
        custody_total: Wei,
        sum_of_balances: Wei,
    },

    /// Malformed identity string.
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Malformed value amount string.
    #[error("Invalid amount: {0}")]
    InvalidAmountFormat(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SaveVaultError {
    /// Get error code for reports and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            SaveVaultError::InvalidAmount { .. } => "INVALID_AMOUNT",
            SaveVaultError::NoSavings { .. } => "NO_SAVINGS",
            SaveVaultError::InsufficientSavings { .. } => "INSUFFICIENT_SAVINGS",
            SaveVaultError::ReentrantCall { .. } => "REENTRANT_CALL",
            SaveVaultError::Overflow { .. } => "OVERFLOW",
            SaveVaultError::PayoutFailed(_) => "PAYOUT_FAILED",
            SaveVaultError::IntegrityViolation { .. } => "INTEGRITY_VIOLATION",
            SaveVaultError::InvalidIdentity(_) => "INVALID_IDENTITY",
            SaveVaultError::InvalidAmountFormat(_) => "INVALID_AMOUNT_FORMAT",
            SaveVaultError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type alias for SaveVault operations.
pub type Result<T> = std::result::Result<T, SaveVaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_contract() {
        let deposit = SaveVaultError::InvalidAmount {
            operation: ValueOperation::Deposit,
        };
        let send = SaveVaultError::InvalidAmount {
            operation: ValueOperation::SendOutSavings,
        };
        let none = SaveVaultError::NoSavings {
            identity: Identity::NULL,
        };
        let short = SaveVaultError::InsufficientSavings {
            reason: ShortfallReason::NullReceiver,
        };

        assert_eq!(deposit.to_string(), "cannot save 0 value");
        assert_eq!(send.to_string(), "Can not send 0 value");
        assert_eq!(none.to_string(), "You don't have any savings");
        assert_eq!(short.to_string(), "You do not have enough value to transfer");
    }

    #[test]
    fn test_shortfall_reasons_share_message() {
        let null = SaveVaultError::InsufficientSavings {
            reason: ShortfallReason::NullReceiver,
        };
        let balance = SaveVaultError::InsufficientSavings {
            reason: ShortfallReason::Balance {
                required: Wei::from_ether(1),
                available: Wei::ZERO,
            },
        };

        assert_eq!(null.to_string(), balance.to_string());
        assert_eq!(null.error_code(), balance.error_code());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SaveVaultError::PayoutFailed("refused".into()).error_code(),
            "PAYOUT_FAILED"
        );
        assert_eq!(
            SaveVaultError::ReentrantCall {
                operation: Operation::Withdraw
            }
            .error_code(),
            "REENTRANT_CALL"
        );
        assert_eq!(
            SaveVaultError::InvalidAmount {
                operation: ValueOperation::Deposit
            }
            .error_code(),
            "INVALID_AMOUNT"
        );
    }
}
