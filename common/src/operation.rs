//! Ledger operation kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The mutating operations a ledger accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Value attached by the caller is credited to their savings.
    Deposit,
    /// The caller's entire savings are paid out.
    Withdraw,
    /// Savings move between two identities inside the ledger.
    SendOutSavings,
}

impl Operation {
    /// Stable name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Deposit => "deposit",
            Operation::Withdraw => "withdraw",
            Operation::SendOutSavings => "send_out_savings",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations that carry a caller-chosen amount and refuse zero.
///
/// A withdrawal always takes the whole balance, so it has no amount to
/// refuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueOperation {
    /// See [`Operation::Deposit`].
    Deposit,
    /// See [`Operation::SendOutSavings`].
    SendOutSavings,
}

impl ValueOperation {
    /// Rejection text for a zero amount.
    pub fn zero_amount_message(&self) -> &'static str {
        match self {
            ValueOperation::Deposit => "cannot save 0 value",
            ValueOperation::SendOutSavings => "Can not send 0 value",
        }
    }
}

impl From<ValueOperation> for Operation {
    fn from(operation: ValueOperation) -> Self {
        match operation {
            ValueOperation::Deposit => Operation::Deposit,
            ValueOperation::SendOutSavings => Operation::SendOutSavings,
        }
    }
}

impl fmt::Display for ValueOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Operation::from(*self), f)
    }
}
