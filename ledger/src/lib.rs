//! SaveVault Ledger Engine
//!
//! In-memory custody ledger: deposits, full withdrawals, internal transfers
//! of savings and public balance queries, with the custody total always
//! equal to the sum of per-identity balances.

pub mod config;
pub mod engine;
pub mod handle;
pub mod journal;
pub mod payout;

pub use config::LedgerConfig;
pub use engine::Ledger;
pub use handle::LedgerHandle;
pub use journal::{EntryKind, Journal, JournalEntry};
pub use payout::{NoopPayout, Payout, PayoutError, Reentry};
