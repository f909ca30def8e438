//! Audit journal of committed ledger operations.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use savevault_common::{Identity, Operation, Wei};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Value was deposited into the account.
    Deposited,
    /// The account's savings were paid out.
    Withdrawn,
    /// Savings moved from the account to a counterparty.
    SavingsSent,
}

impl From<EntryKind> for Operation {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Deposited => Operation::Deposit,
            EntryKind::Withdrawn => Operation::Withdraw,
            EntryKind::SavingsSent => Operation::SendOutSavings,
        }
    }
}

/// A single committed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique entry ID.
    pub id: Uuid,
    /// Position in the ledger's history, starting at 1.
    pub sequence: u64,
    /// Entry type.
    pub kind: EntryKind,
    /// Account that invoked the operation.
    pub account: Identity,
    /// Receiving account of a transfer.
    pub counterparty: Option<Identity>,
    /// Amount moved.
    pub amount: Wei,
    /// Invoking account's balance after this entry.
    pub balance_after: Wei,
    /// Custody total after this entry.
    pub custody_total_after: Wei,
    /// When this entry was recorded.
    pub created_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Check if the entry touches the given identity.
    pub fn involves(&self, identity: &Identity) -> bool {
        self.account == *identity || self.counterparty.as_ref() == Some(identity)
    }
}

/// Bounded, append-only record of committed operations.
///
/// Oldest entries are evicted once capacity is reached. Sequence numbers
/// keep counting across evictions.
#[derive(Debug, Clone)]
pub struct Journal {
    entries: VecDeque<JournalEntry>,
    capacity: usize,
    next_sequence: u64,
}

impl Journal {
    /// Create a journal retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_sequence: 1,
        }
    }

    /// Append an entry. Returns its sequence number.
    pub fn record(
        &mut self,
        kind: EntryKind,
        account: Identity,
        counterparty: Option<Identity>,
        amount: Wei,
        balance_after: Wei,
        custody_total_after: Wei,
    ) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        if self.capacity == 0 {
            return sequence;
        }

        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }

        self.entries.push_back(JournalEntry {
            id: Uuid::new_v4(),
            sequence,
            kind,
            account,
            counterparty,
            amount,
            balance_after,
            custody_total_after,
            created_at: Utc::now(),
        });

        sequence
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    /// Retained entries touching an identity.
    pub fn for_identity<'a>(
        &'a self,
        identity: &'a Identity,
    ) -> impl Iterator<Item = &'a JournalEntry> + 'a {
        self.entries.iter().filter(move |e| e.involves(identity))
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&JournalEntry> {
        self.entries.back()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no entries are retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of operations ever recorded, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.next_sequence - 1
    }
}
