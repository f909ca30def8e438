//! Ledger configuration.

use savevault_common::{Result, SaveVaultError};

/// Upper bound on retained journal entries.
pub const MAX_JOURNAL_CAPACITY: usize = 1_000_000;

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Maximum journal entries retained (0 disables the journal).
    pub journal_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            journal_capacity: 10_000,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(capacity) = std::env::var("SAVEVAULT_JOURNAL_CAPACITY") {
            if let Ok(capacity) = capacity.parse() {
                config.journal_capacity = capacity;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.journal_capacity > MAX_JOURNAL_CAPACITY {
            return Err(SaveVaultError::Configuration(format!(
                "Journal capacity {} exceeds maximum {}",
                self.journal_capacity, MAX_JOURNAL_CAPACITY
            )));
        }

        Ok(())
    }
}
