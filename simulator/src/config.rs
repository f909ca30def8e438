//! Simulator configuration.

use savevault_ledger::LedgerConfig;

/// Simulation configuration.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Number of simulated accounts (the first is the ledger owner).
    pub accounts: usize,
    /// Random operations to run across all clients.
    pub operations: usize,
    /// Concurrent client tasks.
    pub clients: usize,
    /// Random seed for reproducibility.
    pub seed: Option<u64>,
    /// Ether minted into every wallet at start.
    pub initial_funds_ether: u64,
    /// Largest random deposit or transfer, in gwei.
    pub max_amount_gwei: u64,
    /// Emit logs as JSON.
    pub json_logs: bool,
    /// Ledger configuration.
    pub ledger: LedgerConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            accounts: 3,
            operations: 1000,
            clients: 4,
            seed: None,
            initial_funds_ether: 100,
            max_amount_gwei: 5_000_000_000,
            json_logs: false,
            ledger: LedgerConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            ledger: LedgerConfig::from_env(),
            ..Self::default()
        };

        if let Ok(accounts) = std::env::var("SAVEVAULT_ACCOUNTS") {
            if let Ok(accounts) = accounts.parse() {
                config.accounts = accounts;
            }
        }

        if let Ok(operations) = std::env::var("SAVEVAULT_OPERATIONS") {
            if let Ok(operations) = operations.parse() {
                config.operations = operations;
            }
        }

        if let Ok(clients) = std::env::var("SAVEVAULT_CLIENTS") {
            if let Ok(clients) = clients.parse() {
                config.clients = clients;
            }
        }

        if let Ok(seed) = std::env::var("SAVEVAULT_SEED") {
            config.seed = seed.parse().ok();
        }

        if let Ok(funds) = std::env::var("SAVEVAULT_INITIAL_FUNDS") {
            if let Ok(funds) = funds.parse() {
                config.initial_funds_ether = funds;
            }
        }

        if let Ok(format) = std::env::var("SAVEVAULT_LOG_FORMAT") {
            config.json_logs = format.eq_ignore_ascii_case("json");
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.accounts < 2 {
            return Err("At least 2 accounts are required".to_string());
        }

        if self.clients == 0 {
            return Err("At least 1 client is required".to_string());
        }

        if self.max_amount_gwei == 0 {
            return Err("Maximum amount cannot be 0".to_string());
        }

        self.ledger.validate().map_err(|e| e.to_string())
    }
}
