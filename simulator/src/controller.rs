//! Simulation controller.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use savevault_common::{Identity, Operation, Wei};
use savevault_ledger::{Ledger, LedgerHandle};

use crate::config::SimulatorConfig;
use crate::metrics::SimulationMetrics;
use crate::scenario::{parse_ether, resolve_account, Expectation, Scenario, ScenarioStep};
use crate::wallet::{Transport, TransportError, Wallets};

/// Integrity is re-verified by each client after this many operations.
const INTEGRITY_CHECK_INTERVAL: usize = 100;

/// Labels of the simulated accounts; the first owns the ledger.
pub fn account_labels(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i {
            0 => "owner".to_string(),
            i => format!("addr{}", i),
        })
        .collect()
}

/// Controls the simulation.
pub struct SimulationController {
    /// Configuration.
    config: SimulatorConfig,
    /// Simulated account identities.
    accounts: Arc<Vec<Identity>>,
    /// Wallets and ledger.
    transport: Transport,
    /// Simulation metrics.
    metrics: Arc<Mutex<SimulationMetrics>>,
}

impl SimulationController {
    /// Create a new simulation controller. Wallets start empty.
    pub fn new(config: SimulatorConfig) -> Self {
        let accounts: Vec<Identity> = account_labels(config.accounts)
            .iter()
            .map(|label| Identity::from_label(label))
            .collect();
        let owner = Identity::from_label("owner");

        let ledger = LedgerHandle::new(Ledger::with_config(owner, config.ledger.clone()));

        Self {
            config,
            accounts: Arc::new(accounts),
            transport: Transport::new(ledger, Wallets::new()),
            metrics: Arc::new(Mutex::new(SimulationMetrics::new())),
        }
    }

    /// Fund every simulated account's wallet with the configured amount.
    pub fn fund_accounts(&self) {
        let initial = Wei::from_ether(self.config.initial_funds_ether);
        self.transport.with_wallets(|wallets| {
            for account in self.accounts.iter() {
                wallets.fund(*account, initial);
            }
        });

        info!(
            accounts = self.accounts.len(),
            initial_funds = %initial.to_ether_string(),
            "Wallets funded"
        );
    }

    /// Run random operations from concurrent clients, then reconcile.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.fund_accounts();

        let seed = self.config.seed.unwrap_or_else(rand::random);
        info!(
            seed,
            clients = self.config.clients,
            operations = self.config.operations,
            "Running random load"
        );

        let clients = self.config.clients;
        let mut handles = Vec::with_capacity(clients);

        for client in 0..clients {
            let operations = self.config.operations / clients
                + usize::from(client < self.config.operations % clients);

            let worker = ClientWorker {
                id: client,
                rng: StdRng::seed_from_u64(seed.wrapping_add(client as u64)),
                accounts: self.accounts.clone(),
                transport: self.transport.clone(),
                metrics: self.metrics.clone(),
                max_amount_gwei: self.config.max_amount_gwei,
            };

            handles.push(tokio::spawn(worker.run(operations)));
        }

        for handle in handles {
            handle.await??;
        }

        self.transport.reconcile()?;
        info!(
            custody_total = %self.transport.ledger().check_balance().to_ether_string(),
            "Custody reconciled"
        );

        Ok(())
    }

    /// Run a scenario step by step, failing on the first unmet expectation.
    pub fn run_scenario(&self, scenario: &Scenario) -> anyhow::Result<()> {
        info!("Running scenario: {} - {}", scenario.name, scenario.description);

        let mut last: Option<Result<(), String>> = None;

        for (index, step) in scenario.steps.iter().enumerate() {
            debug!(step = index, ?step, "Executing step");

            match step {
                ScenarioStep::Expect { condition } => {
                    self.check(condition, last.as_ref())
                        .map_err(|e| anyhow::anyhow!("Step {} ({:?}): {}", index, condition, e))?;
                }
                step => {
                    if let Some(outcome) = self.execute_step(step)? {
                        last = Some(outcome);
                    }
                }
            }
        }

        self.transport.reconcile()?;
        info!(scenario = %scenario.name, "Scenario passed");
        Ok(())
    }

    /// Execute a non-assertion step. Returns the operation outcome, if the
    /// step invoked the ledger.
    fn execute_step(&self, step: &ScenarioStep) -> anyhow::Result<Option<Result<(), String>>> {
        let outcome = match step {
            ScenarioStep::Fund { account, ether } => {
                let account = resolve_account(account)?;
                let amount = parse_ether(ether)?;
                self.transport.with_wallets(|w| w.fund(account, amount));
                return Ok(None);
            }
            ScenarioStep::MarkRefusing { account } => {
                let account = resolve_account(account)?;
                self.transport.with_wallets(|w| w.mark_refusing(account));
                return Ok(None);
            }
            ScenarioStep::MarkHostile { account } => {
                let account = resolve_account(account)?;
                self.transport.with_wallets(|w| w.mark_hostile(account));
                return Ok(None);
            }
            ScenarioStep::Deposit { account, ether } => {
                let caller = resolve_account(account)?;
                let amount = parse_ether(ether)?;
                self.observe(Operation::Deposit, amount, || {
                    self.transport.deposit(caller, amount)
                })
            }
            ScenarioStep::Withdraw { account } => {
                let caller = resolve_account(account)?;
                let start = Instant::now();
                let result = self.transport.withdraw(caller);
                self.record(Operation::Withdraw, &result, start);
                result.map(|_| ())
            }
            ScenarioStep::SendOutSavings { from, to, ether } => {
                let sender = resolve_account(from)?;
                let receiver = resolve_account(to)?;
                let amount = parse_ether(ether)?;
                self.observe(Operation::SendOutSavings, amount, || {
                    self.transport.send_out_savings(sender, receiver, amount)
                })
            }
            ScenarioStep::Expect { .. } => return Ok(None),
        };

        Ok(Some(outcome.map_err(|e| e.to_string())))
    }

    fn check(
        &self,
        condition: &Expectation,
        last: Option<&Result<(), String>>,
    ) -> anyhow::Result<()> {
        match condition {
            Expectation::Succeeded => match last {
                Some(Ok(())) => Ok(()),
                Some(Err(e)) => Err(anyhow::anyhow!("expected success, got \"{}\"", e)),
                None => Err(anyhow::anyhow!("no operation to check")),
            },
            Expectation::FailedWith { message } => match last {
                Some(Err(e)) if e.starts_with(message.as_str()) => Ok(()),
                Some(Err(e)) => Err(anyhow::anyhow!("expected \"{}\", got \"{}\"", message, e)),
                Some(Ok(())) => Err(anyhow::anyhow!("expected \"{}\", got success", message)),
                None => Err(anyhow::anyhow!("no operation to check")),
            },
            Expectation::SavingsEqual { account, ether } => {
                let actual = self
                    .transport
                    .ledger()
                    .check_savings(resolve_account(account)?);
                expect_amount("savings", actual, parse_ether(ether)?)
            }
            Expectation::BalanceEquals { ether } => {
                let actual = self.transport.ledger().check_balance();
                expect_amount("custody total", actual, parse_ether(ether)?)
            }
            Expectation::WalletEquals { account, ether } => {
                let account = resolve_account(account)?;
                let actual = self.transport.with_wallets(|w| w.balance(account));
                expect_amount("wallet", actual, parse_ether(ether)?)
            }
        }
    }

    fn observe(
        &self,
        operation: Operation,
        amount: Wei,
        call: impl FnOnce() -> Result<(), TransportError>,
    ) -> Result<(), TransportError> {
        let start = Instant::now();
        let result = call().map(|_| amount);
        self.record(operation, &result, start);
        result.map(|_| ())
    }

    fn record(&self, operation: Operation, result: &Result<Wei, TransportError>, start: Instant) {
        record_outcome(&self.metrics, operation, result, start);
    }

    /// Get simulation metrics.
    pub fn metrics(&self) -> SimulationMetrics {
        self.metrics.lock().clone()
    }

    /// Wallets and ledger under simulation.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}

fn expect_amount(what: &str, actual: Wei, expected: Wei) -> anyhow::Result<()> {
    if actual != expected {
        anyhow::bail!(
            "expected {} of {} ether, found {} ether",
            what,
            expected.to_ether_string(),
            actual.to_ether_string()
        );
    }
    Ok(())
}

fn record_outcome(
    metrics: &Mutex<SimulationMetrics>,
    operation: Operation,
    result: &Result<Wei, TransportError>,
    start: Instant,
) {
    let latency_us = start.elapsed().as_micros() as u64;
    let mut metrics = metrics.lock();
    match result {
        Ok(amount) => metrics.record_success(operation, *amount, latency_us),
        Err(e) => metrics.record_failure(e.error_code()),
    }
}

/// One simulated client issuing random calls.
struct ClientWorker {
    id: usize,
    rng: StdRng,
    accounts: Arc<Vec<Identity>>,
    transport: Transport,
    metrics: Arc<Mutex<SimulationMetrics>>,
    max_amount_gwei: u64,
}

impl ClientWorker {
    async fn run(mut self, operations: usize) -> anyhow::Result<()> {
        debug!(client = self.id, operations, "Client started");

        for n in 1..=operations {
            let caller = self.pick_account();
            let start = Instant::now();

            let (operation, result) = match self.rng.gen_range(0..10) {
                0..=4 => {
                    let amount = self.pick_amount();
                    let result = self.transport.deposit(caller, amount).map(|_| amount);
                    (Operation::Deposit, result)
                }
                5 | 6 => (Operation::Withdraw, self.transport.withdraw(caller)),
                _ => {
                    let receiver = if self.rng.gen_ratio(1, 20) {
                        Identity::NULL
                    } else {
                        self.pick_account()
                    };
                    let amount = self.pick_amount();
                    let result = self
                        .transport
                        .send_out_savings(caller, receiver, amount)
                        .map(|_| amount);
                    (Operation::SendOutSavings, result)
                }
            };

            record_outcome(&self.metrics, operation, &result, start);

            if n % INTEGRITY_CHECK_INTERVAL == 0 {
                self.transport.ledger().verify_integrity()?;
            }

            tokio::task::yield_now().await;
        }

        debug!(client = self.id, "Client finished");
        Ok(())
    }

    fn pick_account(&mut self) -> Identity {
        self.accounts[self.rng.gen_range(0..self.accounts.len())]
    }

    fn pick_amount(&mut self) -> Wei {
        Wei::from_gwei(self.rng.gen_range(0..=self.max_amount_gwei))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulatorConfig {
        SimulatorConfig {
            accounts: 4,
            operations: 400,
            clients: 3,
            seed: Some(7),
            ..SimulatorConfig::default()
        }
    }

    #[test]
    fn test_account_labels() {
        assert_eq!(account_labels(3), vec!["owner", "addr1", "addr2"]);
    }

    #[test]
    fn test_builtin_scenarios_pass() {
        for name in ["reference", "reentrancy"] {
            let controller = SimulationController::new(config());
            let scenario = Scenario::load(name).unwrap();
            controller.run_scenario(&scenario).unwrap();
        }
    }

    #[test]
    fn test_unmet_expectation_fails() {
        let controller = SimulationController::new(config());
        let scenario = Scenario {
            name: "broken".to_string(),
            description: "expects savings that were never deposited".to_string(),
            steps: vec![ScenarioStep::Expect {
                condition: Expectation::SavingsEqual {
                    account: "addr1".to_string(),
                    ether: "1".to_string(),
                },
            }],
        };

        assert!(controller.run_scenario(&scenario).is_err());
    }

    #[tokio::test]
    async fn test_random_load_reconciles() {
        let controller = SimulationController::new(config());

        controller.run().await.unwrap();

        let metrics = controller.metrics();
        assert_eq!(metrics.total_operations, 400);
        assert!(controller.transport().reconcile().is_ok());
    }
}
