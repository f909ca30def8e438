//! SaveVault Simulator
//!
//! Plays the transport around the ledger: funded wallets, random concurrent
//! callers, scripted scenarios and custody reconciliation.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod controller;
mod metrics;
mod scenario;
mod wallet;

use config::SimulatorConfig;
use controller::SimulationController;
use scenario::Scenario;

/// SaveVault Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "savevault-sim")]
#[command(about = "SaveVault ledger simulation and custody reconciliation")]
struct Args {
    /// Number of simulated accounts
    #[arg(short, long)]
    accounts: Option<usize>,

    /// Random operations to run
    #[arg(short, long)]
    operations: Option<usize>,

    /// Concurrent client tasks
    #[arg(short, long)]
    clients: Option<usize>,

    /// Scenario to run (`reference`, `reentrancy` or a path to a JSON file)
    #[arg(short, long)]
    scenario: Option<String>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Write the metrics report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn apply(&self, config: &mut SimulatorConfig) {
        if let Some(accounts) = self.accounts {
            config.accounts = accounts;
        }
        if let Some(operations) = self.operations {
            config.operations = operations;
        }
        if let Some(clients) = self.clients {
            config.clients = clients;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.json_logs {
            config.json_logs = true;
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = SimulatorConfig::from_env();
    args.apply(&mut config);

    init_tracing(config.json_logs);

    info!("Starting SaveVault Simulator");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let controller = SimulationController::new(config);

    if let Some(scenario_name) = &args.scenario {
        let scenario = Scenario::load(scenario_name)?;
        controller.run_scenario(&scenario)?;
    } else {
        controller.run().await?;
    }

    let metrics = controller.metrics();
    info!("Simulation complete");
    info!("Total operations: {}", metrics.total_operations);
    info!("Committed: {}", metrics.successful_operations());
    info!("Rejected: {}", metrics.failed_operations());
    info!("Success rate: {:.1}%", metrics.success_rate() * 100.0);
    for (code, count) in &metrics.rejected {
        info!("  {}: {}", code, count);
    }
    info!("Deposited: {} ether", metrics.deposited.to_ether_string());
    info!("Withdrawn: {} ether", metrics.withdrawn.to_ether_string());
    info!("Transferred: {} ether", metrics.transferred.to_ether_string());
    info!(
        "Custody total: {} ether",
        controller.transport().ledger().check_balance().to_ether_string()
    );
    info!(
        "Journal: {} operations recorded",
        controller
            .transport()
            .ledger()
            .read(|ledger| ledger.journal().total_recorded())
    );
    info!(
        "Latency: avg {}µs, p99 {}µs",
        metrics.average_latency_us(),
        metrics.p99_latency_us()
    );

    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&metrics)?)?;
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}
