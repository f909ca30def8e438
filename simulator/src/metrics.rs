//! Simulation metrics.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use savevault_common::{Operation, Wei};

/// Simulation metrics.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationMetrics {
    /// Total operations attempted.
    pub total_operations: u64,
    /// Committed operations per kind.
    pub committed: BTreeMap<String, u64>,
    /// Rejections per error code.
    pub rejected: BTreeMap<String, u64>,
    /// Value deposited.
    pub deposited: Wei,
    /// Value paid out.
    pub withdrawn: Wei,
    /// Value moved between identities.
    pub transferred: Wei,
    /// Latency samples (µs).
    #[serde(skip)]
    latency_samples: VecDeque<u64>,
    /// Maximum samples to keep.
    #[serde(skip)]
    max_samples: usize,
}

impl SimulationMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self {
            total_operations: 0,
            committed: BTreeMap::new(),
            rejected: BTreeMap::new(),
            deposited: Wei::ZERO,
            withdrawn: Wei::ZERO,
            transferred: Wei::ZERO,
            latency_samples: VecDeque::with_capacity(10000),
            max_samples: 10000,
        }
    }

    /// Record a committed operation.
    pub fn record_success(&mut self, operation: Operation, amount: Wei, latency_us: u64) {
        self.total_operations += 1;
        *self.committed.entry(operation.to_string()).or_default() += 1;

        let volume = match operation {
            Operation::Deposit => &mut self.deposited,
            Operation::Withdraw => &mut self.withdrawn,
            Operation::SendOutSavings => &mut self.transferred,
        };
        *volume = volume.saturating_add(amount);

        if self.latency_samples.len() >= self.max_samples {
            self.latency_samples.pop_front();
        }
        self.latency_samples.push_back(latency_us);
    }

    /// Record a rejected operation.
    pub fn record_failure(&mut self, error_code: &str) {
        self.total_operations += 1;
        *self.rejected.entry(error_code.to_string()).or_default() += 1;
    }

    /// Committed operations across all kinds.
    pub fn successful_operations(&self) -> u64 {
        self.committed.values().sum()
    }

    /// Rejected operations across all codes.
    pub fn failed_operations(&self) -> u64 {
        self.rejected.values().sum()
    }

    /// Get average latency in µs.
    pub fn average_latency_us(&self) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let sum: u64 = self.latency_samples.iter().sum();
        sum / self.latency_samples.len() as u64
    }

    /// Get p99 latency.
    pub fn p99_latency_us(&self) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let mut sorted: Vec<_> = self.latency_samples.iter().copied().collect();
        sorted.sort_unstable();

        let idx = (sorted.len() * 99 / 100).min(sorted.len() - 1);
        sorted[idx]
    }

    /// Get success rate.
    pub fn success_rate(&self) -> f64 {
        if self.total_operations == 0 {
            return 0.0;
        }

        self.successful_operations() as f64 / self.total_operations as f64
    }
}

impl Default for SimulationMetrics {
    fn default() -> Self {
        Self::new()
    }
}
