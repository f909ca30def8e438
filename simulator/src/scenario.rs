//! Simulation scenarios.

use std::path::Path;

use serde::{Deserialize, Serialize};

use savevault_common::{Identity, Wei};

/// A simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario.
///
/// Accounts are labels (`"owner"`, `"addr1"`), `"null"` for the null
/// identity, or `0x` hex addresses. Amounts are decimal ether strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioStep {
    /// Mint value into a wallet.
    Fund { account: String, ether: String },
    /// Deposit attached value.
    Deposit { account: String, ether: String },
    /// Withdraw all savings.
    Withdraw { account: String },
    /// Move savings inside the ledger.
    SendOutSavings {
        from: String,
        to: String,
        ether: String,
    },
    /// Make an account revert when paid.
    MarkRefusing { account: String },
    /// Make an account call back into the ledger when paid.
    MarkHostile { account: String },
    /// Assert a condition.
    Expect { condition: Expectation },
}

/// Conditions that can be asserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expectation {
    /// The previous step succeeded.
    Succeeded,
    /// The previous step failed with a message starting with this text.
    FailedWith { message: String },
    /// Savings of an account equal.
    SavingsEqual { account: String, ether: String },
    /// Custody total equals.
    BalanceEquals { ether: String },
    /// Wallet balance of an account equals.
    WalletEquals { account: String, ether: String },
}

/// Resolve an account reference used in scenario steps.
pub fn resolve_account(account: &str) -> anyhow::Result<Identity> {
    if account.eq_ignore_ascii_case("null") {
        return Ok(Identity::NULL);
    }

    if account.starts_with("0x") || account.starts_with("0X") {
        return Ok(account.parse()?);
    }

    Ok(Identity::from_label(account))
}

/// Parse a scenario ether amount.
pub fn parse_ether(ether: &str) -> anyhow::Result<Wei> {
    Ok(Wei::parse_ether(ether)?)
}

impl Scenario {
    /// Load a built-in scenario by name, or a JSON scenario file by path.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "reference" => Ok(Self::reference()),
            "reentrancy" => Ok(Self::reentrancy()),
            path if path.ends_with(".json") => Self::from_file(path),
            _ => Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        }
    }

    /// Read a scenario from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// The reference conformance walk-through.
    fn reference() -> Self {
        use Expectation::*;
        use ScenarioStep::*;

        let s = |v: &str| v.to_string();
        let expect = |condition| Expect { condition };

        Self {
            name: s("reference"),
            description: s("Deposits, withdrawals and transfers with every rejection path"),
            steps: vec![
                Fund { account: s("owner"), ether: s("10") },
                Fund { account: s("addr1"), ether: s("10") },
                Deposit { account: s("owner"), ether: s("3") },
                expect(BalanceEquals { ether: s("3") }),
                Deposit { account: s("addr1"), ether: s("3") },
                expect(SavingsEqual { account: s("addr1"), ether: s("3") }),
                Deposit { account: s("addr1"), ether: s("0") },
                expect(FailedWith { message: s("cannot save 0 value") }),
                Withdraw { account: s("addr1") },
                expect(Succeeded),
                expect(SavingsEqual { account: s("addr1"), ether: s("0") }),
                expect(WalletEquals { account: s("addr1"), ether: s("10") }),
                Withdraw { account: s("addr1") },
                expect(FailedWith { message: s("You don't have any savings") }),
                Deposit { account: s("owner"), ether: s("2.0") },
                SendOutSavings { from: s("owner"), to: s("addr1"), ether: s("1.0") },
                expect(Succeeded),
                expect(SavingsEqual { account: s("owner"), ether: s("4") }),
                expect(SavingsEqual { account: s("addr1"), ether: s("1") }),
                expect(BalanceEquals { ether: s("5") }),
                SendOutSavings { from: s("addr2"), to: s("addr1"), ether: s("1") },
                expect(FailedWith { message: s("You do not have enough value to transfer") }),
                SendOutSavings { from: s("addr1"), to: s("addr2"), ether: s("0") },
                expect(FailedWith { message: s("Can not send 0 value") }),
                SendOutSavings { from: s("owner"), to: s("null"), ether: s("1") },
                expect(FailedWith { message: s("You do not have enough value to transfer") }),
                expect(BalanceEquals { ether: s("5") }),
            ],
        }
    }

    /// Recipients that re-enter or revert during payout.
    fn reentrancy() -> Self {
        use Expectation::*;
        use ScenarioStep::*;

        let s = |v: &str| v.to_string();
        let expect = |condition| Expect { condition };

        Self {
            name: s("reentrancy"),
            description: s("Hostile and reverting recipients cannot drain or corrupt custody"),
            steps: vec![
                Fund { account: s("owner"), ether: s("10") },
                Fund { account: s("attacker"), ether: s("1") },
                Fund { account: s("contract"), ether: s("1") },
                Deposit { account: s("owner"), ether: s("5") },
                Deposit { account: s("attacker"), ether: s("1") },
                Deposit { account: s("contract"), ether: s("1") },
                MarkHostile { account: s("attacker") },
                Withdraw { account: s("attacker") },
                expect(Succeeded),
                expect(WalletEquals { account: s("attacker"), ether: s("1") }),
                expect(BalanceEquals { ether: s("6") }),
                MarkRefusing { account: s("contract") },
                Withdraw { account: s("contract") },
                expect(FailedWith { message: s("Payout failed: recipient 0x") }),
                expect(SavingsEqual { account: s("contract"), ether: s("1") }),
                expect(BalanceEquals { ether: s("6") }),
            ],
        }
    }
}
