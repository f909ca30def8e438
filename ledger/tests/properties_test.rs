//! Property tests over random operation sequences.

use std::collections::HashMap;

use proptest::prelude::*;

use savevault_common::{Identity, Wei};
use savevault_ledger::{Ledger, NoopPayout};

#[derive(Debug, Clone)]
enum Op {
    Deposit { who: usize, amount: u64 },
    Withdraw { who: usize },
    Send { from: usize, to: usize, amount: u64 },
}

const ACCOUNTS: usize = 4;

fn identity(index: usize) -> Identity {
    // The last slot stands for the null identity.
    if index == ACCOUNTS {
        Identity::NULL
    } else {
        Identity::from_label(&format!("account-{}", index))
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..ACCOUNTS, 0u64..1_000).prop_map(|(who, amount)| Op::Deposit { who, amount }),
        (0..ACCOUNTS).prop_map(|who| Op::Withdraw { who }),
        (0..ACCOUNTS, 0..=ACCOUNTS, 0u64..1_500)
            .prop_map(|(from, to, amount)| Op::Send { from, to, amount }),
    ]
}

fn sum_of_savings(ledger: &Ledger) -> u128 {
    (0..ACCOUNTS)
        .map(|i| ledger.check_savings(identity(i)).get())
        .sum()
}

proptest! {
    #[test]
    fn custody_total_equals_sum_of_savings(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let mut ledger = Ledger::new(identity(0));

        for op in ops {
            let _ = match op {
                Op::Deposit { who, amount } => ledger.deposit(identity(who), Wei::new(amount.into())),
                Op::Withdraw { who } => ledger.withdraw(identity(who), &mut NoopPayout).map(|_| ()),
                Op::Send { from, to, amount } => {
                    ledger.send_out_savings(identity(from), identity(to), Wei::new(amount.into()))
                }
            };

            prop_assert_eq!(ledger.check_balance().get(), sum_of_savings(&ledger));
            prop_assert!(ledger.verify_integrity().is_ok());
            prop_assert_eq!(ledger.check_savings(Identity::NULL), Wei::ZERO);
        }
    }

    #[test]
    fn ledger_matches_reference_model(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let mut ledger = Ledger::new(identity(0));
        let mut model: HashMap<usize, u128> = HashMap::new();

        for op in ops {
            match op {
                Op::Deposit { who, amount } => {
                    let result = ledger.deposit(identity(who), Wei::new(amount.into()));
                    prop_assert_eq!(result.is_ok(), amount > 0);
                    if amount > 0 {
                        *model.entry(who).or_default() += u128::from(amount);
                    }
                }
                Op::Withdraw { who } => {
                    let expected = model.get(&who).copied().unwrap_or(0);
                    let result = ledger.withdraw(identity(who), &mut NoopPayout);
                    if expected > 0 {
                        prop_assert_eq!(result, Ok(Wei::new(expected)));
                        model.insert(who, 0);
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
                Op::Send { from, to, amount } => {
                    let available = model.get(&from).copied().unwrap_or(0);
                    let amount = u128::from(amount);
                    let allowed = amount > 0 && to != ACCOUNTS && available >= amount;

                    let result = ledger.send_out_savings(identity(from), identity(to), Wei::new(amount));
                    prop_assert_eq!(result.is_ok(), allowed);
                    if allowed {
                        *model.entry(from).or_default() -= amount;
                        *model.entry(to).or_default() += amount;
                    }
                }
            }

            for i in 0..ACCOUNTS {
                let expected = model.get(&i).copied().unwrap_or(0);
                prop_assert_eq!(ledger.check_savings(identity(i)).get(), expected);
            }
        }
    }

    #[test]
    fn failed_operations_change_nothing(
        seed_ops in prop::collection::vec(op_strategy(), 0..16),
        who in 0..ACCOUNTS,
        to in 0..ACCOUNTS,
    ) {
        let mut ledger = Ledger::new(identity(0));
        for op in seed_ops {
            let _ = match op {
                Op::Deposit { who, amount } => ledger.deposit(identity(who), Wei::new(amount.into())),
                Op::Withdraw { who } => ledger.withdraw(identity(who), &mut NoopPayout).map(|_| ()),
                Op::Send { from, to, amount } => {
                    ledger.send_out_savings(identity(from), identity(to), Wei::new(amount.into()))
                }
            };
        }

        let before: Vec<_> = ledger.accounts().collect();
        let total = ledger.check_balance();
        let excess = ledger.check_savings(identity(who)).get() + 1;

        prop_assert!(ledger.deposit(identity(who), Wei::ZERO).is_err());
        prop_assert!(ledger.send_out_savings(identity(who), identity(to), Wei::ZERO).is_err());
        prop_assert!(ledger.send_out_savings(identity(who), Identity::NULL, Wei::new(1)).is_err());
        prop_assert!(ledger.send_out_savings(identity(who), identity(to), Wei::new(excess)).is_err());

        let after: Vec<_> = ledger.accounts().collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(ledger.check_balance(), total);
    }
}
