use std::sync::Arc;
use proptest::prelude::*;
use loyalty_ledger::Error;
use loyalty_ledger::interfaces::account_store::AccountStore;
use loyalty_ledger::interfaces::accrual_store::AccrualStore;
use loyalty_ledger::interfaces::ledger_writer::{CreditRequest, LedgerWriter};
use loyalty_ledger::ledger::MemoryStore;
use loyalty_ledger::ledger::audit::LedgerAudit;
use loyalty_ledger::model::accrual::{Accrual, AccrualStatus};
use loyalty_ledger::types::ids::UserId;
use loyalty_ledger::types::order_number::OrderNumber;
use loyalty_ledger::types::points::Points;
use loyalty_ledger::withdrawal::WithdrawalEngine;

#[derive(Clone, Debug)]
enum Op {
    Credit(i64),
    Withdraw(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..100_000).prop_map(Op::Credit),
        (1i64..150_000).prop_map(Op::Withdraw),
    ]
}

/// Append the Luhn check digit to `payload`.
fn with_check_digit(payload: u64) -> String {
    let digits = payload.to_string();
    let sum: u32 = digits
        .chars()
        .rev()
        .enumerate()
        .map(|(i, c)| {
            let d = c.to_digit(10).unwrap();
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    format!("{}{}", digits, (10 - sum % 10) % 10)
}

async fn apply(ops: Vec<Op>) {
    let store = Arc::new(MemoryStore::new());
    let engine = WithdrawalEngine::new(store.clone(), store.clone());
    let user = UserId::new();
    let mut expected = Points::zero();
    let mut withdrawn = Points::zero();

    for (i, op) in ops.into_iter().enumerate() {
        let number = with_check_digit(10_000 + i as u64);
        match op {
            Op::Credit(raw) => {
                let amount = Points::from_raw(raw);
                let order = OrderNumber::parse(&number).unwrap();
                store.insert_accrual(&Accrual::new(order.clone(), user)).await.unwrap();
                store.credit(&CreditRequest {
                    order_number: order,
                    user_id: user,
                    status: AccrualStatus::Processed,
                    amount,
                }).await.unwrap();
                expected += amount;
            }
            Op::Withdraw(raw) => {
                let amount = Points::from_raw(raw);
                match engine.create_withdraw(user, &number, amount).await {
                    Ok(_) => {
                        assert!(amount <= expected);
                        expected = Points::from_raw(expected.raw_value() - raw);
                        withdrawn += amount;
                    }
                    Err(Error::InsufficientBalance { available, .. }) => {
                        assert!(amount > expected);
                        assert_eq!(available, expected);
                    }
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        }

        LedgerAudit::verify_account(store.as_ref(), user).await.unwrap();
    }

    let (balance, withdrawn_sum) = match store.account(user).await.unwrap() {
        Some(account) => (account.balance, account.withdrawn_sum),
        None => (Points::zero(), Points::zero()),
    };
    assert_eq!(balance, expected);
    assert_eq!(withdrawn_sum, withdrawn);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn balance_always_matches_ledger(ops in prop::collection::vec(op(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(apply(ops));
    }
}
