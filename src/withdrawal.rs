use std::sync::Arc;
use crate::error::{Error, Result};
use crate::interfaces::account_store::AccountStore;
use crate::interfaces::ledger_writer::{DebitRequest, LedgerWriter};
use crate::model::transaction::Transaction;
use crate::observability::metrics::{POINTS_WITHDRAWN, WITHDRAWALS_REJECTED};
use crate::types::ids::UserId;
use crate::types::order_number::OrderNumber;
use crate::types::points::Points;

/// Spends points from an account against an order number.
///
/// Validation and the balance precheck happen before any write. The debit
/// itself is conditional on the balance in the store, so a concurrent spend
/// that wins the race still yields `InsufficientBalance` and no mutation.
pub struct WithdrawalEngine {
    accounts: Arc<dyn AccountStore>,
    ledger: Arc<dyn LedgerWriter>,
}

impl WithdrawalEngine {
    pub fn new(accounts: Arc<dyn AccountStore>, ledger: Arc<dyn LedgerWriter>) -> Self {
        WithdrawalEngine { accounts, ledger }
    }

    pub async fn create_withdraw(
        &self,
        account_guid: UserId,
        order_number: &str,
        sum: Points,
    ) -> Result<Transaction> {
        let order_number = OrderNumber::parse(order_number).inspect_err(|_| reject("invalid_order"))?;

        if !sum.is_positive() {
            reject("invalid_sum");
            return Err(Error::InvalidSum(sum));
        }

        let available = self.accounts.account(account_guid).await?
            .map(|a| a.balance)
            .unwrap_or_default();

        if sum > available {
            reject("insufficient_balance");
            return Err(Error::InsufficientBalance { requested: sum, available });
        }

        let transaction = self.ledger.debit(&DebitRequest {
            account_guid,
            order_number: Some(order_number),
            amount: sum,
        })
        .await
        .inspect_err(|e| {
            if matches!(e, Error::InsufficientBalance { .. }) {
                reject("insufficient_balance");
            }
        })?;

        POINTS_WITHDRAWN.inc_by(sum.to_f64());
        tracing::info!(
            account = %account_guid,
            order_number = ?transaction.order_number,
            sum = %sum,
            "Withdrawal recorded"
        );
        Ok(transaction)
    }
}

fn reject(reason: &str) {
    WITHDRAWALS_REJECTED.with_label_values(&[reason]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::accrual_store::AccrualStore;
    use crate::interfaces::ledger_writer::CreditRequest;
    use crate::interfaces::transaction_store::TransactionStore;
    use crate::ledger::MemoryStore;
    use crate::ledger::audit::LedgerAudit;
    use crate::model::accrual::{Accrual, AccrualStatus};
    use crate::model::transaction::TransactionKind;

    async fn funded(user: UserId, units: i64) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let order = OrderNumber::parse("12345678903").unwrap();
        store.insert_accrual(&Accrual::new(order.clone(), user)).await.unwrap();
        store.credit(&CreditRequest {
            order_number: order,
            user_id: user,
            status: AccrualStatus::Processed,
            amount: Points::from_units(units),
        }).await.unwrap();
        store
    }

    fn engine(store: &Arc<MemoryStore>) -> WithdrawalEngine {
        WithdrawalEngine::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn withdraws_within_balance() {
        let user = UserId::new();
        let store = funded(user, 500).await;

        let transaction = engine(&store)
            .create_withdraw(user, "2377225624", Points::from_units(300))
            .await
            .unwrap();

        assert_eq!(transaction.kind, TransactionKind::Debit);
        assert_eq!(transaction.order_number.as_ref().map(|n| n.as_str()), Some("2377225624"));

        let account = store.account(user).await.unwrap().unwrap();
        assert_eq!(account.balance, Points::from_units(200));
        assert_eq!(account.withdrawn_sum, Points::from_units(300));
        assert_eq!(store.withdrawals(user).await.unwrap().len(), 1);
        LedgerAudit::verify_account(store.as_ref(), user).await.unwrap();
    }

    #[tokio::test]
    async fn exact_balance_can_be_withdrawn() {
        let user = UserId::new();
        let store = funded(user, 500).await;

        engine(&store).create_withdraw(user, "2377225624", Points::from_units(500)).await.unwrap();

        assert_eq!(store.account(user).await.unwrap().unwrap().balance, Points::zero());
    }

    #[tokio::test]
    async fn over_balance_is_rejected_without_mutation() {
        let user = UserId::new();
        let store = funded(user, 500).await;

        let err = engine(&store)
            .create_withdraw(user, "2377225624", Points::from_units(751))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InsufficientBalance { .. }));
        let account = store.account(user).await.unwrap().unwrap();
        assert_eq!(account.balance, Points::from_units(500));
        assert_eq!(account.withdrawn_sum, Points::zero());
        assert!(store.withdrawals(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_checksum_is_rejected() {
        let user = UserId::new();
        let store = funded(user, 500).await;

        let err = engine(&store)
            .create_withdraw(user, "2377225625", Points::from_units(1))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidOrderNumber(_)));
        assert!(store.withdrawals(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_positive_sum_is_rejected() {
        let user = UserId::new();
        let store = funded(user, 500).await;

        for sum in [Points::zero(), Points::from_units(-5)] {
            let err = engine(&store).create_withdraw(user, "2377225624", sum).await.unwrap_err();
            assert!(matches!(err, Error::InvalidSum(_)));
        }
    }

    #[tokio::test]
    async fn unknown_account_has_nothing_to_spend() {
        let store = Arc::new(MemoryStore::new());

        let err = engine(&store)
            .create_withdraw(UserId::new(), "2377225624", Points::from_units(1))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InsufficientBalance { available, .. } if available == Points::zero()));
    }
}
