use crate::error::{Error, Result};
use crate::interfaces::account_store::AccountStore;
use crate::interfaces::transaction_store::TransactionStore;
use crate::model::transaction::TransactionKind;
use crate::types::ids::UserId;
use crate::types::points::Points;

pub struct LedgerAudit;

impl LedgerAudit {
    /// Reconcile the stored balance and withdrawn sum with the ledger entries
    pub async fn verify_account<S>(store: &S, guid: UserId) -> Result<()>
    where
        S: AccountStore + TransactionStore + ?Sized,
    {
        let credits: Points = store.transactions(guid, TransactionKind::Credit).await?
            .iter()
            .map(|t| t.sum)
            .sum();
        let debits: Points = store.transactions(guid, TransactionKind::Debit).await?
            .iter()
            .map(|t| t.sum)
            .sum();

        let (balance, withdrawn) = match store.account(guid).await? {
            Some(account) => (account.balance, account.withdrawn_sum),
            None => (Points::zero(), Points::zero()),
        };

        let expected = Points::from_raw(credits.raw_value() - debits.raw_value());
        if balance != expected {
            return Err(Error::LedgerMismatch {
                account: guid,
                expected,
                actual: balance,
            });
        }

        if withdrawn != debits {
            return Err(Error::LedgerMismatch {
                account: guid,
                expected: debits,
                actual: withdrawn,
            });
        }

        if balance.is_negative() {
            return Err(Error::LedgerMismatch {
                account: guid,
                expected: Points::zero(),
                actual: balance,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::accrual_store::AccrualStore;
    use crate::interfaces::ledger_writer::{CreditRequest, DebitRequest, LedgerWriter};
    use crate::ledger::memory::MemoryStore;
    use crate::model::accrual::{Accrual, AccrualStatus};
    use crate::types::order_number::OrderNumber;

    #[tokio::test]
    async fn empty_account_balances() {
        let store = MemoryStore::new();
        LedgerAudit::verify_account(&store, UserId::new()).await.unwrap();
    }

    #[tokio::test]
    async fn credit_then_debit_balances() {
        let store = MemoryStore::new();
        let user = UserId::new();
        let order = OrderNumber::parse("12345678903").unwrap();
        store.insert_accrual(&Accrual::new(order.clone(), user)).await.unwrap();

        store.credit(&CreditRequest {
            order_number: order,
            user_id: user,
            status: AccrualStatus::Processed,
            amount: Points::from_units(500),
        }).await.unwrap();
        store.debit(&DebitRequest {
            account_guid: user,
            order_number: None,
            amount: Points::from_units(300),
        }).await.unwrap();

        LedgerAudit::verify_account(&store, user).await.unwrap();
        assert_eq!(store.account(user).await.unwrap().unwrap().balance, Points::from_units(200));
    }
}
