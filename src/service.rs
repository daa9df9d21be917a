use std::sync::Arc;
use crate::error::{Error, Result};
use crate::interfaces::account_store::AccountStore;
use crate::interfaces::accrual_store::AccrualStore;
use crate::interfaces::ledger_writer::LedgerWriter;
use crate::interfaces::transaction_store::TransactionStore;
use crate::model::account::BalanceSummary;
use crate::model::accrual::Accrual;
use crate::model::transaction::Transaction;
use crate::types::ids::UserId;
use crate::types::order_number::OrderNumber;
use crate::types::points::Points;
use crate::withdrawal::WithdrawalEngine;

/// Operations offered to inbound request handlers.
pub struct LoyaltyService {
    accruals: Arc<dyn AccrualStore>,
    accounts: Arc<dyn AccountStore>,
    transactions: Arc<dyn TransactionStore>,
    withdrawals: WithdrawalEngine,
}

impl LoyaltyService {
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: AccrualStore + AccountStore + TransactionStore + LedgerWriter + 'static,
    {
        LoyaltyService {
            accruals: store.clone(),
            accounts: store.clone(),
            transactions: store.clone(),
            withdrawals: WithdrawalEngine::new(store.clone(), store),
        }
    }

    /// Register an order for accrual tracking with status `New`.
    pub async fn create_accrual(&self, order_number: &str, user_id: UserId) -> Result<Accrual> {
        let order_number = OrderNumber::parse(order_number)?;

        if let Some(existing) = self.accruals.accrual_by_order_number(&order_number).await? {
            return Err(upload_conflict(&existing, user_id));
        }

        let accrual = Accrual::new(order_number, user_id);
        match self.accruals.insert_accrual(&accrual).await {
            Ok(()) => {
                tracing::info!(order_number = %accrual.order_number, user_id = %user_id, "Order uploaded");
                Ok(accrual)
            }
            // Lost a race with a concurrent upload of the same number.
            Err(Error::OrderAlreadyUploaded(order_number)) => {
                match self.accruals.accrual_by_order_number(&order_number).await? {
                    Some(existing) => Err(upload_conflict(&existing, user_id)),
                    None => Err(Error::OrderAlreadyUploaded(order_number)),
                }
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_accruals(&self, user_id: UserId) -> Result<Vec<Accrual>> {
        self.accruals.accruals_by_user(user_id).await
    }

    pub async fn balance(&self, user_id: UserId) -> Result<BalanceSummary> {
        Ok(self.accounts.account(user_id).await?
            .as_ref()
            .map(BalanceSummary::from)
            .unwrap_or_default())
    }

    pub async fn create_withdraw(&self, user_id: UserId, order_number: &str, sum: Points) -> Result<Transaction> {
        self.withdrawals.create_withdraw(user_id, order_number, sum).await
    }

    pub async fn list_withdrawals(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        self.transactions.withdrawals(user_id).await
    }
}

fn upload_conflict(existing: &Accrual, user_id: UserId) -> Error {
    if existing.user_id == user_id {
        Error::OrderAlreadyUploaded(existing.order_number.clone())
    } else {
        Error::OrderOwnedByAnotherUser(existing.order_number.clone())
    }
}
