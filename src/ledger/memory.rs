use std::collections::HashMap;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use crate::error::{Error, Result};
use crate::interfaces::account_store::AccountStore;
use crate::interfaces::accrual_store::AccrualStore;
use crate::interfaces::ledger_writer::{CreditRequest, DebitRequest, LedgerWriter};
use crate::interfaces::transaction_store::TransactionStore;
use crate::model::account::Account;
use crate::model::accrual::{Accrual, AccrualStatus};
use crate::model::transaction::{Transaction, TransactionKind};
use crate::types::ids::UserId;
use crate::types::order_number::OrderNumber;
use crate::types::points::Points;

#[derive(Default)]
struct State {
    accruals: HashMap<OrderNumber, Accrual>,
    accounts: HashMap<UserId, Account>,
    transactions: Vec<Transaction>,
}

impl State {
    /// Mirrors the status-guarded UPDATE of the Postgres store.
    fn check_advance(&self, order_number: &OrderNumber, status: AccrualStatus) -> Result<()> {
        let accrual = self.accruals.get(order_number)
            .ok_or_else(|| Error::OrderNotFound(order_number.clone()))?;

        if !accrual.status.can_advance_to(status) {
            return Err(Error::OrderAlreadyFinalized(order_number.clone()));
        }
        Ok(())
    }

    fn has_credit(&self, order_number: &OrderNumber) -> bool {
        self.transactions.iter().any(|t| {
            t.kind == TransactionKind::Credit && t.order_number.as_ref() == Some(order_number)
        })
    }
}

/// Store kept entirely in process memory.
///
/// One lock guards all tables, so every ledger operation is serialized and
/// either applies completely or not at all. Enforces the same guards as
/// `PgStore`.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every ledger entry, oldest first.
    pub async fn all_transactions(&self) -> Vec<Transaction> {
        self.state.lock().await.transactions.clone()
    }
}

#[async_trait]
impl AccrualStore for MemoryStore {
    async fn accrual_by_order_number(&self, order_number: &OrderNumber) -> Result<Option<Accrual>> {
        Ok(self.state.lock().await.accruals.get(order_number).cloned())
    }

    async fn accruals_by_user(&self, user_id: UserId) -> Result<Vec<Accrual>> {
        let state = self.state.lock().await;
        let mut accruals: Vec<Accrual> = state.accruals.values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        accruals.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(accruals)
    }

    async fn accruals_in_work(&self) -> Result<Vec<Accrual>> {
        let state = self.state.lock().await;
        let mut accruals: Vec<Accrual> = state.accruals.values()
            .filter(|a| a.is_in_work())
            .cloned()
            .collect();
        accruals.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(accruals)
    }

    async fn insert_accrual(&self, accrual: &Accrual) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.accruals.contains_key(&accrual.order_number) {
            return Err(Error::OrderAlreadyUploaded(accrual.order_number.clone()));
        }
        state.accruals.insert(accrual.order_number.clone(), accrual.clone());
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn account(&self, guid: UserId) -> Result<Option<Account>> {
        Ok(self.state.lock().await.accounts.get(&guid).cloned())
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn transactions(&self, account_guid: UserId, kind: TransactionKind) -> Result<Vec<Transaction>> {
        let state = self.state.lock().await;
        Ok(state.transactions.iter()
            .rev()
            .filter(|t| t.account_guid == account_guid && t.kind == kind)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LedgerWriter for MemoryStore {
    async fn credit(&self, request: &CreditRequest) -> Result<Transaction> {
        if !request.amount.is_positive() {
            return Err(Error::InvalidSum(request.amount));
        }

        let mut state = self.state.lock().await;
        state.check_advance(&request.order_number, request.status)?;
        if state.has_credit(&request.order_number) {
            return Err(Error::OrderAlreadyFinalized(request.order_number.clone()));
        }

        let current = state.accounts.get(&request.user_id)
            .map(|a| a.balance)
            .unwrap_or_default();
        let balance = current.checked_add(request.amount)
            .ok_or(Error::InvalidSum(request.amount))?;

        // All checks passed; apply the three writes together.
        if let Some(accrual) = state.accruals.get_mut(&request.order_number) {
            accrual.status = request.status;
            accrual.accrual = request.amount;
        }

        let account = state.accounts.entry(request.user_id)
            .or_insert_with(|| Account::new(request.user_id));
        account.balance = balance;
        account.updated_at = Utc::now();

        let transaction = Transaction::credit(request.user_id, request.order_number.clone(), request.amount);
        state.transactions.push(transaction.clone());

        Ok(transaction)
    }

    async fn debit(&self, request: &DebitRequest) -> Result<Transaction> {
        if !request.amount.is_positive() {
            return Err(Error::InvalidSum(request.amount));
        }

        let mut state = self.state.lock().await;
        let available = state.accounts.get(&request.account_guid)
            .map(|a| a.balance)
            .unwrap_or_default();

        if available < request.amount {
            return Err(Error::InsufficientBalance {
                requested: request.amount,
                available,
            });
        }

        // A positive amount within the balance implies the account exists.
        let account = state.accounts.entry(request.account_guid)
            .or_insert_with(|| Account::new(request.account_guid));
        let withdrawn = account.withdrawn_sum.checked_add(request.amount)
            .ok_or(Error::InvalidSum(request.amount))?;
        account.balance = Points::from_raw(available.raw_value() - request.amount.raw_value());
        account.withdrawn_sum = withdrawn;
        account.updated_at = Utc::now();

        let transaction = Transaction::debit(request.account_guid, request.order_number.clone(), request.amount);
        state.transactions.push(transaction.clone());

        Ok(transaction)
    }

    async fn update_status(&self, order_number: &OrderNumber, status: AccrualStatus) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_advance(order_number, status)?;

        if let Some(accrual) = state.accruals.get_mut(order_number) {
            accrual.status = status;
        }
        Ok(())
    }
}
