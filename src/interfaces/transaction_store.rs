use async_trait::async_trait;
use crate::error::Result;
use crate::model::transaction::{Transaction, TransactionKind};
use crate::types::ids::UserId;

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Entries of `kind` for the account, newest first.
    async fn transactions(&self, account_guid: UserId, kind: TransactionKind) -> Result<Vec<Transaction>>;

    async fn withdrawals(&self, account_guid: UserId) -> Result<Vec<Transaction>> {
        self.transactions(account_guid, TransactionKind::Debit).await
    }
}
