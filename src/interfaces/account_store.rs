use async_trait::async_trait;
use crate::error::Result;
use crate::model::account::Account;
use crate::types::ids::UserId;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn account(&self, guid: UserId) -> Result<Option<Account>>;
}
