use async_trait::async_trait;
use crate::error::Result;
use crate::model::accrual::Accrual;
use crate::types::ids::UserId;
use crate::types::order_number::OrderNumber;

#[async_trait]
pub trait AccrualStore: Send + Sync {
    async fn accrual_by_order_number(&self, order_number: &OrderNumber) -> Result<Option<Accrual>>;
    /// Newest upload first.
    async fn accruals_by_user(&self, user_id: UserId) -> Result<Vec<Accrual>>;
    /// Orders still New or Processing.
    async fn accruals_in_work(&self) -> Result<Vec<Accrual>>;
    /// Fails with `OrderAlreadyUploaded` when the order number is taken.
    async fn insert_accrual(&self, accrual: &Accrual) -> Result<()>;
}
