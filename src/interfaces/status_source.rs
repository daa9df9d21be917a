use async_trait::async_trait;
use crate::accrual_service::AccrualResponse;
use crate::error::Result;
use crate::types::order_number::OrderNumber;

/// Authoritative source of order processing status.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn order_status(&self, order_number: &OrderNumber) -> Result<AccrualResponse>;
}
