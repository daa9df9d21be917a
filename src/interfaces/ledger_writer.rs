use async_trait::async_trait;
use crate::error::Result;
use crate::model::accrual::AccrualStatus;
use crate::model::transaction::Transaction;
use crate::types::ids::UserId;
use crate::types::order_number::OrderNumber;
use crate::types::points::Points;

#[derive(Clone, Debug, PartialEq)]
pub struct CreditRequest {
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub status: AccrualStatus,
    pub amount: Points,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DebitRequest {
    pub account_guid: UserId,
    pub order_number: Option<OrderNumber>,
    pub amount: Points,
}

/// Atomic multi-row ledger mutations. Every operation commits entirely or
/// leaves no trace.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Moves the order to `status` with `amount` awarded, adds `amount` to the
    /// owner's balance (creating the account if needed) and appends a Credit
    /// entry. Fails with `OrderAlreadyFinalized` when the order is no longer in
    /// a predecessor status of `status`, so replays never credit twice.
    async fn credit(&self, request: &CreditRequest) -> Result<Transaction>;

    /// Subtracts `amount` from the balance, adds it to the withdrawn sum and
    /// appends a Debit entry. Fails with `InsufficientBalance` when the balance
    /// is lower than `amount` at write time.
    async fn debit(&self, request: &DebitRequest) -> Result<Transaction>;

    /// Status change without a ledger entry, guarded like `credit`.
    async fn update_status(&self, order_number: &OrderNumber, status: AccrualStatus) -> Result<()>;
}
