use std::time::Duration;
use thiserror::Error;
use crate::model::accrual::AccrualStatus;
use crate::types::ids::UserId;
use crate::types::order_number::OrderNumber;
use crate::types::points::Points;

#[derive(Error, Debug)]
pub enum Error {
    // Validation Errors
    #[error("Invalid order number: {0:?}")]
    InvalidOrderNumber(String),

    #[error("Invalid sum: {0}")]
    InvalidSum(Points),

    // Conflict Errors
    #[error("Order {0} was already uploaded by another user")]
    OrderOwnedByAnotherUser(OrderNumber),

    #[error("Order {0} was already uploaded")]
    OrderAlreadyUploaded(OrderNumber),

    // Balance Errors
    #[error("Insufficient balance: requested={requested}, available={available}")]
    InsufficientBalance {
        requested: Points,
        available: Points,
    },

    // Accrual Service Errors
    #[error("Order {0} is not registered in the accrual service")]
    OrderNotRegistered(OrderNumber),

    #[error("Accrual service rate limit exceeded for order {order}")]
    RateLimited {
        order: OrderNumber,
        retry_after: Option<Duration>,
    },

    #[error("Accrual service answered {status} for order {order}")]
    UnknownStatusCode {
        order: OrderNumber,
        status: u16,
    },

    #[error("Accrual service transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Accrual service response decoding failed: {0}")]
    Decode(String),

    // Mapping Errors
    #[error("Unknown accrual status: {0:?}")]
    UnknownAccrualStatus(String),

    // Ledger Errors
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: AccrualStatus,
        to: AccrualStatus,
    },

    #[error("Order {0} is already finalized")]
    OrderAlreadyFinalized(OrderNumber),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderNumber),

    #[error("Ledger mismatch for account {account}: expected={expected}, actual={actual}")]
    LedgerMismatch {
        account: UserId,
        expected: Points,
        actual: Points,
    },

    // Persistence Errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // System Errors
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Corrupted record: {0}")]
    CorruptedRecord(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    // IO Errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classes used by inbound collaborators to pick a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    InsufficientBalance,
    ExternalService,
    Mapping,
    Persistence,
    Cancelled,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidOrderNumber(_) | Error::InvalidSum(_) => ErrorKind::Validation,
            Error::OrderOwnedByAnotherUser(_)
            | Error::OrderAlreadyUploaded(_)
            | Error::InvalidTransition { .. }
            | Error::OrderAlreadyFinalized(_) => ErrorKind::Conflict,
            Error::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Error::OrderNotRegistered(_)
            | Error::RateLimited { .. }
            | Error::UnknownStatusCode { .. }
            | Error::Transport(_)
            | Error::Decode(_) => ErrorKind::ExternalService,
            Error::UnknownAccrualStatus(_) => ErrorKind::Mapping,
            Error::Database(_) | Error::Migration(_) | Error::OrderNotFound(_) => {
                ErrorKind::Persistence
            }
            Error::Cancelled => ErrorKind::Cancelled,
            Error::LedgerMismatch { .. }
            | Error::ConfigError(_)
            | Error::CorruptedRecord(_)
            | Error::TaskFailed(_)
            | Error::IoError(_) => ErrorKind::Internal,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Postgres unique-constraint violation (SQLSTATE 23505).
    pub(crate) fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_business_errors() {
        let order = OrderNumber::parse("12345678903").unwrap();

        assert_eq!(Error::InvalidSum(Points::zero()).kind(), ErrorKind::Validation);
        assert_eq!(Error::OrderAlreadyUploaded(order.clone()).kind(), ErrorKind::Conflict);
        assert_eq!(
            Error::InsufficientBalance { requested: Points::from_units(2), available: Points::from_units(1) }.kind(),
            ErrorKind::InsufficientBalance
        );
        assert_eq!(Error::OrderNotRegistered(order).kind(), ErrorKind::ExternalService);
        assert_eq!(Error::UnknownAccrualStatus("FOO".into()).kind(), ErrorKind::Mapping);
        assert!(Error::Cancelled.is_cancelled());
    }
}
