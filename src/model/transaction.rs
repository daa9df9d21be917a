use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::types::ids::{TransactionId, UserId};
use crate::types::order_number::OrderNumber;
use crate::types::points::Points;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "CREDIT",
            TransactionKind::Debit => "DEBIT",
        }
    }

    pub fn from_db(value: &str) -> Result<Self> {
        match value {
            "CREDIT" => Ok(TransactionKind::Credit),
            "DEBIT" => Ok(TransactionKind::Debit),
            other => Err(Error::CorruptedRecord(format!("transaction type {:?}", other))),
        }
    }
}

/// Append-only ledger entry. `sum` is always positive; `kind` carries the sign.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub guid: TransactionId,
    pub account_guid: UserId,
    pub order_number: Option<OrderNumber>,
    pub kind: TransactionKind,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

impl Transaction {
    pub fn credit(account_guid: UserId, order_number: OrderNumber, sum: Points) -> Self {
        Transaction {
            guid: TransactionId::new(),
            account_guid,
            order_number: Some(order_number),
            kind: TransactionKind::Credit,
            sum,
            processed_at: Utc::now(),
        }
    }

    pub fn debit(account_guid: UserId, order_number: Option<OrderNumber>, sum: Points) -> Self {
        Transaction {
            guid: TransactionId::new(),
            account_guid,
            order_number,
            kind: TransactionKind::Debit,
            sum,
            processed_at: Utc::now(),
        }
    }
}
