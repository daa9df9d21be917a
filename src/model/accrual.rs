use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::{Error, Result};
use crate::types::ids::UserId;
use crate::types::order_number::OrderNumber;
use crate::types::points::Points;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    New,
    Processing,
    Invalid,
    Processed,
}

impl AccrualStatus {
    pub const IN_WORK: [AccrualStatus; 2] = [AccrualStatus::New, AccrualStatus::Processing];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccrualStatus::New => "NEW",
            AccrualStatus::Processing => "PROCESSING",
            AccrualStatus::Invalid => "INVALID",
            AccrualStatus::Processed => "PROCESSED",
        }
    }

    pub fn from_db(value: &str) -> Result<Self> {
        match value {
            "NEW" => Ok(AccrualStatus::New),
            "PROCESSING" => Ok(AccrualStatus::Processing),
            "INVALID" => Ok(AccrualStatus::Invalid),
            "PROCESSED" => Ok(AccrualStatus::Processed),
            other => Err(Error::CorruptedRecord(format!("accrual status {:?}", other))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AccrualStatus::Invalid | AccrualStatus::Processed)
    }

    fn rank(&self) -> u8 {
        match self {
            AccrualStatus::New => 0,
            AccrualStatus::Processing => 1,
            AccrualStatus::Invalid | AccrualStatus::Processed => 2,
        }
    }

    /// Status only moves forward: New -> Processing -> {Invalid | Processed}.
    pub fn can_advance_to(&self, next: AccrualStatus) -> bool {
        next.rank() > self.rank()
    }

    /// Statuses an order may hold right before moving to `self`.
    pub fn predecessors(&self) -> Vec<AccrualStatus> {
        [AccrualStatus::New, AccrualStatus::Processing]
            .into_iter()
            .filter(|s| s.can_advance_to(*self))
            .collect()
    }
}

impl fmt::Display for AccrualStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccrualStatus::New => "New",
            AccrualStatus::Processing => "Processing",
            AccrualStatus::Invalid => "Invalid",
            AccrualStatus::Processed => "Processed",
        };
        f.write_str(name)
    }
}

/// An uploaded order and its reconciliation state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Accrual {
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub status: AccrualStatus,
    pub accrual: Points,
    pub uploaded_at: DateTime<Utc>,
}

impl Accrual {
    pub fn new(order_number: OrderNumber, user_id: UserId) -> Self {
        Accrual {
            order_number,
            user_id,
            status: AccrualStatus::New,
            accrual: Points::zero(),
            uploaded_at: Utc::now(),
        }
    }

    pub fn is_in_work(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_monotone() {
        use AccrualStatus::*;

        assert!(New.can_advance_to(Processing));
        assert!(New.can_advance_to(Processed));
        assert!(Processing.can_advance_to(Invalid));
        assert!(!Processing.can_advance_to(New));
        assert!(!Processed.can_advance_to(Invalid));
        assert!(!Invalid.can_advance_to(Processed));
        assert!(!New.can_advance_to(New));
    }

    #[test]
    fn predecessors_follow_rank() {
        use AccrualStatus::*;

        assert_eq!(Processed.predecessors(), vec![New, Processing]);
        assert_eq!(Processing.predecessors(), vec![New]);
        assert!(New.predecessors().is_empty());
    }

    #[test]
    fn db_round_trip_rejects_garbage() {
        for status in [AccrualStatus::New, AccrualStatus::Processing, AccrualStatus::Invalid, AccrualStatus::Processed] {
            assert_eq!(AccrualStatus::from_db(status.as_str()).unwrap(), status);
        }
        assert!(AccrualStatus::from_db("processed").is_err());
    }
}
