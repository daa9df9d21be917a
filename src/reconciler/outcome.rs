use std::time::Duration;
use crate::error::Error;
use crate::model::accrual::{Accrual, AccrualStatus};
use crate::types::ids::{PassId, UserId};
use crate::types::order_number::OrderNumber;
use crate::types::points::Points;

/// Result of reconciling one order within a pass.
#[derive(Debug)]
pub struct Outcome {
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub previous_status: AccrualStatus,
    pub previous_accrual: Points,
    pub new_status: Option<AccrualStatus>,
    pub new_accrual: Option<Points>,
    /// Points added to the balance by this outcome, if any.
    pub credited: Option<Points>,
    pub error: Option<Error>,
}

impl Outcome {
    pub fn failed(accrual: &Accrual, error: Error) -> Self {
        Outcome {
            order_number: accrual.order_number.clone(),
            user_id: accrual.user_id,
            previous_status: accrual.status,
            previous_accrual: accrual.accrual,
            new_status: None,
            new_accrual: None,
            credited: None,
            error: Some(error),
        }
    }

    pub fn status_updated(accrual: &Accrual, status: AccrualStatus) -> Self {
        Outcome {
            order_number: accrual.order_number.clone(),
            user_id: accrual.user_id,
            previous_status: accrual.status,
            previous_accrual: accrual.accrual,
            new_status: Some(status),
            new_accrual: Some(accrual.accrual),
            credited: None,
            error: None,
        }
    }

    pub fn credited(accrual: &Accrual, status: AccrualStatus, amount: Points) -> Self {
        Outcome {
            new_accrual: Some(amount),
            credited: Some(amount),
            ..Outcome::status_updated(accrual, status)
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Short label used for metrics and log filtering.
    pub fn label(&self) -> &'static str {
        match &self.error {
            None if self.credited.is_some() => "credited",
            None => "status_updated",
            Some(Error::OrderNotRegistered(_)) => "not_registered",
            Some(Error::RateLimited { .. }) => "rate_limited",
            Some(Error::UnknownAccrualStatus(_)) => "unknown_status",
            Some(Error::InvalidTransition { .. }) | Some(Error::OrderAlreadyFinalized(_)) => "conflict",
            Some(_) => "failed",
        }
    }
}

/// Counters for one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PassSummary {
    pub pass_id: PassId,
    pub orders: usize,
    pub credited: usize,
    pub status_updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub points_credited: Points,
    /// Longest pause the accrual service asked for through `Retry-After`.
    pub rate_limited_for: Option<Duration>,
}

impl PassSummary {
    pub fn new(pass_id: PassId, orders: usize) -> Self {
        PassSummary {
            pass_id,
            orders,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: &Outcome) {
        match (&outcome.error, outcome.credited) {
            (Some(Error::RateLimited { retry_after, .. }), _) => {
                self.failed += 1;
                if let Some(delay) = retry_after {
                    self.rate_limited_for = Some(self.rate_limited_for.map_or(*delay, |d| d.max(*delay)));
                }
            }
            (Some(_), _) => self.failed += 1,
            (None, Some(amount)) => {
                self.credited += 1;
                self.points_credited += amount;
            }
            (None, None) => self.status_updated += 1,
        }
    }
}
