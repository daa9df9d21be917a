use tokio::sync::mpsc;
use crate::observability::metrics::{ORDER_OUTCOMES, POINTS_CREDITED};
use crate::reconciler::Outcome;
use crate::types::points::Points;

/// Totals over every outcome the reporter consumed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportStats {
    pub credited: usize,
    pub status_updated: usize,
    pub failed: usize,
    pub points_credited: Points,
}

/// Single consumer of the outcome channel.
pub struct Reporter {
    outcomes: mpsc::Receiver<Outcome>,
    stats: ReportStats,
}

impl Reporter {
    pub fn new(outcomes: mpsc::Receiver<Outcome>) -> Self {
        Reporter {
            outcomes,
            stats: ReportStats::default(),
        }
    }

    /// Drain the channel until every sender is gone.
    pub async fn run(mut self) -> ReportStats {
        while let Some(outcome) = self.outcomes.recv().await {
            self.report(&outcome);
        }

        tracing::info!(
            credited = self.stats.credited,
            status_updated = self.stats.status_updated,
            failed = self.stats.failed,
            points_credited = %self.stats.points_credited,
            "Outcome channel closed"
        );
        self.stats
    }

    fn report(&mut self, outcome: &Outcome) {
        ORDER_OUTCOMES.with_label_values(&[outcome.label()]).inc();

        if let Some(error) = &outcome.error {
            self.stats.failed += 1;
            tracing::warn!(
                order_number = %outcome.order_number,
                user_id = %outcome.user_id,
                status = %outcome.previous_status,
                outcome = outcome.label(),
                error = %error,
                "Order reconciliation failed"
            );
            return;
        }

        if let Some(amount) = outcome.credited {
            self.stats.credited += 1;
            self.stats.points_credited += amount;
            POINTS_CREDITED.inc_by(amount.to_f64());
        } else {
            self.stats.status_updated += 1;
        }

        tracing::info!(
            order_number = %outcome.order_number,
            user_id = %outcome.user_id,
            from = %outcome.previous_status,
            to = ?outcome.new_status,
            accrual = ?outcome.new_accrual,
            "Order reconciled"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::accrual::{Accrual, AccrualStatus};
    use crate::types::ids::UserId;
    use crate::types::order_number::OrderNumber;

    fn accrual(number: &str) -> Accrual {
        Accrual::new(OrderNumber::parse(number).unwrap(), UserId::new())
    }

    #[tokio::test]
    async fn drains_until_senders_are_dropped() {
        let (tx, rx) = mpsc::channel(8);
        let reporter = tokio::spawn(Reporter::new(rx).run());

        let first = accrual("12345678903");
        let second = accrual("79927398713");
        tx.send(Outcome::credited(&first, AccrualStatus::Processed, Points::from_units(500))).await.unwrap();
        tx.send(Outcome::status_updated(&second, AccrualStatus::Processing)).await.unwrap();
        tx.send(Outcome::failed(&second, Error::OrderNotRegistered(second.order_number.clone()))).await.unwrap();
        drop(tx);

        let stats = reporter.await.unwrap();

        assert_eq!(stats, ReportStats {
            credited: 1,
            status_updated: 1,
            failed: 1,
            points_credited: Points::from_units(500),
        });
    }

    #[tokio::test]
    async fn closed_empty_channel_ends_immediately() {
        let (tx, rx) = mpsc::channel::<Outcome>(1);
        drop(tx);

        assert_eq!(Reporter::new(rx).run().await, ReportStats::default());
    }
}
