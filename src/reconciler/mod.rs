pub mod outcome;

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use crate::accrual_service::map_status;
use crate::config::ReconcilerConfig;
use crate::error::{Error, Result};
use crate::interfaces::accrual_store::AccrualStore;
use crate::interfaces::ledger_writer::{CreditRequest, LedgerWriter};
use crate::interfaces::status_source::StatusSource;
use crate::model::accrual::{Accrual, AccrualStatus};
use crate::observability::metrics::{RECONCILE_PASSES, RECONCILE_PASS_FAILURES, RECONCILE_PASS_LATENCY};
use crate::observability::tracing::{trace_reconcile_order, trace_reconcile_pass};
use crate::types::ids::PassId;

pub use outcome::{Outcome, PassSummary};

/// Drives in-flight orders towards the status reported by the accrual service.
///
/// ## Pass
/// 1. Load every order still New or Processing.
/// 2. Spawn one task per order; a semaphore caps how many run at once.
/// 3. Each task asks the `StatusSource`, maps the answer and, when the status
///    moved forward, writes through the `LedgerWriter`.
/// 4. Outcomes are forwarded to the channel as tasks finish, in completion order.
///
/// A failing order never aborts the pass. Cancelling the token aborts every
/// in-flight task and the pass returns `Error::Cancelled`; writes already
/// committed stay committed.
pub struct Reconciler {
    accruals: Arc<dyn AccrualStore>,
    pipeline: OrderPipeline,
    limiter: Arc<Semaphore>,
}

#[derive(Clone)]
struct OrderPipeline {
    ledger: Arc<dyn LedgerWriter>,
    source: Arc<dyn StatusSource>,
}

impl Reconciler {
    pub fn new(
        accruals: Arc<dyn AccrualStore>,
        ledger: Arc<dyn LedgerWriter>,
        source: Arc<dyn StatusSource>,
        config: &ReconcilerConfig,
    ) -> Self {
        Reconciler {
            accruals,
            pipeline: OrderPipeline { ledger, source },
            limiter: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
        }
    }

    pub async fn run_once(
        &self,
        cancel: &CancellationToken,
        outcomes: &mpsc::Sender<Outcome>,
    ) -> Result<PassSummary> {
        RECONCILE_PASSES.inc();
        let _timer = RECONCILE_PASS_LATENCY.start_timer();

        let in_work = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            listed = self.accruals.accruals_in_work() => listed.inspect_err(|_| RECONCILE_PASS_FAILURES.inc())?,
        };

        let pass_id = PassId::new();
        let span = trace_reconcile_pass(&pass_id, in_work.len());
        self.fan_out(PassSummary::new(pass_id, in_work.len()), in_work, cancel, outcomes)
            .instrument(span)
            .await
    }

    async fn fan_out(
        &self,
        mut summary: PassSummary,
        in_work: Vec<Accrual>,
        cancel: &CancellationToken,
        outcomes: &mpsc::Sender<Outcome>,
    ) -> Result<PassSummary> {
        let mut tasks = JoinSet::new();
        for accrual in in_work {
            let pipeline = self.pipeline.clone();
            let limiter = self.limiter.clone();
            let span = trace_reconcile_order(&accrual.order_number);

            tasks.spawn(
                async move {
                    let _permit = limiter.acquire_owned().await.ok()?;
                    pipeline.reconcile(accrual).await
                }
                .instrument(span),
            );
        }

        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    tracing::debug!("Reconciliation pass cancelled");
                    return Err(Error::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };

            let Some(joined) = joined else { break };
            match joined {
                Ok(Some(outcome)) => {
                    summary.record(&outcome);
                    if outcomes.send(outcome).await.is_err() {
                        tracing::warn!("Outcome receiver dropped, outcome discarded");
                    }
                }
                Ok(None) => summary.unchanged += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(error = %e, "Reconciliation task panicked");
                }
            }
        }

        tracing::debug!(
            credited = summary.credited,
            status_updated = summary.status_updated,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "Reconciliation pass finished"
        );
        Ok(summary)
    }
}

impl OrderPipeline {
    /// Resolver -> mapper -> ledger for one order. `None` when nothing changed.
    async fn reconcile(&self, accrual: Accrual) -> Option<Outcome> {
        let response = match self.source.order_status(&accrual.order_number).await {
            Ok(response) => response,
            Err(e) => return Some(Outcome::failed(&accrual, e)),
        };

        let status = match map_status(&response.status) {
            Ok(status) => status,
            Err(e) => return Some(Outcome::failed(&accrual, e)),
        };

        if status == accrual.status {
            return None;
        }

        if !accrual.status.can_advance_to(status) {
            return Some(Outcome::failed(
                &accrual,
                Error::InvalidTransition { from: accrual.status, to: status },
            ));
        }

        let awarded = response.awarded();
        if awarded.is_negative() {
            return Some(Outcome::failed(&accrual, Error::InvalidSum(awarded)));
        }

        if status == AccrualStatus::Processed && awarded.is_positive() {
            let request = CreditRequest {
                order_number: accrual.order_number.clone(),
                user_id: accrual.user_id,
                status,
                amount: awarded,
            };
            return Some(match self.ledger.credit(&request).await {
                Ok(_) => Outcome::credited(&accrual, status, awarded),
                Err(e) => Outcome::failed(&accrual, e),
            });
        }

        Some(match self.ledger.update_status(&accrual.order_number, status).await {
            Ok(()) => Outcome::status_updated(&accrual, status),
            Err(e) => Outcome::failed(&accrual, e),
        })
    }
}
