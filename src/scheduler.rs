use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use crate::config::ReconcilerConfig;
use crate::reconciler::{Outcome, Reconciler};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Fixed-interval driver for reconciliation passes.
///
/// Passes never overlap: each one is awaited inside the loop and ticks missed
/// meanwhile are skipped. A failed pass is logged and the next tick proceeds.
/// The scheduler owns the last outcome sender, so the channel closes once
/// `run` returns.
pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    interval: Duration,
    max_backoff: Duration,
    outcomes: mpsc::Sender<Outcome>,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    pub fn new(reconciler: Arc<Reconciler>, config: &ReconcilerConfig, outcomes: mpsc::Sender<Outcome>) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Scheduler {
            reconciler,
            interval: config.interval(),
            max_backoff: config.max_rate_limit_backoff(),
            outcomes,
            state,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Watch state changes; the last value stays readable after `run` returns.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    pub async fn run(self, cancel: CancellationToken) {
        self.state.send_replace(SchedulerState::Running);
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Scheduler started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.reconciler.run_once(&cancel, &self.outcomes).await {
                Ok(summary) => {
                    let Some(requested) = summary.rate_limited_for else { continue };
                    let pause = requested.min(self.max_backoff);
                    tracing::warn!(
                        requested_ms = requested.as_millis() as u64,
                        pause_ms = pause.as_millis() as u64,
                        "Accrual service rate limit hit, pausing reconciliation"
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(pause) => ticker.reset(),
                    }
                }
                Err(e) if e.is_cancelled() => break,
                Err(e) => tracing::error!(error = %e, "Reconciliation pass failed"),
            }
        }

        self.state.send_replace(SchedulerState::Stopped);
        tracing::info!("Scheduler stopped");
    }
}
