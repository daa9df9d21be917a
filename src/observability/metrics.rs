use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use crate::error::{Error, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Reconciliation metrics
    pub static ref RECONCILE_PASSES: IntCounter = IntCounter::new(
        "reconcile_passes_total",
        "Total number of reconciliation passes started"
    ).expect("valid metric");

    pub static ref RECONCILE_PASS_FAILURES: IntCounter = IntCounter::new(
        "reconcile_pass_failures_total",
        "Reconciliation passes aborted before fan-out"
    ).expect("valid metric");

    pub static ref ORDER_OUTCOMES: IntCounterVec = IntCounterVec::new(
        Opts::new("reconcile_order_outcomes_total", "Per-order reconciliation outcomes"),
        &["outcome"]
    ).expect("valid metric");

    pub static ref POINTS_CREDITED: Counter = Counter::new(
        "points_credited_total",
        "Total points credited to accounts"
    ).expect("valid metric");

    // Withdrawal metrics
    pub static ref POINTS_WITHDRAWN: Counter = Counter::new(
        "points_withdrawn_total",
        "Total points debited by withdrawals"
    ).expect("valid metric");

    pub static ref WITHDRAWALS_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("withdrawals_rejected_total", "Withdrawals refused, by reason"),
        &["reason"]
    ).expect("valid metric");

    // Latency metrics
    pub static ref RECONCILE_PASS_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "reconcile_pass_latency_seconds",
            "Duration of one reconciliation pass"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])
    ).expect("valid metric");
}

pub fn register_metrics() -> Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(RECONCILE_PASSES.clone()),
        Box::new(RECONCILE_PASS_FAILURES.clone()),
        Box::new(ORDER_OUTCOMES.clone()),
        Box::new(POINTS_CREDITED.clone()),
        Box::new(POINTS_WITHDRAWN.clone()),
        Box::new(WITHDRAWALS_REJECTED.clone()),
        Box::new(RECONCILE_PASS_LATENCY.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(Error::ConfigError(format!("metrics registration: {}", e))),
        }
    }
    Ok(())
}

/// Prometheus text exposition of everything in `REGISTRY`.
pub fn render() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| Error::ConfigError(format!("metrics encoding: {}", e)))?;

    String::from_utf8(buffer).map_err(|e| Error::ConfigError(e.to_string()))
}
