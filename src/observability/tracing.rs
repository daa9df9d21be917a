use tracing::Span;
use tracing_subscriber::EnvFilter;
use crate::config::LogConfig;
use crate::error::{Error, Result};
use crate::types::ids::PassId;
use crate::types::order_number::OrderNumber;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::ConfigError(format!("invalid log level {:?}: {}", config.level, e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| Error::ConfigError(format!("tracing subscriber: {}", e)))
}

pub fn trace_reconcile_pass(pass_id: &PassId, orders: usize) -> Span {
    tracing::info_span!(
        "reconcile_pass",
        pass_id = %pass_id,
        orders,
    )
}

pub fn trace_reconcile_order(order_number: &OrderNumber) -> Span {
    tracing::info_span!(
        "reconcile_order",
        order_number = %order_number,
    )
}
