use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use loyalty_ledger::accrual_service::AccrualClient;
use loyalty_ledger::api::rest;
use loyalty_ledger::config::AppConfig;
use loyalty_ledger::interfaces::accrual_store::AccrualStore;
use loyalty_ledger::interfaces::ledger_writer::LedgerWriter;
use loyalty_ledger::ledger::{MemoryStore, PgStore};
use loyalty_ledger::observability::{metrics, tracing::init_tracing};
use loyalty_ledger::reconciler::Reconciler;
use loyalty_ledger::reporter::Reporter;
use loyalty_ledger::scheduler::Scheduler;
use loyalty_ledger::utils::task_supervisor::TaskSupervisor;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("LOYALTY_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env).context("loading configuration")?;

    init_tracing(&config.log)?;
    metrics::register_metrics()?;
    tracing::info!(env = %env, "Starting loyalty ledger");

    let (accruals, ledger) = open_store(&config).await?;
    let source = Arc::new(AccrualClient::new(&config.accrual)?);
    let reconciler = Arc::new(Reconciler::new(accruals, ledger, source, &config.reconciler));

    let (outcome_tx, outcome_rx) = mpsc::channel(config.reconciler.outcome_buffer);
    let scheduler = Scheduler::new(reconciler, &config.reconciler, outcome_tx);
    let reporter = Reporter::new(outcome_rx);

    let cancel = CancellationToken::new();
    let mut supervisor = TaskSupervisor::new();
    supervisor.spawn("scheduler", scheduler.run(cancel.clone()));
    supervisor.spawn("reporter", async move {
        reporter.run().await;
    });

    let listen_addr = config.server.listen_addr.clone();
    let http_cancel = cancel.clone();
    supervisor.spawn("http", async move {
        if let Err(e) = rest::serve(&listen_addr, http_cancel).await {
            tracing::error!(error = %e, "HTTP server failed");
        }
    });

    let mut health = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    let failure = loop {
        tokio::select! {
            _ = shutdown_signal() => break None,
            _ = health.tick() => {
                if let Err(e) = supervisor.check_health() {
                    break Some(e);
                }
            }
        }
    };

    tracing::info!("Shutting down");
    cancel.cancel();
    supervisor.shutdown(SHUTDOWN_GRACE).await;

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

async fn open_store(config: &AppConfig) -> anyhow::Result<(Arc<dyn AccrualStore>, Arc<dyn LedgerWriter>)> {
    if config.database.dsn.is_none() {
        tracing::warn!("database.dsn is not set, using the in-memory store");
        let store = Arc::new(MemoryStore::new());
        let accruals: Arc<dyn AccrualStore> = store.clone();
        let ledger: Arc<dyn LedgerWriter> = store;
        return Ok((accruals, ledger));
    }

    let store = Arc::new(PgStore::connect(&config.database).await.context("connecting to Postgres")?);
    if config.database.run_migrations {
        store.migrate().await.context("running migrations")?;
    }
    let accruals: Arc<dyn AccrualStore> = store.clone();
    let ledger: Arc<dyn LedgerWriter> = store;
    Ok((accruals, ledger))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
