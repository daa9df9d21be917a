use axum::{
    Router,
    routing::get,
    http::{header, StatusCode},
    response::IntoResponse,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use crate::error::Result;
use crate::observability::metrics;

pub fn create_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn render_metrics() -> std::result::Result<impl IntoResponse, StatusCode> {
    let body = metrics::render().map_err(|e| {
        tracing::error!(error = %e, "Failed to render metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

/// Serve the operational endpoints until `cancel` fires.
pub async fn serve(listen_addr: &str, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, create_router())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::metrics::register_metrics;

    async fn spawn_router() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let base = spawn_router().await;

        let response = reqwest::get(format!("{}/health", base)).await.unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn metrics_are_exposed_as_text() {
        register_metrics().unwrap();
        metrics::RECONCILE_PASSES.inc();
        let base = spawn_router().await;

        let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response.text().await.unwrap().contains("reconcile_passes_total"));
    }

    #[tokio::test]
    async fn serve_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let server = tokio::spawn(serve("127.0.0.1:0", cancel.clone()));

        cancel.cancel();

        server.await.unwrap().unwrap();
    }
}
