use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::ToSocketAddrs;

use crate::metrics::Metrics;

async fn export_metrics(State(metrics): State<Metrics>) -> Response {
    match metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, metrics.content_type())],
            body,
        )
            .into_response(),
        Err(err) => {
            log::error!("Failed to encode metrics: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}

/// Serves the discovery metrics over HTTP.
pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    pub fn new(metrics: Metrics) -> Self {
        let router = axum::Router::new()
            .route("/metrics", get(export_metrics))
            .with_state(metrics);
        Self { router }
    }

    /// Binds `addr` and serves until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from binding or serving.
    pub async fn listen(self, addr: impl ToSocketAddrs) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("Serving metrics on {}", listener.local_addr()?);
        axum::serve(listener, self.router.into_make_service()).await
    }
}
