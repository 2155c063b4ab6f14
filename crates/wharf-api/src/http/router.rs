//! Router construction and server host for the gateway API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, Method, Request, header::CONTENT_TYPE},
    routing::{get, post},
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::app::state::ApiState;
use crate::http::constants::{HEADER_FILE_PATH, HEADER_REQUEST_ID};
use crate::http::download::download_files;
use crate::http::files::{
    delete_file, list_files, make_directory, move_file, read_file, rename_file, stat_file,
};
use crate::http::health::{health, metrics};
use crate::http::telemetry::HttpMetricsLayer;
use crate::http::upload::{batch_upload, write_file};
use wharf_config::GatewayProfile;
use wharf_telemetry::{Metrics, build_sha};
use wharf_transfer::TransferService;

/// Errors raised while hosting the API server.
#[derive(Debug, Error)]
pub enum ApiServerError {
    /// Binding the TCP listener failed.
    #[error("api listener bind failed")]
    Bind {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Serving the router terminated unexpectedly.
    #[error("api serve failed")]
    Serve {
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Axum router wrapper that hosts the Wharf gateway services.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct a new API server with shared dependencies wired through
    /// application state.
    #[must_use]
    pub fn new(profile: GatewayProfile, transfer: TransferService, telemetry: Metrics) -> Self {
        let state = Arc::new(ApiState::new(profile, transfer, telemetry.clone()));

        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                CONTENT_TYPE,
                HeaderName::from_static(HEADER_FILE_PATH),
                HeaderName::from_static(HEADER_REQUEST_ID),
            ]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let method = request.method().clone();
                let uri_path = request.uri().path();
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                tracing::info_span!(
                    "http.request",
                    method = %method,
                    route = %uri_path,
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    let status = response.status().as_u16();
                    span.record("status_code", status);
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(wharf_telemetry::propagate_request_id_layer())
            .layer(wharf_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Self::build_router()
            .layer(DefaultBodyLimit::disable())
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    fn build_router() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route("/v1/files", get(read_file).post(write_file))
            .route("/v1/files/list", get(list_files))
            .route("/v1/files/stat", get(stat_file))
            .route("/v1/files/delete", post(delete_file))
            .route("/v1/files/move", post(move_file))
            .route("/v1/files/rename", post(rename_file))
            .route("/v1/files/mkdir", post(make_directory))
            .route("/v1/files/download", post(download_files))
            .route("/v1/files/upload", post(batch_upload))
    }

    /// Serve the API using the configured router on the supplied address.
    ///
    /// Shuts down gracefully on ctrl-c.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server
    /// terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> Result<(), ApiServerError> {
        tracing::info!("Starting gateway API on {}", addr);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|source| ApiServerError::Serve { source })?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to install ctrl-c handler");
    }
}
