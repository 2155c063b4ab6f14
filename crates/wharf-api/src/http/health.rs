//! Health and diagnostics endpoints.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::header,
    response::Response,
};
use serde::Serialize;
use tracing::warn;

use crate::app::state::ApiState;
use crate::http::errors::ApiError;
use wharf_telemetry::{MetricsSnapshot, build_sha};

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) instance: String,
    pub(crate) build: String,
    pub(crate) workspace_root: String,
    pub(crate) degraded: Vec<String>,
    pub(crate) metrics: MetricsSnapshot,
}

pub(crate) async fn health(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    match tokio::fs::metadata(&state.profile.workspace_root).await {
        Ok(metadata) if metadata.is_dir() => {
            state.remove_degraded_component("workspace");
            Ok(Json(HealthResponse {
                status: "ok",
                instance: state.profile.instance_name.clone(),
                build: build_sha().to_string(),
                workspace_root: state.profile.workspace_root.display().to_string(),
                degraded: state.current_health_degraded(),
                metrics: state.telemetry.snapshot(),
            }))
        }
        Ok(_) | Err(_) => {
            state.add_degraded_component("workspace");
            warn!("health check failed to stat the workspace root");
            Err(ApiError::service_unavailable(
                "workspace root is currently unavailable",
            ))
        }
    }
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    let rendered = state
        .telemetry
        .render()
        .map_err(|_| ApiError::internal("failed to render metrics"))?;
    Response::builder()
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(rendered))
        .map_err(|_| ApiError::internal("failed to build metrics response"))
}
