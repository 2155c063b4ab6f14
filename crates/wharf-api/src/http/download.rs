//! Archive download handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, header},
    response::Response,
};
use tracing::info;

use crate::app::state::ApiState;
use crate::http::errors::ApiError;
use crate::http::negotiate::negotiate_format;
use crate::models::DownloadRequest;

/// Stream one or many paths as a tar, tar.gz, or multipart/mixed body.
///
/// Every requested path is validated before the stream starts; a mid-walk
/// failure aborts the body instead of silently truncating the archive.
pub(crate) async fn download_files(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(request): Json<DownloadRequest>,
) -> Result<Response, ApiError> {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok());
    let format = negotiate_format(request.format.as_deref(), accept)?;
    let stream = state.transfer.build_archive(&request.paths, format).await?;

    info!(
        paths = request.paths.len(),
        format = format.as_str(),
        "archive download started"
    );

    let mut builder = Response::builder().header(header::CONTENT_TYPE, stream.content_type());
    if let Some(name) = stream.attachment_name() {
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        );
    }
    builder
        .body(Body::from_stream(stream.into_stream()))
        .map_err(|_| ApiError::internal("failed to build archive response"))
}
