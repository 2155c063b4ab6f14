//! Single-file read, listing, stat, and mutation handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Query, State},
    http::header,
    response::Response,
};
use chrono::Utc;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::app::state::ApiState;
use crate::http::errors::ApiError;
use crate::models::{
    DeleteRequest, DeleteResponse, ListResponse, MkdirRequest, MkdirResponse, MoveRequest,
    MoveResponse, RenameRequest, RenameResponse, StatResponse,
};
use wharf_transfer::{DEFAULT_LIST_LIMIT, ListOptions, truncate_to_seconds};

#[derive(Debug, Deserialize)]
pub(crate) struct PathQuery {
    pub(crate) path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListQuery {
    pub(crate) path: Option<String>,
    #[serde(default)]
    pub(crate) show_hidden: bool,
    pub(crate) limit: Option<usize>,
    pub(crate) offset: Option<usize>,
}

fn require_path(path: Option<String>) -> Result<String, ApiError> {
    path.filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("missing path parameter"))
}

pub(crate) async fn read_file(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    let path = require_path(query.path)?;
    let content = state.transfer.read_file(&path).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, content.mime)
        .header(header::CONTENT_LENGTH, content.size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", content.file_name),
        )
        .body(Body::from_stream(ReaderStream::new(content.file)))
        .map_err(|_| ApiError::internal("failed to build file response"))
}

pub(crate) async fn list_files(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let path = require_path(query.path)?;
    let options = ListOptions {
        show_hidden: query.show_hidden,
        limit: query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
        offset: query.offset.unwrap_or(0),
    };
    let listing = state.transfer.list_directory(&path, options).await?;
    Ok(Json(ListResponse {
        success: true,
        files: listing.files,
        count: listing.count,
    }))
}

pub(crate) async fn stat_file(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PathQuery>,
) -> Result<Json<StatResponse>, ApiError> {
    let path = require_path(query.path)?;
    let entry = state.transfer.stat_entry(&path).await?;
    Ok(Json(StatResponse {
        success: true,
        entry,
    }))
}

pub(crate) async fn delete_file(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let path = state.transfer.delete(&request.path, request.recursive).await?;
    info!(path = %path, recursive = request.recursive, "delete completed");
    Ok(Json(DeleteResponse {
        success: true,
        path,
        timestamp: truncate_to_seconds(Utc::now()),
    }))
}

pub(crate) async fn move_file(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, ApiError> {
    if request.source.trim().is_empty() || request.destination.trim().is_empty() {
        return Err(ApiError::bad_request(
            "source and destination are both required",
        ));
    }
    let (source, destination) = state
        .transfer
        .move_entry(&request.source, &request.destination, request.overwrite)
        .await?;
    info!(source = %source, destination = %destination, "move completed");
    Ok(Json(MoveResponse {
        success: true,
        source,
        destination,
        timestamp: truncate_to_seconds(Utc::now()),
    }))
}

pub(crate) async fn rename_file(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<RenameResponse>, ApiError> {
    if request.old_path.trim().is_empty() || request.new_path.trim().is_empty() {
        return Err(ApiError::bad_request("oldPath and newPath are both required"));
    }
    let (old_path, new_path) = state
        .transfer
        .rename_entry(&request.old_path, &request.new_path)
        .await?;
    info!(old_path = %old_path, new_path = %new_path, "rename completed");
    Ok(Json(RenameResponse {
        success: true,
        old_path,
        new_path,
        timestamp: truncate_to_seconds(Utc::now()),
    }))
}

pub(crate) async fn make_directory(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<MkdirRequest>,
) -> Result<Json<MkdirResponse>, ApiError> {
    let path = state.transfer.make_directory(&request.path).await?;
    Ok(Json(MkdirResponse {
        success: true,
        path,
        timestamp: truncate_to_seconds(Utc::now()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use axum::http::StatusCode;
    use wharf_config::GatewayProfile;
    use wharf_telemetry::Metrics;
    use wharf_test_support::TempWorkspace;
    use wharf_transfer::{TransferLimits, TransferService, WorkspaceRoot};

    fn test_state(workspace: &TempWorkspace) -> Result<Arc<ApiState>> {
        let profile = GatewayProfile::from_lookup(|name| match name {
            "WHARF_WORKSPACE_ROOT" => Some(workspace.root().display().to_string()),
            "WHARF_MAX_FILE_SIZE" => Some("4096".to_string()),
            _ => None,
        })?;
        let metrics = Metrics::new()?;
        let transfer = TransferService::new(
            WorkspaceRoot::open(workspace.root())?,
            TransferLimits::new(profile.max_file_size),
            metrics.clone(),
        );
        Ok(Arc::new(ApiState::new(profile, transfer, metrics)))
    }

    #[tokio::test]
    async fn read_file_sets_download_headers() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        workspace.write_file("report.txt", b"contents")?;
        let state = test_state(&workspace)?;

        let response = read_file(
            State(state),
            Query(PathQuery {
                path: Some("report.txt".to_string()),
            }),
        )
        .await
        .map_err(|err| anyhow!("unexpected error: {err:?}"))?;

        let headers = response.headers();
        assert_eq!(
            headers
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("text/plain")
        );
        assert_eq!(
            headers
                .get(header::CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok()),
            Some("8")
        );
        assert_eq!(
            headers
                .get(header::CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok()),
            Some("attachment; filename=\"report.txt\"")
        );
        Ok(())
    }

    #[tokio::test]
    async fn read_file_requires_a_path() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace)?;

        let err = read_file(State(state), Query(PathQuery { path: None }))
            .await
            .err()
            .ok_or_else(|| anyhow!("expected missing path rejection"))?;
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn list_files_applies_query_defaults() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        workspace.write_file("a.txt", b"x")?;
        workspace.write_file(".hidden", b"x")?;
        let state = test_state(&workspace)?;

        let Json(response) = list_files(
            State(state),
            Query(ListQuery {
                path: Some(".".to_string()),
                show_hidden: false,
                limit: None,
                offset: None,
            }),
        )
        .await
        .map_err(|err| anyhow!("unexpected error: {err:?}"))?;
        assert!(response.success);
        assert_eq!(response.count, 1);
        assert_eq!(response.files[0].name, "a.txt");
        Ok(())
    }

    #[tokio::test]
    async fn delete_missing_file_maps_to_not_found() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace)?;

        let err = delete_file(
            State(state),
            Json(DeleteRequest {
                path: "absent.txt".to_string(),
                recursive: false,
            }),
        )
        .await
        .err()
        .ok_or_else(|| anyhow!("expected not found"))?;
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn move_rejects_missing_fields() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace)?;

        let err = move_file(
            State(state),
            Json(MoveRequest {
                source: String::new(),
                destination: "dst.txt".to_string(),
                overwrite: false,
            }),
        )
        .await
        .err()
        .ok_or_else(|| anyhow!("expected missing field rejection"))?;
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn move_conflict_maps_to_bad_request() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        workspace.write_file("src.txt", b"source")?;
        workspace.write_file("dst.txt", b"destination")?;
        let state = test_state(&workspace)?;

        let err = move_file(
            State(state),
            Json(MoveRequest {
                source: "src.txt".to_string(),
                destination: "dst.txt".to_string(),
                overwrite: false,
            }),
        )
        .await
        .err()
        .ok_or_else(|| anyhow!("expected conflict"))?;
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn rename_round_trips_relative_paths() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        workspace.write_file("old.txt", b"data")?;
        let state = test_state(&workspace)?;

        let Json(response) = rename_file(
            State(state),
            Json(RenameRequest {
                old_path: "old.txt".to_string(),
                new_path: "renamed/new.txt".to_string(),
            }),
        )
        .await
        .map_err(|err| anyhow!("unexpected error: {err:?}"))?;
        assert!(response.success);
        assert_eq!(response.old_path, "old.txt");
        assert_eq!(response.new_path, "renamed/new.txt");
        assert_eq!(response.timestamp.timestamp_subsec_nanos(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn mkdir_creates_directories() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace)?;

        let Json(response) = make_directory(
            State(state),
            Json(MkdirRequest {
                path: "fresh/dir".to_string(),
            }),
        )
        .await
        .map_err(|err| anyhow!("unexpected error: {err:?}"))?;
        assert!(response.success);
        assert!(workspace.root().join("fresh/dir").is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn stat_reports_metadata() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        workspace.write_file("data.bin", b"12345")?;
        let state = test_state(&workspace)?;

        let Json(response) = stat_file(
            State(state),
            Query(PathQuery {
                path: Some("data.bin".to_string()),
            }),
        )
        .await
        .map_err(|err| anyhow!("unexpected error: {err:?}"))?;
        assert_eq!(response.entry.size, 5);
        assert!(!response.entry.is_dir);
        Ok(())
    }
}
