//! Write adapters and batch upload decoding.
//!
//! # Design
//! - Three transport shapes (inline JSON, raw body with out-of-band path,
//!   multipart form) converge on the transfer core's single write primitive
//!   by producing a `(path, reader, size)` triple; size-limit and cleanup
//!   logic lives in one place.
//! - The batch decoder reads the raw content-disposition filename itself:
//!   standard form decoding strips directory components, which would lose
//!   nested relative paths.
//! - Multipart fields are collected with a hard cap of one byte past the
//!   size limit, mirroring the core's streaming limiter bound.

use std::io::Cursor;
use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequest, Multipart, Query, Request, State, multipart::Field},
    http::{HeaderMap, header},
};
use base64::{Engine as _, engine::general_purpose};
use futures_util::TryStreamExt;
use serde::Deserialize;
use tokio_util::io::StreamReader;
use tracing::info;

use crate::app::state::ApiState;
use crate::http::constants::{HEADER_FILE_PATH, JSON_ENVELOPE_BYTES};
use crate::http::errors::ApiError;
use crate::models::{BatchUploadResponse, WriteFileRequest, WriteFileResponse};
use wharf_transfer::{BatchFileOutcome, WriteReceipt};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawWriteQuery {
    pub(crate) path: Option<String>,
    pub(crate) path_b64: Option<String>,
}

/// Single-file write entrypoint; dispatches on the request content type.
pub(crate) async fn write_file(
    State(state): State<Arc<ApiState>>,
    request: Request,
) -> Result<Json<WriteFileResponse>, ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let receipt = if content_type.starts_with("application/json") {
        write_from_json(&state, request).await?
    } else if content_type.starts_with("multipart/form-data") {
        write_from_multipart(&state, request).await?
    } else {
        write_from_raw_body(&state, request).await?
    };

    info!(path = %receipt.path, size = receipt.size, "write completed");
    Ok(Json(WriteFileResponse {
        success: true,
        path: receipt.path,
        size: receipt.size,
        timestamp: receipt.timestamp,
    }))
}

/// Inline JSON adapter: decode the content (optionally base64) and size it.
async fn write_from_json(
    state: &Arc<ApiState>,
    request: Request,
) -> Result<WriteReceipt, ApiError> {
    let limit = json_body_limit(state.transfer.limits().max_file_size);
    let bytes = axum::body::to_bytes(request.into_body(), limit)
        .await
        .map_err(|_| ApiError::bad_request("failed to read request body"))?;
    let payload: WriteFileRequest = serde_json::from_slice(&bytes)
        .map_err(|err| ApiError::bad_request(format!("invalid json body: {err}")))?;

    let content = decode_inline_content(&payload)?;
    let declared = u64::try_from(content.len()).unwrap_or(u64::MAX);
    state
        .transfer
        .write_file(&payload.path, Cursor::new(content), declared)
        .await
        .map_err(ApiError::from)
}

/// Raw-body adapter: the destination path arrives out-of-band and the body
/// streams straight into the write primitive.
async fn write_from_raw_body(
    state: &Arc<ApiState>,
    request: Request,
) -> Result<WriteReceipt, ApiError> {
    let path = out_of_band_path(&request)?;
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(0);
    let reader = StreamReader::new(
        request
            .into_body()
            .into_data_stream()
            .map_err(std::io::Error::other),
    );
    state
        .transfer
        .write_file(&path, reader, declared)
        .await
        .map_err(ApiError::from)
}

/// Multipart form adapter: the file part is `file` or `files`, an optional
/// `path` field overrides the destination.
async fn write_from_multipart(
    state: &Arc<ApiState>,
    request: Request,
) -> Result<WriteReceipt, ApiError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|_| ApiError::bad_request("invalid multipart body"))?;

    let cap = field_cap(state.transfer.limits().max_file_size);
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut override_path: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("invalid multipart body"))?
    {
        let field_name = field.name().map(ToString::to_string);
        match field_name.as_deref() {
            Some("file" | "files") if file.is_none() => {
                let destination = part_filename(&field)
                    .unwrap_or_else(|| "upload.bin".to_string());
                let bytes = collect_field(field, cap).await?;
                file = Some((destination, bytes));
            }
            Some("path") => {
                override_path = field
                    .text()
                    .await
                    .ok()
                    .filter(|value| !value.trim().is_empty());
            }
            _ => {}
        }
    }

    let (fallback, bytes) = file.ok_or_else(|| ApiError::bad_request("missing file part"))?;
    let destination = override_path.unwrap_or(fallback);
    let declared = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    state
        .transfer
        .write_file(&destination, Cursor::new(bytes), declared)
        .await
        .map_err(ApiError::from)
}

/// Batch upload: repeated `files` parts, each written independently so one
/// failure never aborts the rest.
pub(crate) async fn batch_upload(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<BatchUploadResponse>, ApiError> {
    let cap = field_cap(state.transfer.limits().max_file_size);
    let mut results = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("invalid multipart body"))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let Some(destination) = part_filename(&field) else {
            state.telemetry.inc_batch_file("failed");
            results.push(BatchFileOutcome {
                path: String::new(),
                success: false,
                size: None,
                error: Some("part carries no filename".to_string()),
            });
            continue;
        };

        let outcome = match collect_field(field, cap).await {
            Ok(bytes) => {
                let declared = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
                match state
                    .transfer
                    .write_file(&destination, Cursor::new(bytes), declared)
                    .await
                {
                    Ok(receipt) => {
                        state.telemetry.inc_batch_file("ok");
                        BatchFileOutcome {
                            path: receipt.path,
                            success: true,
                            size: Some(receipt.size),
                            error: None,
                        }
                    }
                    Err(err) => {
                        state.telemetry.inc_batch_file("failed");
                        BatchFileOutcome {
                            path: destination.clone(),
                            success: false,
                            size: None,
                            error: Some(err.detail()),
                        }
                    }
                }
            }
            Err(_) => {
                state.telemetry.inc_batch_file("failed");
                BatchFileOutcome {
                    path: destination.clone(),
                    success: false,
                    size: None,
                    error: Some("failed to read multipart field".to_string()),
                }
            }
        };
        results.push(outcome);
    }

    let success_count = results.iter().filter(|outcome| outcome.success).count();
    info!(
        total = results.len(),
        success = success_count,
        "batch upload completed"
    );
    Ok(Json(BatchUploadResponse {
        total_files: results.len(),
        success_count,
        results,
    }))
}

/// Out-of-band destination for raw-body writes, tried in a fixed priority
/// order: `path` query parameter, dedicated header, base64 query parameter.
fn out_of_band_path(request: &Request) -> Result<String, ApiError> {
    let Query(query) = Query::<RawWriteQuery>::try_from_uri(request.uri())
        .map_err(|_| ApiError::bad_request("invalid query string"))?;

    if let Some(path) = query.path.as_deref().filter(|value| !value.is_empty()) {
        return Ok(path.to_string());
    }
    if let Some(path) = request
        .headers()
        .get(HEADER_FILE_PATH)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    {
        return Ok(path.to_string());
    }
    if let Some(encoded) = query.path_b64.as_deref().filter(|value| !value.is_empty()) {
        let decoded = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| ApiError::bad_request("invalid base64 path parameter"))?;
        return String::from_utf8(decoded)
            .map_err(|_| ApiError::bad_request("invalid base64 path parameter"));
    }
    Err(ApiError::bad_request("missing destination path"))
}

fn decode_inline_content(payload: &WriteFileRequest) -> Result<Vec<u8>, ApiError> {
    match payload.encoding.as_deref() {
        Some("base64") => general_purpose::STANDARD
            .decode(payload.content.as_bytes())
            .map_err(|_| ApiError::bad_request("invalid base64 content")),
        Some(other) => Err(ApiError::bad_request(format!(
            "unsupported content encoding: {other}"
        ))),
        None => Ok(payload.content.clone().into_bytes()),
    }
}

/// Raw content-disposition filename for a part, preserving any directory
/// components the standard decoder would strip. Quoted-string aware.
fn part_filename(field: &Field<'_>) -> Option<String> {
    raw_disposition_filename(field.headers())
        .or_else(|| field.file_name().map(ToString::to_string))
        .filter(|name| !name.is_empty())
}

fn raw_disposition_filename(headers: &HeaderMap) -> Option<String> {
    let raw = headers
        .get(header::CONTENT_DISPOSITION)?
        .to_str()
        .ok()?;
    for part in raw.split(';') {
        let part = part.trim();
        let Some(rest) = part.strip_prefix("filename=") else {
            continue;
        };
        let rest = rest.trim();
        let name = rest.strip_prefix('"').map_or_else(
            || rest.to_string(),
            |quoted| {
                let mut out = String::new();
                let mut chars = quoted.chars();
                while let Some(ch) = chars.next() {
                    match ch {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                out.push(escaped);
                            }
                        }
                        _ => out.push(ch),
                    }
                }
                out
            },
        );
        if !name.is_empty() {
            return Some(name);
        }
    }
    None
}

/// Collect a multipart field, never buffering more than one byte past the
/// size limit; the core write rejects the oversized result.
async fn collect_field(mut field: Field<'_>, cap: usize) -> Result<Vec<u8>, ApiError> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|_| ApiError::bad_request("failed to read multipart field"))?
    {
        let remaining = cap.saturating_sub(data.len());
        if remaining == 0 {
            break;
        }
        let take = remaining.min(chunk.len());
        data.extend_from_slice(&chunk[..take]);
    }
    Ok(data)
}

fn json_body_limit(max_file_size: u64) -> usize {
    let expanded = max_file_size.saturating_mul(4) / 3;
    usize::try_from(expanded)
        .unwrap_or(usize::MAX)
        .saturating_add(JSON_ENVELOPE_BYTES)
}

fn field_cap(max_file_size: u64) -> usize {
    usize::try_from(max_file_size.saturating_add(1)).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use axum::body::Body;
    use axum::http::StatusCode;
    use wharf_config::GatewayProfile;
    use wharf_telemetry::Metrics;
    use wharf_test_support::TempWorkspace;
    use wharf_transfer::{TransferLimits, TransferService, WorkspaceRoot};

    const BOUNDARY: &str = "wharf-test-boundary";

    fn test_state(workspace: &TempWorkspace, max_file_size: u64) -> Result<Arc<ApiState>> {
        let profile = GatewayProfile::from_lookup(|name| match name {
            "WHARF_WORKSPACE_ROOT" => Some(workspace.root().display().to_string()),
            "WHARF_MAX_FILE_SIZE" => Some(max_file_size.to_string()),
            _ => None,
        })?;
        let metrics = Metrics::new()?;
        let transfer = TransferService::new(
            WorkspaceRoot::open(workspace.root())?,
            TransferLimits::new(max_file_size),
            metrics.clone(),
        );
        Ok(Arc::new(ApiState::new(profile, transfer, metrics)))
    }

    fn json_request(body: serde_json::Value) -> Result<Request> {
        Ok(Request::builder()
            .method("POST")
            .uri("/v1/files")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?)
    }

    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, contents) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            let disposition = filename.map_or_else(
                || format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
                |filename| {
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                    )
                },
            );
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(contents);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Result<Request> {
        Ok(Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))?)
    }

    async fn extract_multipart(request: Request) -> Result<Multipart> {
        Multipart::from_request(request, &())
            .await
            .map_err(|err| anyhow!("multipart extraction failed: {err}"))
    }

    #[tokio::test]
    async fn json_write_round_trips_plain_content() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace, 4096)?;

        let request = json_request(serde_json::json!({
            "path": "notes/hello.txt",
            "content": "hello"
        }))?;
        let Json(response) = write_file(State(state), request)
            .await
            .map_err(|err| anyhow!("unexpected error: {err:?}"))?;
        assert!(response.success);
        assert_eq!(response.path, "notes/hello.txt");
        assert_eq!(response.size, 5);
        assert_eq!(
            std::fs::read(workspace.root().join("notes/hello.txt"))?,
            b"hello"
        );
        Ok(())
    }

    #[tokio::test]
    async fn json_write_decodes_base64_content() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace, 4096)?;

        let encoded = general_purpose::STANDARD.encode(b"binary\x00payload");
        let request = json_request(serde_json::json!({
            "path": "blob.bin",
            "content": encoded,
            "encoding": "base64"
        }))?;
        let Json(response) = write_file(State(state), request)
            .await
            .map_err(|err| anyhow!("unexpected error: {err:?}"))?;
        assert_eq!(response.size, 14);
        assert_eq!(
            std::fs::read(workspace.root().join("blob.bin"))?,
            b"binary\x00payload"
        );
        Ok(())
    }

    #[tokio::test]
    async fn json_write_rejects_malformed_base64() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace, 4096)?;

        let request = json_request(serde_json::json!({
            "path": "blob.bin",
            "content": "not//valid==base64!!",
            "encoding": "base64"
        }))?;
        let err = write_file(State(state), request)
            .await
            .err()
            .ok_or_else(|| anyhow!("expected base64 rejection"))?;
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(!workspace.root().join("blob.bin").exists());
        Ok(())
    }

    #[tokio::test]
    async fn raw_write_takes_path_from_query_parameter() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace, 4096)?;

        let request = Request::builder()
            .method("POST")
            .uri("/v1/files?path=raw/upload.bin")
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, "5")
            .body(Body::from("12345"))?;
        let Json(response) = write_file(State(state), request)
            .await
            .map_err(|err| anyhow!("unexpected error: {err:?}"))?;
        assert_eq!(response.path, "raw/upload.bin");
        assert_eq!(response.size, 5);
        Ok(())
    }

    #[tokio::test]
    async fn raw_write_falls_back_to_header_then_base64_query() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace, 4096)?;

        let request = Request::builder()
            .method("POST")
            .uri("/v1/files")
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, "3")
            .header(HEADER_FILE_PATH, "from-header.bin")
            .body(Body::from("abc"))?;
        let Json(response) = write_file(State(state.clone()), request)
            .await
            .map_err(|err| anyhow!("unexpected error: {err:?}"))?;
        assert_eq!(response.path, "from-header.bin");

        let encoded = general_purpose::STANDARD.encode("from-b64.bin");
        let request = Request::builder()
            .method("POST")
            .uri(format!("/v1/files?path_b64={encoded}"))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, "3")
            .body(Body::from("xyz"))?;
        let Json(response) = write_file(State(state), request)
            .await
            .map_err(|err| anyhow!("unexpected error: {err:?}"))?;
        assert_eq!(response.path, "from-b64.bin");
        Ok(())
    }

    #[tokio::test]
    async fn raw_write_without_any_path_is_rejected() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace, 4096)?;

        let request = Request::builder()
            .method("POST")
            .uri("/v1/files")
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, "3")
            .body(Body::from("abc"))?;
        let err = write_file(State(state), request)
            .await
            .err()
            .ok_or_else(|| anyhow!("expected missing path rejection"))?;
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn raw_write_without_content_length_is_rejected() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace, 4096)?;

        let request = Request::builder()
            .method("POST")
            .uri("/v1/files?path=unsized.bin")
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from("abc"))?;
        let err = write_file(State(state), request)
            .await
            .err()
            .ok_or_else(|| anyhow!("expected zero declared size rejection"))?;
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn multipart_write_honours_path_field_override() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace, 4096)?;

        let request = multipart_request(
            "/v1/files",
            &[
                ("file", Some("ignored-name.txt"), b"payload"),
                ("path", None, b"override/target.txt"),
            ],
        )?;
        let Json(response) = write_file(State(state), request)
            .await
            .map_err(|err| anyhow!("unexpected error: {err:?}"))?;
        assert_eq!(response.path, "override/target.txt");
        assert_eq!(
            std::fs::read(workspace.root().join("override/target.txt"))?,
            b"payload"
        );
        Ok(())
    }

    #[tokio::test]
    async fn multipart_write_defaults_to_part_filename() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace, 4096)?;

        let request = multipart_request(
            "/v1/files",
            &[("files", Some("from-part.txt"), b"payload")],
        )?;
        let Json(response) = write_file(State(state), request)
            .await
            .map_err(|err| anyhow!("unexpected error: {err:?}"))?;
        assert_eq!(response.path, "from-part.txt");
        Ok(())
    }

    #[tokio::test]
    async fn batch_upload_preserves_nested_relative_paths() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace, 4096)?;

        let request = multipart_request(
            "/v1/files/upload",
            &[
                ("files", Some("deep/nested/a.txt"), b"alpha"),
                ("files", Some("b.txt"), b"beta"),
            ],
        )?;
        let multipart = extract_multipart(request).await?;
        let Json(response) = batch_upload(State(state), multipart)
            .await
            .map_err(|err| anyhow!("unexpected error: {err:?}"))?;

        assert_eq!(response.total_files, 2);
        assert_eq!(response.success_count, 2);
        assert_eq!(response.results[0].path, "deep/nested/a.txt");
        assert_eq!(
            std::fs::read(workspace.root().join("deep/nested/a.txt"))?,
            b"alpha"
        );
        Ok(())
    }

    #[tokio::test]
    async fn batch_upload_isolates_per_file_failures() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        // A plain file blocks parent creation for the second upload.
        workspace.write_file("blocker", b"occupied")?;
        let state = test_state(&workspace, 4096)?;

        let request = multipart_request(
            "/v1/files/upload",
            &[
                ("files", Some("first.txt"), b"one"),
                ("files", Some("blocker/nested.txt"), b"two"),
                ("files", Some("third.txt"), b"three"),
            ],
        )?;
        let multipart = extract_multipart(request).await?;
        let Json(response) = batch_upload(State(state), multipart)
            .await
            .map_err(|err| anyhow!("unexpected error: {err:?}"))?;

        assert_eq!(response.total_files, 3);
        assert_eq!(response.success_count, 2);
        assert!(response.results[0].success);
        assert_eq!(response.results[0].size, Some(3));
        assert!(!response.results[1].success);
        assert!(response.results[1].error.is_some());
        assert!(response.results[2].success);
        assert_eq!(response.results[2].size, Some(5));
        Ok(())
    }

    #[tokio::test]
    async fn batch_upload_de_roots_absolute_filenames() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace, 4096)?;

        let request = multipart_request(
            "/v1/files/upload",
            &[("files", Some("/abs/path.txt"), b"rooted")],
        )?;
        let multipart = extract_multipart(request).await?;
        let Json(response) = batch_upload(State(state), multipart)
            .await
            .map_err(|err| anyhow!("unexpected error: {err:?}"))?;

        assert_eq!(response.success_count, 1);
        assert_eq!(response.results[0].path, "abs/path.txt");
        assert!(workspace.root().join("abs/path.txt").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn oversized_single_write_cleans_up_and_rejects() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let state = test_state(&workspace, 4)?;

        let request = multipart_request(
            "/v1/files",
            &[("file", Some("big.bin"), b"five!")],
        )?;
        let err = write_file(State(state), request)
            .await
            .err()
            .ok_or_else(|| anyhow!("expected size rejection"))?;
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(!workspace.root().join("big.bin").exists());
        Ok(())
    }

    #[test]
    fn raw_disposition_filename_preserves_directories_and_quotes() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_DISPOSITION,
            "form-data; name=\"files\"; filename=\"nested/dir/file name.txt\""
                .parse()
                .expect("header value"),
        );
        assert_eq!(
            raw_disposition_filename(&headers),
            Some("nested/dir/file name.txt".to_string())
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_DISPOSITION,
            "form-data; name=\"files\"; filename=unquoted.bin"
                .parse()
                .expect("header value"),
        );
        assert_eq!(
            raw_disposition_filename(&headers),
            Some("unquoted.bin".to_string())
        );

        let headers = HeaderMap::new();
        assert_eq!(raw_disposition_filename(&headers), None);
    }
}
