//! Shared HTTP DTOs for the Wharf public API.
//!
//! These types are the wire contract for remote clients; keeping them in one
//! module makes the mapping from transfer records (`FileEntry`,
//! `WriteReceipt`, `BatchFileOutcome`) a single source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wharf_transfer::{BatchFileOutcome, FileEntry};

/// RFC9457-compatible problem document surfaced on validation/runtime errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short human-readable title.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Optional failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Optional invalid-parameter pointers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_params: Option<Vec<ProblemInvalidParam>>,
}

/// Invalid parameter pointer surfaced alongside a [`ProblemDetails`] payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemInvalidParam {
    /// Field the failure refers to.
    pub pointer: String,
    /// Human-readable validation message.
    pub message: String,
}

/// JSON write request carrying inline content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteFileRequest {
    /// Destination path, resolved under the workspace root.
    pub path: String,
    /// File content, raw or base64-encoded.
    pub content: String,
    /// Content encoding; only `base64` is recognised.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

/// Response for a completed single-file write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteFileResponse {
    /// Always `true` on success responses.
    pub success: bool,
    /// Workspace-relative path that was written.
    pub path: String,
    /// Bytes written.
    pub size: u64,
    /// Completion time truncated to whole seconds.
    pub timestamp: DateTime<Utc>,
}

/// Response for a directory listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    /// Always `true` on success responses.
    pub success: bool,
    /// Entries in the returned page.
    pub files: Vec<FileEntry>,
    /// Number of entries in the returned page.
    pub count: usize,
}

/// Response for a single-entry stat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatResponse {
    /// Always `true` on success responses.
    pub success: bool,
    /// Metadata record for the target.
    pub entry: FileEntry,
}

/// Delete request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Target path.
    pub path: String,
    /// Remove directory contents recursively.
    #[serde(default)]
    pub recursive: bool,
}

/// Response for a completed delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Always `true` on success responses.
    pub success: bool,
    /// Workspace-relative path that was removed.
    pub path: String,
    /// Completion time truncated to whole seconds.
    pub timestamp: DateTime<Utc>,
}

/// Move request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Source path; must exist.
    pub source: String,
    /// Destination path.
    pub destination: String,
    /// Replace an existing destination.
    #[serde(default)]
    pub overwrite: bool,
}

/// Response for a completed move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveResponse {
    /// Always `true` on success responses.
    pub success: bool,
    /// Workspace-relative source path.
    pub source: String,
    /// Workspace-relative destination path.
    pub destination: String,
    /// Completion time truncated to whole seconds.
    pub timestamp: DateTime<Utc>,
}

/// Rename request; the destination must not exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    /// Existing path.
    pub old_path: String,
    /// New path; must not exist.
    pub new_path: String,
}

/// Response for a completed rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameResponse {
    /// Always `true` on success responses.
    pub success: bool,
    /// Workspace-relative old path.
    pub old_path: String,
    /// Workspace-relative new path.
    pub new_path: String,
    /// Completion time truncated to whole seconds.
    pub timestamp: DateTime<Utc>,
}

/// Directory creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MkdirRequest {
    /// Directory path to create, including missing parents.
    pub path: String,
}

/// Response for a completed directory creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MkdirResponse {
    /// Always `true` on success responses.
    pub success: bool,
    /// Workspace-relative path that was created.
    pub path: String,
    /// Completion time truncated to whole seconds.
    pub timestamp: DateTime<Utc>,
}

/// Multi-file download request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Paths to include; directories are walked recursively.
    pub paths: Vec<String>,
    /// Explicit encoding (`tar`, `tar.gz`, `mixed`/`multipart`); overrides
    /// the `Accept` header when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Aggregate response for a batch upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUploadResponse {
    /// One outcome per uploaded file, in request order.
    pub results: Vec<BatchFileOutcome>,
    /// Number of files attempted.
    pub total_files: usize,
    /// Number of files written successfully.
    pub success_count: usize,
}
