//! Wire-facing transfer records.
//!
//! Everything here is request-scoped: constructed fresh per call, serialized
//! into the response, and dropped. Timestamps are truncated to whole seconds
//! since wire-format timestamps carry no sub-second precision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default page size for directory listings.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Read-only per-instance transfer limits shared by all requests.
#[derive(Debug, Clone, Copy)]
pub struct TransferLimits {
    /// Maximum accepted size for a single file, in bytes.
    pub max_file_size: u64,
}

impl TransferLimits {
    /// Construct limits with the supplied maximum file size.
    #[must_use]
    pub const fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }
}

/// One directory entry or stat result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Entry name within its parent directory.
    pub name: String,
    /// Workspace-relative path of the entry.
    pub path: String,
    /// Size in bytes as reported by the filesystem.
    pub size: u64,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Best-effort MIME type; directories carry none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    /// Octal permission string, present only when the bits are non-zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    /// Modification time truncated to whole seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// One page of a directory listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectoryListing {
    /// Entries in the returned page, in underlying enumeration order.
    pub files: Vec<FileEntry>,
    /// Number of entries in the returned page.
    pub count: usize,
}

/// Receipt for a completed write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Workspace-relative path that was written.
    pub path: String,
    /// Bytes written.
    pub size: u64,
    /// Completion time truncated to whole seconds.
    pub timestamp: DateTime<Utc>,
}

/// Encoding selected for a multi-file download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Plain uncompressed tar stream.
    Tar,
    /// Gzip-compressed tar stream.
    TarGz,
    /// `multipart/mixed` sequence of file parts.
    Multipart,
}

impl ArchiveFormat {
    /// Stable identifier used in metrics labels and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::Multipart => "multipart",
        }
    }
}

/// Outcome of one file within a batch upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchFileOutcome {
    /// Destination path the write targeted.
    pub path: String,
    /// Whether the write succeeded.
    pub success: bool,
    /// Bytes written on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Failure detail on error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Truncate a timestamp to whole seconds for wire encoding.
#[must_use]
pub fn truncate_to_seconds(value: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(value.timestamp(), 0).unwrap_or(value)
}
