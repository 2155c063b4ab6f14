//! One-level directory enumeration with pagination.
//!
//! Ordering follows the underlying directory enumeration; callers must not
//! assume lexicographic order. Pagination applies after hidden-entry
//! filtering, with the offset clamped to the filtered length.

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::fs;

use crate::TransferService;
use crate::error::{TransferError, TransferResult};
use crate::model::{DEFAULT_LIST_LIMIT, DirectoryListing, FileEntry, truncate_to_seconds};

/// Listing parameters with gateway defaults.
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    /// Include entries whose name starts with `.`.
    pub show_hidden: bool,
    /// Maximum number of entries returned.
    pub limit: usize,
    /// Entries skipped after filtering.
    pub offset: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            show_hidden: false,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl TransferService {
    /// Enumerate exactly one directory level.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for a path outside the workspace and an IO
    /// error when the directory cannot be read.
    pub async fn list_directory(
        &self,
        raw_path: &str,
        options: ListOptions,
    ) -> TransferResult<DirectoryListing> {
        let resolved = self.root().resolve(raw_path)?;
        let mut reader = fs::read_dir(&resolved)
            .await
            .map_err(|err| TransferError::io("list.read_dir", &resolved, err))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|err| TransferError::io("list.next_entry", &resolved, err))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if !options.show_hidden && name.starts_with('.') {
                continue;
            }
            let metadata = entry
                .metadata()
                .await
                .map_err(|err| TransferError::io("list.metadata", entry.path(), err))?;
            entries.push(self.entry_record(&entry.path(), name, &metadata));
        }

        let offset = options.offset.min(entries.len());
        let files: Vec<FileEntry> = entries
            .into_iter()
            .skip(offset)
            .take(options.limit)
            .collect();
        let count = files.len();
        Ok(DirectoryListing { files, count })
    }

    /// Stat a single entry, reusing the listing record shape.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the target does not exist and an IO error when
    /// the stat fails.
    pub async fn stat_entry(&self, raw_path: &str) -> TransferResult<FileEntry> {
        let resolved = self.root().resolve(raw_path)?;
        let metadata = match fs::metadata(&resolved).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransferError::not_found(raw_path));
            }
            Err(err) => return Err(TransferError::io("stat.metadata", &resolved, err)),
        };
        let name = resolved
            .file_name()
            .map_or_else(|| ".".to_string(), |name| {
                name.to_string_lossy().to_string()
            });
        Ok(self.entry_record(&resolved, name, &metadata))
    }

    fn entry_record(&self, path: &Path, name: String, metadata: &std::fs::Metadata) -> FileEntry {
        let is_dir = metadata.is_dir();
        let mime = (!is_dir).then(|| {
            mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });
        let modified_at = metadata
            .modified()
            .ok()
            .map(|time| truncate_to_seconds(DateTime::<Utc>::from(time)));
        FileEntry {
            name,
            path: self.root().relative_string(path),
            size: metadata.len(),
            is_dir,
            mime,
            permissions: permission_string(metadata),
            modified_at,
        }
    }
}

#[cfg(unix)]
fn permission_string(metadata: &std::fs::Metadata) -> Option<String> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode() & 0o777;
    (mode != 0).then(|| format!("{mode:03o}"))
}

#[cfg(not(unix))]
fn permission_string(_metadata: &std::fs::Metadata) -> Option<String> {
    None
}
