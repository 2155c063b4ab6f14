//! Delete, move, rename, and directory creation.
//!
//! Move and rename share the guard-both-sides shape but diverge on purpose:
//! move honours an `overwrite` flag, rename never overwrites.

use std::path::Path;

use tokio::fs;

use crate::TransferService;
use crate::error::{TransferError, TransferResult};

impl TransferService {
    /// Remove a file or directory.
    ///
    /// Non-recursive deletion of a non-empty directory surfaces the
    /// underlying failure instead of silently succeeding.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the target does not exist and an IO error when
    /// removal fails.
    pub async fn delete(&self, raw_path: &str, recursive: bool) -> TransferResult<String> {
        let resolved = self.root().resolve(raw_path)?;
        let metadata = match fs::symlink_metadata(&resolved).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransferError::not_found(raw_path));
            }
            Err(err) => return Err(TransferError::io("delete.stat", &resolved, err)),
        };

        let removal = if metadata.is_dir() {
            if recursive {
                fs::remove_dir_all(&resolved).await
            } else {
                fs::remove_dir(&resolved).await
            }
        } else {
            fs::remove_file(&resolved).await
        };
        removal.map_err(|err| TransferError::io("delete.remove", &resolved, err))?;

        tracing::debug!(path = %self.root().relative_string(&resolved), recursive, "entry deleted");
        Ok(self.root().relative_string(&resolved))
    }

    /// Move an entry, optionally replacing an existing destination.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing source, `Conflict` when the
    /// destination exists without `overwrite`, and an IO error when the
    /// rename fails.
    pub async fn move_entry(
        &self,
        source_raw: &str,
        destination_raw: &str,
        overwrite: bool,
    ) -> TransferResult<(String, String)> {
        let source = self.root().resolve(source_raw)?;
        let destination = self.root().resolve(destination_raw)?;
        require_exists(&source, source_raw, "move.stat").await?;

        match fs::symlink_metadata(&destination).await {
            Ok(existing) => {
                if !overwrite {
                    return Err(TransferError::conflict("move", destination_raw));
                }
                let removal = if existing.is_dir() {
                    fs::remove_dir_all(&destination).await
                } else {
                    fs::remove_file(&destination).await
                };
                removal
                    .map_err(|err| TransferError::io("move.remove_destination", &destination, err))?;
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(TransferError::io("move.stat_destination", &destination, err)),
        }

        relocate(&source, &destination, "move.rename").await?;
        Ok((
            self.root().relative_string(&source),
            self.root().relative_string(&destination),
        ))
    }

    /// Rename an entry; the destination must not already exist.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing source, `Conflict` when the
    /// destination exists, and an IO error when the rename fails.
    pub async fn rename_entry(
        &self,
        old_raw: &str,
        new_raw: &str,
    ) -> TransferResult<(String, String)> {
        let old_path = self.root().resolve(old_raw)?;
        let new_path = self.root().resolve(new_raw)?;
        require_exists(&old_path, old_raw, "rename.stat").await?;

        if fs::symlink_metadata(&new_path).await.is_ok() {
            return Err(TransferError::conflict("rename", new_raw));
        }

        relocate(&old_path, &new_path, "rename.rename").await?;
        Ok((
            self.root().relative_string(&old_path),
            self.root().relative_string(&new_path),
        ))
    }

    /// Create a directory, including missing parents.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for a path outside the workspace and an IO
    /// error when creation fails.
    pub async fn make_directory(&self, raw_path: &str) -> TransferResult<String> {
        let resolved = self.root().resolve(raw_path)?;
        fs::create_dir_all(&resolved)
            .await
            .map_err(|err| TransferError::io("mkdir.create", &resolved, err))?;
        Ok(self.root().relative_string(&resolved))
    }
}

/// Create destination parents and perform the filesystem rename.
async fn relocate(
    source: &Path,
    destination: &Path,
    operation: &'static str,
) -> TransferResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| TransferError::io("move.create_parents", parent, err))?;
    }
    fs::rename(source, destination)
        .await
        .map_err(|err| TransferError::io(operation, destination, err))
}

async fn require_exists(
    resolved: &Path,
    raw: &str,
    operation: &'static str,
) -> TransferResult<()> {
    match fs::symlink_metadata(resolved).await {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(TransferError::not_found(raw))
        }
        Err(err) => Err(TransferError::io(operation, resolved, err)),
    }
}
