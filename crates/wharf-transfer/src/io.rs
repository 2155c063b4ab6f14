//! Streaming single-file read and write.
//!
//! # Design
//! - One write primitive enforces the size limit and partial-file cleanup;
//!   transport adapters only produce a `(path, reader, size)` triple.
//! - The copy is capped at `max_file_size + 1` bytes so an oversized,
//!   unbounded-length upload is caught without buffering the whole body.
//! - Reads hand back an open file handle; the HTTP layer streams it out.

use std::path::Path;

use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::TransferService;
use crate::error::{TransferError, TransferResult};
use crate::model::{WriteReceipt, truncate_to_seconds};

/// An opened file ready to be streamed to a client.
#[derive(Debug)]
pub struct FileContent {
    /// Open handle positioned at the start of the file.
    pub file: fs::File,
    /// Size in bytes as reported by the filesystem.
    pub size: u64,
    /// MIME type inferred from the extension, `application/octet-stream` when unknown.
    pub mime: String,
    /// Base name of the file, for download disposition headers.
    pub file_name: String,
}

impl TransferService {
    /// Open a file for streaming, rejecting directories.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the target does not exist, `InvalidRequest`
    /// when it is a directory, and an IO error when the open fails.
    pub async fn read_file(&self, raw_path: &str) -> TransferResult<FileContent> {
        let resolved = self.root().resolve(raw_path)?;
        let metadata = match fs::metadata(&resolved).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransferError::not_found(raw_path));
            }
            Err(err) => return Err(TransferError::io("read.stat", &resolved, err)),
        };
        if metadata.is_dir() {
            return Err(TransferError::invalid_request(
                "path",
                "target is a directory",
                Some(raw_path.to_string()),
            ));
        }

        let file = fs::File::open(&resolved)
            .await
            .map_err(|err| TransferError::io("read.open", &resolved, err))?;
        let mime = mime_guess::from_path(&resolved)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let file_name = resolved
            .file_name()
            .map_or_else(|| "download".to_string(), |name| {
                name.to_string_lossy().to_string()
            });

        self.metrics().add_bytes_sent(metadata.len());
        Ok(FileContent {
            file,
            size: metadata.len(),
            mime,
            file_name,
        })
    }

    /// Write a file from a stream, enforcing the configured size limit.
    ///
    /// Parent directories are created as needed. A copy that exceeds the
    /// limit deletes the partially written file before failing, so no
    /// truncated artifact is left behind for a subsequent read.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for a zero or oversized declared size and for
    /// an oversized body, and an IO error when a filesystem call fails.
    pub async fn write_file<R>(
        &self,
        raw_path: &str,
        reader: R,
        declared_size: u64,
    ) -> TransferResult<WriteReceipt>
    where
        R: AsyncRead + Unpin,
    {
        let resolved = self.root().resolve(raw_path)?;
        let max = self.limits().max_file_size;
        if declared_size == 0 {
            self.metrics().inc_rejection("zero_length");
            return Err(TransferError::invalid_request(
                "content",
                "declared size is zero",
                None,
            ));
        }
        if declared_size > max {
            self.metrics().inc_rejection("size_limit");
            return Err(TransferError::invalid_request(
                "content",
                "exceeds maximum file size",
                Some(declared_size.to_string()),
            ));
        }

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| TransferError::io("write.create_parents", parent, err))?;
        }
        let mut file = fs::File::create(&resolved)
            .await
            .map_err(|err| TransferError::io("write.create", &resolved, err))?;

        let mut limited = reader.take(max.saturating_add(1));
        let copied = match tokio::io::copy(&mut limited, &mut file).await {
            Ok(copied) => copied,
            Err(err) => {
                drop(file);
                discard_partial(&resolved).await;
                return Err(TransferError::io("write.copy", &resolved, err));
            }
        };
        if copied > max {
            drop(file);
            discard_partial(&resolved).await;
            self.metrics().inc_rejection("size_limit");
            return Err(TransferError::invalid_request(
                "content",
                "exceeds maximum file size",
                Some(raw_path.to_string()),
            ));
        }
        file.flush()
            .await
            .map_err(|err| TransferError::io("write.flush", &resolved, err))?;
        drop(file);

        self.metrics().add_bytes_received(copied);
        tracing::debug!(path = %self.root().relative_string(&resolved), size = copied, "file written");
        Ok(WriteReceipt {
            path: self.root().relative_string(&resolved),
            size: copied,
            timestamp: truncate_to_seconds(chrono::Utc::now()),
        })
    }
}

/// Remove a partially written file, logging rather than masking the original failure.
async fn discard_partial(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        tracing::warn!(error = %err, "failed to remove partial file after aborted write");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransferLimits;
    use anyhow::{Result, anyhow};
    use std::io::Cursor;
    use wharf_test_support::TempWorkspace;
    use wharf_telemetry::Metrics;

    fn service(workspace: &TempWorkspace, max_file_size: u64) -> Result<TransferService> {
        Ok(TransferService::new(
            crate::WorkspaceRoot::open(workspace.root())?,
            TransferLimits::new(max_file_size),
            Metrics::new()?,
        ))
    }

    async fn read_to_vec(content: FileContent) -> Result<Vec<u8>> {
        let mut file = content.file;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).await?;
        Ok(buffer)
    }

    #[tokio::test]
    async fn write_then_read_round_trips() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let service = service(&workspace, 1024)?;

        let payload = b"hello wharf".to_vec();
        let receipt = service
            .write_file("docs/note.txt", Cursor::new(payload.clone()), 11)
            .await?;
        assert_eq!(receipt.size, 11);
        assert_eq!(receipt.path, "docs/note.txt");
        assert_eq!(receipt.timestamp.timestamp_subsec_nanos(), 0);

        let content = service.read_file("docs/note.txt").await?;
        assert_eq!(content.size, 11);
        assert_eq!(content.mime, "text/plain");
        assert_eq!(content.file_name, "note.txt");
        assert_eq!(read_to_vec(content).await?, payload);
        Ok(())
    }

    #[tokio::test]
    async fn write_creates_missing_parent_directories() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let service = service(&workspace, 1024)?;

        let receipt = service
            .write_file("a/b/c.txt", Cursor::new(b"hi".to_vec()), 2)
            .await?;
        assert_eq!(receipt.size, 2);
        assert!(workspace.root().join("a/b").is_dir());
        assert_eq!(read_to_vec(service.read_file("a/b/c.txt").await?).await?, b"hi");
        Ok(())
    }

    #[tokio::test]
    async fn write_rejects_zero_declared_size() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let service = service(&workspace, 1024)?;

        let err = service
            .write_file("empty.bin", Cursor::new(Vec::new()), 0)
            .await
            .err()
            .ok_or_else(|| anyhow!("expected zero size rejection"))?;
        assert!(matches!(err, TransferError::InvalidRequest { .. }));
        assert!(!workspace.root().join("empty.bin").exists());
        Ok(())
    }

    #[tokio::test]
    async fn write_accepts_exactly_the_limit() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let service = service(&workspace, 8)?;

        let receipt = service
            .write_file("exact.bin", Cursor::new(vec![7u8; 8]), 8)
            .await?;
        assert_eq!(receipt.size, 8);
        Ok(())
    }

    #[tokio::test]
    async fn write_rejects_oversized_declared_size() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let service = service(&workspace, 8)?;

        let err = service
            .write_file("big.bin", Cursor::new(vec![7u8; 9]), 9)
            .await
            .err()
            .ok_or_else(|| anyhow!("expected declared size rejection"))?;
        assert!(matches!(err, TransferError::InvalidRequest { .. }));
        assert!(!workspace.root().join("big.bin").exists());
        Ok(())
    }

    #[tokio::test]
    async fn write_cleans_up_when_body_exceeds_declared_size() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let service = service(&workspace, 8)?;

        // Declared size lies; the body itself overflows the limit.
        let err = service
            .write_file("liar.bin", Cursor::new(vec![7u8; 64]), 8)
            .await
            .err()
            .ok_or_else(|| anyhow!("expected oversized body rejection"))?;
        assert!(matches!(err, TransferError::InvalidRequest { .. }));
        assert!(!workspace.root().join("liar.bin").exists());
        Ok(())
    }

    #[tokio::test]
    async fn write_truncates_existing_content() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        workspace.write_file("note.txt", b"a much longer original body")?;
        let service = service(&workspace, 1024)?;

        service
            .write_file("note.txt", Cursor::new(b"short".to_vec()), 5)
            .await?;
        assert_eq!(
            read_to_vec(service.read_file("note.txt").await?).await?,
            b"short"
        );
        Ok(())
    }

    #[tokio::test]
    async fn read_rejects_directories() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        workspace.mkdir("dir")?;
        let service = service(&workspace, 1024)?;

        let err = service
            .read_file("dir")
            .await
            .err()
            .ok_or_else(|| anyhow!("expected directory rejection"))?;
        assert!(matches!(err, TransferError::InvalidRequest { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn read_missing_file_is_not_found() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        let service = service(&workspace, 1024)?;

        let err = service
            .read_file("missing.txt")
            .await
            .err()
            .ok_or_else(|| anyhow!("expected not found"))?;
        assert!(matches!(err, TransferError::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_extension_falls_back_to_octet_stream() -> Result<()> {
        let workspace = TempWorkspace::new()?;
        workspace.write_file("blob.wharfdata", b"\x00\x01")?;
        let service = service(&workspace, 1024)?;

        let content = service.read_file("blob.wharfdata").await?;
        assert_eq!(content.mime, "application/octet-stream");
        Ok(())
    }
}
