//! Streaming archive encoding for multi-file downloads.
//!
//! # Design
//! - Requested paths are guarded and stat-checked before the stream starts,
//!   so missing targets fail the request instead of truncating the stream.
//! - Encoding runs on a blocking task writing into a bounded channel; the
//!   HTTP layer consumes the receiver as the response body, so a slow client
//!   applies backpressure and a disconnected client aborts the walk.
//! - Entry names are workspace-relative. Gzip wraps the tar stream, not the
//!   other way around.
//! - The walk aborts on the first unreadable entry: a silently truncated
//!   archive is worse than an explicit error.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;
use walkdir::WalkDir;
use wharf_telemetry::Metrics;

use crate::TransferService;
use crate::error::{TransferError, TransferResult};
use crate::guard::WorkspaceRoot;
use crate::model::ArchiveFormat;

const CHANNEL_DEPTH: usize = 8;
const CHUNK_SIZE: usize = 64 * 1024;

/// A live archive encoding, consumed as a byte stream.
pub struct ArchiveStream {
    format: ArchiveFormat,
    boundary: Option<String>,
    rx: mpsc::Receiver<io::Result<Bytes>>,
}

impl ArchiveStream {
    /// Encoding selected for this stream.
    #[must_use]
    pub const fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Content type for the response, including the multipart boundary.
    #[must_use]
    pub fn content_type(&self) -> String {
        match self.format {
            ArchiveFormat::Tar => "application/x-tar".to_string(),
            ArchiveFormat::TarGz => "application/gzip".to_string(),
            ArchiveFormat::Multipart => format!(
                "multipart/mixed; boundary={}",
                self.boundary.as_deref().unwrap_or_default()
            ),
        }
    }

    /// Suggested download filename; multipart streams carry none.
    #[must_use]
    pub const fn attachment_name(&self) -> Option<&'static str> {
        match self.format {
            ArchiveFormat::Tar => Some("files.tar"),
            ArchiveFormat::TarGz => Some("files.tar.gz"),
            ArchiveFormat::Multipart => None,
        }
    }

    /// Consume the handle as a stream of body chunks.
    #[must_use]
    pub fn into_stream(self) -> ReceiverStream<io::Result<Bytes>> {
        ReceiverStream::new(self.rx)
    }
}

impl TransferService {
    /// Start encoding the requested paths into an archive stream.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when no paths are supplied or one escapes the
    /// workspace, and `NotFound` when a requested path does not exist.
    pub async fn build_archive(
        &self,
        raw_paths: &[String],
        format: ArchiveFormat,
    ) -> TransferResult<ArchiveStream> {
        if raw_paths.is_empty() {
            self.metrics().inc_rejection("empty_archive");
            return Err(TransferError::invalid_request(
                "paths",
                "no paths supplied",
                None,
            ));
        }

        let mut targets = Vec::with_capacity(raw_paths.len());
        for raw in raw_paths {
            let resolved = self.root().resolve(raw)?;
            match tokio::fs::symlink_metadata(&resolved).await {
                Ok(_) => targets.push(resolved),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    return Err(TransferError::not_found(raw.as_str()));
                }
                Err(err) => return Err(TransferError::io("archive.stat", &resolved, err)),
            }
        }

        let boundary = matches!(format, ArchiveFormat::Multipart)
            .then(|| format!("wharf-{}", Uuid::new_v4().simple()));
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let root = self.root().clone();
        let metrics = self.metrics().clone();
        let task_boundary = boundary.clone();
        let _encoder = tokio::task::spawn_blocking(move || {
            encode_archive(&tx, &root, &targets, format, task_boundary.as_deref(), &metrics);
        });

        Ok(ArchiveStream {
            format,
            boundary,
            rx,
        })
    }
}

fn encode_archive(
    tx: &mpsc::Sender<io::Result<Bytes>>,
    root: &WorkspaceRoot,
    targets: &[PathBuf],
    format: ArchiveFormat,
    boundary: Option<&str>,
    metrics: &Metrics,
) {
    let writer = ChannelWriter::new(tx.clone());
    let result = match format {
        ArchiveFormat::Tar => encode_tar_plain(writer, root, targets),
        ArchiveFormat::TarGz => encode_tar_gzip(writer, root, targets),
        ArchiveFormat::Multipart => {
            encode_multipart(writer, root, targets, boundary.unwrap_or_default())
        }
    };
    match result {
        Ok((writer, entries)) => {
            metrics.add_archive_entries(format.as_str(), entries);
            metrics.add_bytes_sent(writer.bytes_sent);
        }
        Err(err) => {
            tracing::warn!(error = %err, format = format.as_str(), "archive encoding aborted");
            let _ = tx.blocking_send(Err(err));
        }
    }
}

fn encode_tar_plain(
    writer: ChannelWriter,
    root: &WorkspaceRoot,
    targets: &[PathBuf],
) -> io::Result<(ChannelWriter, u64)> {
    let (mut writer, entries) = append_tar_entries(tar::Builder::new(writer), root, targets)?;
    writer.flush()?;
    Ok((writer, entries))
}

fn encode_tar_gzip(
    writer: ChannelWriter,
    root: &WorkspaceRoot,
    targets: &[PathBuf],
) -> io::Result<(ChannelWriter, u64)> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let (encoder, entries) = append_tar_entries(tar::Builder::new(encoder), root, targets)?;
    let mut writer = encoder.finish()?;
    writer.flush()?;
    Ok((writer, entries))
}

fn append_tar_entries<W: Write>(
    mut builder: tar::Builder<W>,
    root: &WorkspaceRoot,
    targets: &[PathBuf],
) -> io::Result<(W, u64)> {
    let mut entries = 0u64;
    for target in targets {
        for step in WalkDir::new(target) {
            let step = step.map_err(io::Error::from)?;
            let Ok(relative) = step.path().strip_prefix(root.as_path()) else {
                return Err(io::Error::other("archive entry outside workspace root"));
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            let file_type = step.file_type();
            if file_type.is_dir() {
                builder.append_dir(relative, step.path())?;
                entries += 1;
            } else if file_type.is_file() {
                builder.append_path_with_name(step.path(), relative)?;
                entries += 1;
            }
        }
    }
    let writer = builder.into_inner()?;
    Ok((writer, entries))
}

fn encode_multipart(
    mut writer: ChannelWriter,
    root: &WorkspaceRoot,
    targets: &[PathBuf],
    boundary: &str,
) -> io::Result<(ChannelWriter, u64)> {
    let mut entries = 0u64;
    for target in targets {
        for step in WalkDir::new(target) {
            let step = step.map_err(io::Error::from)?;
            if !step.file_type().is_file() {
                continue;
            }
            let Ok(relative) = step.path().strip_prefix(root.as_path()) else {
                return Err(io::Error::other("archive entry outside workspace root"));
            };
            let mime = mime_guess::from_path(step.path()).first_or_octet_stream();
            write!(writer, "--{boundary}\r\n")?;
            write!(
                writer,
                "Content-Disposition: attachment; filename=\"{}\"\r\n",
                relative.display()
            )?;
            write!(writer, "Content-Type: {}\r\n\r\n", mime.essence_str())?;
            let mut file = File::open(step.path())?;
            io::copy(&mut file, &mut writer)?;
            writer.write_all(b"\r\n")?;
            entries += 1;
        }
    }
    write!(writer, "--{boundary}--\r\n")?;
    writer.flush()?;
    Ok((writer, entries))
}

/// Bridges the blocking encoder onto the async response channel in bounded
/// chunks. A send failure means the client went away; the resulting broken
/// pipe error unwinds the walk.
struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buffer: Vec<u8>,
    bytes_sent: u64,
}

impl ChannelWriter {
    fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self {
            tx,
            buffer: Vec::with_capacity(CHUNK_SIZE),
            bytes_sent: 0,
        }
    }

    fn flush_chunk(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::take(&mut self.buffer));
        self.bytes_sent += u64::try_from(chunk.len()).unwrap_or(u64::MAX);
        self.tx.blocking_send(Ok(chunk)).map_err(|_| {
            io::Error::new(io::ErrorKind::BrokenPipe, "archive consumer disconnected")
        })
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        if self.buffer.len() >= CHUNK_SIZE {
            self.flush_chunk()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_chunk()
    }
}
