#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Core file transfer operations for the Wharf gateway.
//!
//! Every operation is scoped to a single workspace root and is stateless
//! across requests: the filesystem is the only persistent state. Layout:
//! `guard.rs` (path validation), `io.rs` (streaming read/write), `list.rs`
//! (directory enumeration), `mutate.rs` (delete/move/rename), `archive.rs`
//! (tar/gzip/multipart encoding), `model.rs` (wire records), `error.rs`
//! (failure taxonomy).

/// Streaming archive encoding.
pub mod archive;
/// Transfer failure taxonomy.
pub mod error;
/// Workspace root resolution and path validation.
pub mod guard;
/// Streaming single-file read and write.
pub mod io;
/// Directory enumeration and stat.
pub mod list;
/// Wire-facing transfer records.
pub mod model;
/// Delete, move, rename, and directory creation.
pub mod mutate;

pub use archive::ArchiveStream;
pub use error::{TransferError, TransferResult};
pub use guard::WorkspaceRoot;
pub use io::FileContent;
pub use list::ListOptions;
pub use model::{
    ArchiveFormat, BatchFileOutcome, DEFAULT_LIST_LIMIT, DirectoryListing, FileEntry,
    TransferLimits, WriteReceipt, truncate_to_seconds,
};

use wharf_telemetry::Metrics;

/// Stateless transfer service scoped to one workspace root.
///
/// Cloning is cheap; all fields are immutable after construction, so no
/// locking is required across concurrent requests.
#[derive(Clone)]
pub struct TransferService {
    root: WorkspaceRoot,
    limits: TransferLimits,
    metrics: Metrics,
}

impl TransferService {
    /// Construct a service over the given root and limits.
    #[must_use]
    pub const fn new(root: WorkspaceRoot, limits: TransferLimits, metrics: Metrics) -> Self {
        Self {
            root,
            limits,
            metrics,
        }
    }

    /// The workspace root every path resolves against.
    #[must_use]
    pub const fn root(&self) -> &WorkspaceRoot {
        &self.root
    }

    /// The read-only per-instance transfer limits.
    #[must_use]
    pub const fn limits(&self) -> &TransferLimits {
        &self.limits
    }

    pub(crate) const fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
