//! # Design
//!
//! - Provide structured, constant-message errors for the transfer pipeline.
//! - Capture operation context (paths, fields, inputs) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.
//! - Validation errors embed the original client input, never the resolved
//!   absolute path, so host filesystem layout cannot leak through diagnostics.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors produced by the transfer gateway core.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Malformed or missing input, including paths escaping the workspace and
    /// size-limit violations.
    #[error("transfer invalid request")]
    InvalidRequest {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending client input when available.
        value: Option<String>,
    },
    /// The target of the operation does not exist.
    #[error("transfer target not found")]
    NotFound {
        /// Client-supplied path that failed to resolve to an entry.
        path: String,
    },
    /// The destination of a move or rename already exists.
    #[error("transfer destination conflict")]
    Conflict {
        /// Operation that hit the conflict.
        operation: &'static str,
        /// Client-supplied destination path.
        path: String,
    },
    /// Filesystem call failed for a reason not covered above.
    #[error("transfer io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl TransferError {
    pub(crate) const fn invalid_request(
        field: &'static str,
        reason: &'static str,
        value: Option<String>,
    ) -> Self {
        Self::InvalidRequest {
            field,
            reason,
            value,
        }
    }

    pub(crate) fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub(crate) fn conflict(operation: &'static str, path: impl Into<String>) -> Self {
        Self::Conflict {
            operation,
            path: path.into(),
        }
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Human-readable detail suitable for wire responses and batch outcomes.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidRequest {
                reason,
                value: Some(value),
                ..
            } => format!("{reason}: {value}"),
            Self::InvalidRequest { reason, .. } => (*reason).to_string(),
            Self::NotFound { path } => format!("path not found: {path}"),
            Self::Conflict { path, .. } => format!("destination already exists: {path}"),
            Self::Io {
                operation, source, ..
            } => format!("{operation} failed: {source}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn transfer_error_helpers_build_variants() {
        let invalid = TransferError::invalid_request("path", "path must not be empty", None);
        assert!(matches!(invalid, TransferError::InvalidRequest { .. }));
        assert!(invalid.source().is_none());
        assert_eq!(invalid.detail(), "path must not be empty");

        let missing = TransferError::not_found("a/b.txt");
        assert!(matches!(missing, TransferError::NotFound { .. }));
        assert_eq!(missing.detail(), "path not found: a/b.txt");

        let conflict = TransferError::conflict("move", "dst.txt");
        assert!(matches!(conflict, TransferError::Conflict { .. }));
        assert_eq!(conflict.detail(), "destination already exists: dst.txt");

        let io_err = TransferError::io("write.copy", "partial.bin", io::Error::other("io"));
        assert!(matches!(io_err, TransferError::Io { .. }));
        assert!(io_err.source().is_some());
        assert!(io_err.detail().starts_with("write.copy failed"));
    }

    #[test]
    fn invalid_request_detail_embeds_client_input() {
        let err = TransferError::invalid_request(
            "path",
            "path escapes the workspace root",
            Some("../../etc/passwd".to_string()),
        );
        assert_eq!(
            err.detail(),
            "path escapes the workspace root: ../../etc/passwd"
        );
    }
}
