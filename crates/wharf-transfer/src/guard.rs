//! Workspace root resolution and path validation.
//!
//! # Design
//! - Single choke-point: every client-supplied path flows through
//!   [`WorkspaceRoot::resolve`] before any filesystem call.
//! - Lexical normalisation first, then canonicalisation of the longest
//!   existing ancestor, so symlinks cannot smuggle a path outside the root.
//! - The containment check is segment-wise, so `/workspace-evil` never
//!   matches a root of `/workspace`.

use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

use crate::error::{TransferError, TransferResult};

/// Canonical, absolute workspace subtree the gateway is scoped to.
///
/// Immutable for the process lifetime; cloning shares the same canonical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceRoot(PathBuf);

impl WorkspaceRoot {
    /// Open a workspace root, creating the directory when missing and
    /// canonicalizing the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or canonicalized.
    pub fn open(path: impl Into<PathBuf>) -> TransferResult<Self> {
        let requested: PathBuf = path.into();
        std::fs::create_dir_all(&requested)
            .map_err(|err| TransferError::io("root.create", &requested, err))?;
        let canonical = requested
            .canonicalize()
            .map_err(|err| TransferError::io("root.canonicalize", &requested, err))?;
        Ok(Self(canonical))
    }

    /// The canonical root path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Resolve a client-supplied path against the workspace root.
    ///
    /// Equivalent prefix forms (`.`, leading `/`, leading `./`) resolve to the
    /// same canonical path. Inputs whose `..` segments would land outside the
    /// root are rejected with the original input embedded for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the input is empty or escapes the
    /// workspace, and an IO error when canonicalization fails.
    pub fn resolve(&self, raw: &str) -> TransferResult<PathBuf> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TransferError::invalid_request(
                "path",
                "path must not be empty",
                None,
            ));
        }

        let candidate = self.0.join(normalize_fragment(trimmed));
        let resolved = self.canonicalize_candidate(&candidate)?;
        if !resolved.starts_with(&self.0) {
            return Err(TransferError::invalid_request(
                "path",
                "path escapes the workspace root",
                Some(raw.to_string()),
            ));
        }
        Ok(resolved)
    }

    /// Workspace-relative rendering of a resolved path, `.` for the root itself.
    #[must_use]
    pub fn relative_string(&self, resolved: &Path) -> String {
        match resolved.strip_prefix(&self.0) {
            Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
            Ok(relative) => relative.display().to_string(),
            Err(_) => resolved.display().to_string(),
        }
    }

    /// Canonicalize the longest existing ancestor and re-join the missing
    /// tail, so paths that do not exist yet (write targets) still resolve.
    fn canonicalize_candidate(&self, candidate: &Path) -> TransferResult<PathBuf> {
        let mut existing = candidate.to_path_buf();
        let mut pending: Vec<OsString> = Vec::new();
        while existing.symlink_metadata().is_err() {
            let Some(name) = existing.file_name().map(OsStr::to_os_string) else {
                break;
            };
            pending.push(name);
            if !existing.pop() {
                break;
            }
        }
        let mut resolved = existing
            .canonicalize()
            .map_err(|err| TransferError::io("guard.canonicalize", &existing, err))?;
        for name in pending.iter().rev() {
            resolved.push(name);
        }
        Ok(resolved)
    }
}

/// Collapse `.` segments and interior `..` segments while preserving leading
/// parent references, and strip any root prefix so the fragment always joins
/// under the workspace root.
fn normalize_fragment(raw: &str) -> PathBuf {
    let mut parts: Vec<&OsStr> = Vec::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|last| *last != OsStr::new("..")) {
                    parts.pop();
                } else {
                    parts.push(OsStr::new(".."));
                }
            }
            Component::Normal(part) => parts.push(part),
        }
    }
    parts.iter().collect()
}
