//! Temporary workspace fixtures.
//!
//! Gateway tests need a throwaway directory tree that behaves like a real
//! workspace root: canonical, absolute, and easy to seed with files. The
//! fixture keeps the `TempDir` guard alive so the tree is removed on drop.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// A disposable workspace root backed by a temporary directory.
pub struct TempWorkspace {
    _guard: TempDir,
    root: PathBuf,
}

impl TempWorkspace {
    /// Create a fresh workspace with a canonical root path.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created or
    /// canonicalized.
    pub fn new() -> Result<Self> {
        let guard = tempfile::Builder::new()
            .prefix("wharf-test-")
            .tempdir()
            .context("failed to create temp workspace")?;
        let root = guard
            .path()
            .canonicalize()
            .context("failed to canonicalize temp workspace")?;
        Ok(Self {
            _guard: guard,
            root,
        })
    }

    /// Canonical absolute root of the workspace.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Seed a file at a workspace-relative path, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or the write fails.
    pub fn write_file(&self, relative: &str, contents: &[u8]) -> Result<PathBuf> {
        let target = self.root.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create parents for {relative}"))?;
        }
        fs::write(&target, contents).with_context(|| format!("failed to seed file {relative}"))?;
        Ok(target)
    }

    /// Seed a directory at a workspace-relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn mkdir(&self, relative: &str) -> Result<PathBuf> {
        let target = self.root.join(relative);
        fs::create_dir_all(&target)
            .with_context(|| format!("failed to seed directory {relative}"))?;
        Ok(target)
    }
}
