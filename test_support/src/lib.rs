//! Test utilities shared by Kumade's integration tests.
//!
//! Provides UTF-8 temporary workspaces, manifest writers, helpers that
//! back-date files so staleness can be exercised deterministically, and a
//! loopback HTTP fixture in [`http`].

pub mod http;

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A temporary directory with a UTF-8 path.
#[derive(Debug)]
pub struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    /// Create an empty workspace.
    ///
    /// # Errors
    ///
    /// Fails when the temporary directory cannot be created or its path is
    /// not valid UTF-8.
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("create temp dir")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|p| anyhow!("temp dir {} is not UTF-8", p.display()))?;
        Ok(Self { _dir: dir, root })
    }

    /// Root directory of the workspace.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Absolute path of `rel` inside the workspace.
    pub fn path(&self, rel: &str) -> Utf8PathBuf {
        self.root.join(rel)
    }

    /// Write `Kumadefile` with `yaml`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be written.
    pub fn write_manifest(&self, yaml: &str) -> Result<Utf8PathBuf> {
        self.write("Kumadefile", yaml)
    }

    /// Write `contents` to `rel`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails when the file or its parents cannot be created.
    pub fn write(&self, rel: &str, contents: &str) -> Result<Utf8PathBuf> {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {parent}"))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {path}"))?;
        Ok(path)
    }

    /// Set the modification time of `rel` to `secs_ago` seconds in the past.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened or its time cannot be set.
    pub fn age(&self, rel: &str, secs_ago: u64) -> Result<()> {
        let when = SystemTime::now()
            .checked_sub(Duration::from_secs(secs_ago))
            .context("time underflow")?;
        set_mtime(&self.path(rel), when)
    }

    /// Modification time of `rel`, following links.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be inspected.
    pub fn mtime(&self, rel: &str) -> Result<SystemTime> {
        let path = self.path(rel);
        fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .with_context(|| format!("stat {path}"))
    }
}

/// Set the modification time of a file or directory.
///
/// # Errors
///
/// Fails when the file cannot be opened or updated.
pub fn set_mtime(path: &Utf8Path, when: SystemTime) -> Result<()> {
    // Read-only handles work for directories too.
    let file = File::open(path).with_context(|| format!("open {path}"))?;
    file.set_modified(when)
        .with_context(|| format!("set mtime of {path}"))
}
