//! Write policies and atomic file operations.
//!
//! Each write names its policy up front. A best-effort write (the cooldown
//! lock) logs and swallows failures; a required write (refine-loop state)
//! returns them so the caller can void its decision.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::{GovernorError, Result};

/// Temporary file suffix for atomic writes.
const TMP_SUFFIX: &str = ".tmp";

/// Lock file suffix for serialized read-modify-write.
const LOCK_SUFFIX: &str = ".lock";

/// How a failed write is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Failures are logged and reported as [`WriteOutcome::Skipped`].
    BestEffort,
    /// Failures are returned as [`GovernorError::RequiredWrite`].
    Required,
}

/// What happened to a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The content is on disk.
    Written,
    /// A best-effort write failed; the reason was logged.
    Skipped(String),
}

impl WriteOutcome {
    /// Whether the write landed.
    #[must_use]
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written)
    }
}

/// Write `contents` to `path` atomically (temp file + rename), creating
/// parent directories as needed.
pub fn write_atomic(path: &Path, contents: &[u8], policy: WritePolicy) -> Result<WriteOutcome> {
    match try_write_atomic(path, contents) {
        Ok(()) => Ok(WriteOutcome::Written),
        Err(source) => match policy {
            WritePolicy::BestEffort => {
                warn!("Best-effort write to {} failed: {}", path.display(), source);
                Ok(WriteOutcome::Skipped(source.to_string()))
            }
            WritePolicy::Required => Err(GovernorError::RequiredWrite {
                path: path.to_path_buf(),
                source,
            }),
        },
    }
}

fn try_write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = sibling_with_suffix(path, TMP_SUFFIX);
    let result = (|| {
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(contents)?;
        tmp_file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Remove a directory tree, ignoring failures.
///
/// Returns whether the directory is gone afterwards.
pub fn remove_dir_best_effort(dir: &Path) -> bool {
    if !dir.exists() {
        return true;
    }
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!("Removed {}", dir.display());
            true
        }
        Err(e) => {
            warn!("Failed to remove {}: {}", dir.display(), e);
            false
        }
    }
}

/// Path next to `path` with `suffix` appended to its file name.
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Exclusive advisory lock held on `<file>.lock` until dropped.
#[derive(Debug)]
pub struct FileLockGuard {
    file: File,
    path: PathBuf,
}

impl FileLockGuard {
    /// Take the exclusive lock guarding `target` without waiting.
    ///
    /// Returns `Ok(None)` when another process holds it.
    pub fn try_acquire(target: &Path) -> Result<Option<Self>> {
        let path = sibling_with_suffix(target, LOCK_SUFFIX);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| GovernorError::lock(path.clone(), e.to_string()))?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(Self { file, path })),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                debug!("Lock {} is held elsewhere", path.display());
                Ok(None)
            }
            Err(e) => Err(GovernorError::lock(path, e.to_string())),
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
