//! Loading a ticket's task directory into a [`TaskGraph`].

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{Task, TaskGraph};
use crate::error::{GovernorError, Result};

/// Result of loading a task directory.
#[derive(Debug, Clone, Default)]
pub struct TaskLoadReport {
    /// Every record that parsed and carried an id.
    pub graph: TaskGraph,
    /// Files that were skipped (unreadable, invalid JSON, missing id or status).
    pub skipped: Vec<PathBuf>,
}

impl TaskLoadReport {
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Load every `*.json` record directly inside `dir`.
///
/// A missing directory is an empty graph. Bad records are skipped with a
/// warning and counted; only a directory that cannot be listed is an error.
/// Files are visited in name order, so a duplicated id resolves the same way
/// on every run (the last file wins).
pub fn load_tasks(dir: &Path) -> Result<TaskLoadReport> {
    let mut report = TaskLoadReport::default();

    if !dir.exists() {
        debug!("Task directory {} does not exist", dir.display());
        return Ok(report);
    }
    if !dir.is_dir() {
        return Err(GovernorError::TaskDirectory {
            path: dir.to_path_buf(),
            message: format!("{} is not a directory", dir.display()),
        });
    }

    let entries = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(GovernorError::TaskDirectory {
                    path: dir.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                warn!("Warning: Skipping unreadable entry in {}: {}", dir.display(), e);
                report.skipped.push(e.path().map(Path::to_path_buf).unwrap_or_default());
                continue;
            }
        };

        let path = entry.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        if !entry.file_type().is_file() || !is_json {
            continue;
        }

        match read_task(path) {
            Ok(task) => {
                if let Some(previous) = report.graph.insert(task) {
                    debug!("Task id {} redefined by {}", previous.id, path.display());
                }
            }
            Err(e) => {
                warn!("Warning: Skipping {}", e);
                report.skipped.push(path.to_path_buf());
            }
        }
    }

    debug!(
        loaded = report.graph.len(),
        skipped = report.skipped_count(),
        "Loaded tasks from {}",
        dir.display()
    );
    Ok(report)
}

fn read_task(path: &Path) -> Result<Task> {
    let invalid = |reason: String| GovernorError::InvalidTask {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let task: Task = serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;

    if task.id.trim().is_empty() {
        return Err(invalid("file without id".to_string()));
    }
    Ok(task)
}
