//! Test fixtures for governor tests.
//!
//! A fixture is a temporary directory holding a `project/` (session working
//! directory) and a `home/` (user home), wired into a [`GovernorConfig`].

use std::cell::Cell;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::{tasks_dir_for, GovernorConfig};
use crate::refine::STATE_FILE_NAME;

/// A temporary project and home directory pair.
///
/// Automatically cleans up when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new().with_ticket("PROJ-1");
/// fixture.write_task(r#"{"id":"1","status":"pending"}"#);
/// let config = fixture.config();
/// ```
pub struct TestFixture {
    temp_dir: TempDir,
    ticket: Option<String>,
    next_task: Cell<usize>,
}

impl TestFixture {
    /// Create empty project and home directories.
    ///
    /// # Panics
    ///
    /// Panics if temporary directory creation fails.
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::create_dir_all(temp_dir.path().join("project"))
            .expect("Failed to create project directory");
        std::fs::create_dir_all(temp_dir.path().join("home"))
            .expect("Failed to create home directory");

        Self {
            temp_dir,
            ticket: None,
            next_task: Cell::new(1),
        }
    }

    /// Set the active ticket id.
    #[must_use]
    pub fn with_ticket(mut self, ticket: &str) -> Self {
        self.ticket = Some(ticket.to_string());
        self
    }

    #[must_use]
    pub fn project_dir(&self) -> PathBuf {
        self.temp_dir.path().join("project")
    }

    #[must_use]
    pub fn home_dir(&self) -> PathBuf {
        self.temp_dir.path().join("home")
    }

    /// Task directory of the active ticket.
    ///
    /// # Panics
    ///
    /// Panics if no ticket was set.
    #[must_use]
    pub fn tasks_dir(&self) -> PathBuf {
        let ticket = self.ticket.as_deref().expect("fixture has no ticket");
        tasks_dir_for(&self.home_dir(), ticket)
    }

    /// Configuration pointing at this fixture's directories.
    #[must_use]
    pub fn config(&self) -> GovernorConfig {
        let config = GovernorConfig::new(self.project_dir()).with_home_dir(self.home_dir());
        match &self.ticket {
            Some(ticket) => config.with_ticket_id(ticket.clone()),
            None => config,
        }
    }

    /// Write a task record for the active ticket as `<n>.json`.
    ///
    /// # Panics
    ///
    /// Panics if no ticket was set or the write fails.
    pub fn write_task(&self, json: &str) -> PathBuf {
        let ticket = self.ticket.clone().expect("fixture has no ticket");
        self.write_task_for(&ticket, json)
    }

    /// Write a task record for any ticket as `<n>.json`.
    ///
    /// # Panics
    ///
    /// Panics if the write fails.
    pub fn write_task_for(&self, ticket: &str, json: &str) -> PathBuf {
        let n = self.next_task.get();
        self.next_task.set(n + 1);

        let dir = tasks_dir_for(&self.home_dir(), ticket);
        std::fs::create_dir_all(&dir).expect("Failed to create tasks directory");
        let path = dir.join(format!("{n:03}.json"));
        std::fs::write(&path, json).expect("Failed to write task");
        path
    }

    /// Write `.claude/refine-loop/<kind>/state.local.md`.
    ///
    /// # Panics
    ///
    /// Panics if the write fails.
    pub fn write_refine_state(&self, kind: &str, content: &str) -> PathBuf {
        let dir = self.config().refine_base_dir().join(kind);
        std::fs::create_dir_all(&dir).expect("Failed to create refine directory");
        let path = dir.join(STATE_FILE_NAME);
        std::fs::write(&path, content).expect("Failed to write refine state");
        path
    }

    /// Write a JSONL transcript, one record per line.
    ///
    /// # Panics
    ///
    /// Panics if the write fails.
    pub fn write_transcript(&self, lines: &[String]) -> PathBuf {
        let path = self.temp_dir.path().join("transcript.jsonl");
        std::fs::write(&path, lines.join("\n") + "\n").expect("Failed to write transcript");
        path
    }

    /// A transcript record for an assistant message with one text part.
    #[must_use]
    pub fn assistant_line(text: &str) -> String {
        serde_json::json!({
            "type": "assistant",
            "message": {
                "role": "assistant",
                "content": [{"type": "text", "text": text}]
            }
        })
        .to_string()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
