//! Execution trigger governor.
//!
//! On every stop event, checks whether the active ticket has a task that is
//! pending, flagged `autoRun`, and unblocked. If so, asks the host to keep
//! going and refreshes the cooldown lock so the next stop event within the
//! window is let through.

pub mod cooldown;

use std::path::Path;
use tracing::{debug, info};

use crate::config::{tasks_dir_for, GovernorConfig};
use crate::error::{GovernorError, Result};
use crate::hooks::StopDecision;
use crate::task::{find_executable, load_tasks};

pub use cooldown::CooldownLock;

/// Instruction re-injected when executable tasks exist.
pub const TRIGGER_INSTRUCTION: &str = "Check the TaskList and run any task that meets the autoRun conditions (status: pending, metadata.autoRun: true, every blockedBy task completed). If no task qualifies, finish without reporting.";

/// Governor deciding whether outstanding autoRun work should keep the session alive.
#[derive(Debug, Clone)]
pub struct ExecutionTrigger<'a> {
    config: &'a GovernorConfig,
}

impl<'a> ExecutionTrigger<'a> {
    #[must_use]
    pub fn new(config: &'a GovernorConfig) -> Self {
        Self { config }
    }

    /// Evaluate one stop event using the configured ticket, home and lock.
    ///
    /// A missing ticket id or home directory means there is nothing to do.
    pub fn run(&self) -> Result<Option<StopDecision>> {
        match self.try_run() {
            Err(e) if e.is_recoverable() => {
                debug!("task-runner: {}, allowing stop", e);
                Ok(None)
            }
            other => other,
        }
    }

    fn try_run(&self) -> Result<Option<StopDecision>> {
        let ticket = self
            .config
            .ticket_id
            .as_deref()
            .ok_or_else(|| GovernorError::missing_input("ticket id"))?;

        let lock = CooldownLock::new(self.config.trigger_lock_path(), self.config.cooldown());
        if lock.is_fresh() {
            debug!(
                window_secs = lock.window().as_secs(),
                "task-runner: cooldown lock is fresh, allowing stop"
            );
            return Ok(None);
        }

        let home = self
            .config
            .home_dir
            .as_deref()
            .ok_or_else(|| GovernorError::missing_input("home directory"))?;

        evaluate(&tasks_dir_for(home, ticket), &lock)
    }
}

/// Decide from a task directory and a cooldown lock.
///
/// A fresh lock short-circuits before anything is read. The lock is only
/// refreshed when a block decision is returned, and a failed refresh does
/// not change the decision.
pub fn evaluate(tasks_dir: &Path, lock: &CooldownLock) -> Result<Option<StopDecision>> {
    if lock.is_fresh() {
        return Ok(None);
    }

    let report = load_tasks(tasks_dir)?;
    if report.graph.is_empty() {
        return Ok(None);
    }

    let executable = find_executable(&report.graph);
    if executable.is_empty() {
        debug!("task-runner: {} tasks, none executable", report.graph.len());
        return Ok(None);
    }

    lock.refresh();
    info!(tasks = ?executable, "task-runner: autoRun tasks detected");

    Ok(Some(StopDecision::block(
        TRIGGER_INSTRUCTION,
        format!(
            "task-runner: {} autoRun task(s) detected",
            executable.len()
        ),
    )))
}
