//! Freshness-based cooldown lock.
//!
//! The lock is a marker file whose modification time is the only thing
//! read. It debounces re-triggering; it is not mutual exclusion, since two
//! invocations can both see a stale lock before either refreshes it.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::persistence::{write_atomic, WriteOutcome, WritePolicy};

/// Cooldown marker at a fixed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownLock {
    path: PathBuf,
    window: Duration,
}

impl CooldownLock {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, window: Duration) -> Self {
        Self {
            path: path.into(),
            window,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Time since the lock was last written, or `None` when there is no
    /// readable lock. Negative when the mtime is in the future.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let modified = std::fs::metadata(&self.path).and_then(|m| m.modified()).ok()?;
        let modified: DateTime<Utc> = modified.into();
        Some(now.signed_duration_since(modified))
    }

    /// Whether the lock exists and is younger than the window at `now`.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let Some(age) = self.age_at(now) else {
            return false;
        };
        let window = chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::MAX);
        let fresh = age < window;
        debug!(
            age_ms = age.num_milliseconds(),
            fresh,
            "Cooldown lock {}",
            self.path.display()
        );
        fresh
    }

    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }

    /// Write or touch the lock. Never fails; a failed write is logged and
    /// reported as skipped.
    pub fn refresh(&self) -> WriteOutcome {
        match write_atomic(&self.path, b"", WritePolicy::BestEffort) {
            Ok(outcome) => outcome,
            // BestEffort never returns Err, but stay total
            Err(e) => WriteOutcome::Skipped(e.to_string()),
        }
    }
}
