//! Configuration for the stop governors.
//!
//! Everything a governor needs from its environment is resolved once, by the
//! hosting adapter, into a [`GovernorConfig`] value. Governors never read the
//! process environment themselves, which keeps them testable against temp
//! directories.
//!
//! Project-level overrides live in `.claude/settings.json` under the
//! `stopGovernor` key:
//!
//! ```json
//! {
//!   "stopGovernor": {
//!     "cooldownSeconds": 60,
//!     "refineKinds": ["code", "tests", "ui-tests", "skills", "docs", "ac"]
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{GovernorError, Result};

/// Environment variable carrying the active ticket (task list) id.
pub const TASK_LIST_ID_ENV: &str = "CLAUDE_CODE_TASK_LIST_ID";

/// Default cooldown window for the execution trigger.
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

/// Loop kinds scanned by the refine governor, in priority order.
pub const DEFAULT_REFINE_KINDS: &[&str] = &["code", "tests", "ui-tests", "skills", "docs", "ac"];

fn default_cooldown_seconds() -> u64 {
    DEFAULT_COOLDOWN_SECS
}

fn default_refine_kinds() -> Vec<String> {
    DEFAULT_REFINE_KINDS.iter().map(|k| (*k).to_string()).collect()
}

/// Project overrides read from `.claude/settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernorSettings {
    /// Seconds a fresh task-runner lock suppresses re-triggering.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,

    /// Ordered loop-kind subdirectories the refine governor scans.
    #[serde(default = "default_refine_kinds")]
    pub refine_kinds: Vec<String>,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown_seconds(),
            refine_kinds: default_refine_kinds(),
        }
    }
}

/// Shape of the settings file; only our section is read.
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default, rename = "stopGovernor")]
    stop_governor: Option<GovernorSettings>,
}

impl GovernorSettings {
    /// Load overrides from a project directory.
    ///
    /// A missing settings file or a file without a `stopGovernor` section
    /// yields the defaults.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let settings_path = Self::settings_path(project_dir);
        if !settings_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&settings_path)?;
        let file: SettingsFile = serde_json::from_str(&content).map_err(|e| {
            GovernorError::config_with_path(e.to_string(), settings_path.clone())
        })?;

        let settings = file.stop_governor.unwrap_or_default();
        settings.validate()?;
        Ok(settings)
    }

    /// Load overrides, falling back to defaults with a warning.
    pub fn load_or_default(project_dir: &Path) -> Self {
        match Self::load(project_dir) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring stop governor settings: {}", e);
                Self::default()
            }
        }
    }

    /// Get the settings.json path for a project
    pub fn settings_path(project_dir: &Path) -> PathBuf {
        project_dir.join(".claude/settings.json")
    }

    /// Kind names become directory names, so they must be single plain
    /// path components.
    fn validate(&self) -> Result<()> {
        for kind in &self.refine_kinds {
            let plain = !kind.is_empty()
                && kind != "."
                && kind != ".."
                && !kind.contains(['/', '\\']);
            if !plain {
                return Err(GovernorError::config(format!(
                    "refineKinds entry '{kind}' is not a plain directory name"
                )));
            }
        }
        Ok(())
    }
}

/// Resolved runtime configuration handed to each governor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GovernorConfig {
    /// Project (session working) directory; owns `.claude/`.
    pub project_dir: PathBuf,
    /// Home directory; owns `.claude/tasks/`.
    pub home_dir: Option<PathBuf>,
    /// Active ticket id scoping the task directory.
    pub ticket_id: Option<String>,
    /// Project overrides.
    pub settings: GovernorSettings,
}

impl GovernorConfig {
    /// Create a configuration with no home, no ticket and default settings.
    #[must_use]
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            home_dir: None,
            ticket_id: None,
            settings: GovernorSettings::default(),
        }
    }

    /// Resolve configuration from the process environment and the
    /// project's settings file.
    #[must_use]
    pub fn from_env(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let settings = GovernorSettings::load_or_default(&project_dir);
        let mut config = Self::new(project_dir).with_settings(settings);
        if let Some(home) = home_dir_from(|key| std::env::var_os(key)) {
            config = config.with_home_dir(home);
        }
        if let Ok(ticket) = std::env::var(TASK_LIST_ID_ENV) {
            config = config.with_ticket_id(ticket);
        }
        debug!(?config, "Resolved governor configuration");
        config
    }

    /// Set the home directory.
    #[must_use]
    pub fn with_home_dir(mut self, home: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home.into());
        self
    }

    /// Set the ticket id; blank ids count as absent.
    #[must_use]
    pub fn with_ticket_id(mut self, ticket: impl Into<String>) -> Self {
        self.ticket_id = Some(ticket.into());
        self.normalized()
    }

    /// Replace the project settings.
    #[must_use]
    pub fn with_settings(mut self, settings: GovernorSettings) -> Self {
        self.settings = settings;
        self
    }

    fn normalized(mut self) -> Self {
        self.ticket_id = self
            .ticket_id
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }

    /// Directory holding one subdirectory per refine-loop kind.
    #[must_use]
    pub fn refine_base_dir(&self) -> PathBuf {
        self.project_dir.join(".claude").join("refine-loop")
    }

    /// Cooldown lock written by the execution trigger.
    #[must_use]
    pub fn trigger_lock_path(&self) -> PathBuf {
        self.project_dir.join(".claude").join("task-runner.lock")
    }

    /// Task directory for the active ticket, when both home and ticket are known.
    #[must_use]
    pub fn tasks_dir(&self) -> Option<PathBuf> {
        let home = self.home_dir.as_ref()?;
        let ticket = self.ticket_id.as_ref()?;
        Some(tasks_dir_for(home, ticket))
    }

    /// Cooldown window as a duration.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.settings.cooldown_seconds)
    }
}

/// Task directory for a ticket under a home directory.
pub fn tasks_dir_for(home: &Path, ticket: &str) -> PathBuf {
    home.join(".claude").join("tasks").join(ticket)
}

/// First non-empty of `HOME` and `USERPROFILE`. There is no platform
/// fallback: without either variable the home is unknown.
fn home_dir_from<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    ["HOME", "USERPROFILE"]
        .into_iter()
        .filter_map(lookup)
        .find(|v| !v.is_empty())
        .map(PathBuf::from)
}
