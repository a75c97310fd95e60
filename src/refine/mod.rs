//! Iterative refine governor.
//!
//! A refine loop keeps the agent cycling through critique-and-fix passes
//! until it reports no remaining issues, says its completion promise, or
//! runs out of iterations. Loop state lives in
//! `.claude/refine-loop/<kind>/state.local.md`; at most one kind is active.
//!
//! ```text
//! INACTIVE ──state file appears──► ACTIVE
//!    ▲                               │
//!    │                ┌──────────────┴──────────────┐
//!    │          no signal found              signal / bound / fault
//!    │                │                             │
//!    │           CONTINUE                      TERMINATED
//!    │      (iteration + 1, block)                   │
//!    └─────────── state directory removed ◄──────────┘
//! ```

pub mod governor;
pub mod signals;
pub mod state;
pub mod transcript;

use std::path::{Path, PathBuf};

pub use governor::{RefineGovernor, TerminationReason};
pub use signals::TerminationSignal;
pub use state::{RefineLoopState, StateDocument};

/// File name of the state file inside a kind directory.
pub const STATE_FILE_NAME: &str = "state.local.md";

/// A refine-loop kind, e.g. `code` or `tests`. Names one subdirectory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoopKind(String);

impl LoopKind {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LoopKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The active loop found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveLoop {
    pub kind: LoopKind,
    /// `<base>/<kind>`; removed as a whole on termination.
    pub dir: PathBuf,
    pub state_file: PathBuf,
}

/// Find the first kind (in `kinds` order) with a state file under `base`.
#[must_use]
pub fn find_active_loop(base: &Path, kinds: &[LoopKind]) -> Option<ActiveLoop> {
    if !base.is_dir() {
        return None;
    }
    kinds.iter().find_map(|kind| {
        let dir = base.join(kind.as_str());
        let state_file = dir.join(STATE_FILE_NAME);
        state_file.is_file().then(|| ActiveLoop {
            kind: kind.clone(),
            dir,
            state_file,
        })
    })
}
