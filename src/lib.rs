//! Stop Governor - continuation governors for agent stop hooks
//!
//! When an agent session tries to end its turn, the host runs a stop hook.
//! The governors in this crate decide whether the session should be kept
//! going with a re-injected instruction, or allowed to stop.
//!
//! # Architecture
//!
//! - [`refine`] - Iterative refine loop driven by a state file and the
//!   agent's last message
//! - [`task`] - Task records, dependency readiness classification
//! - [`trigger`] - Execution trigger for executable autoRun tasks, with a
//!   cooldown lock
//! - [`hooks`] - Stop-hook adapter: input payload, decision output, fail-open
//! - [`config`] - Runtime configuration and project overrides
//! - [`persistence`] - Atomic writes and file locks
//! - [`error`] - Custom error types and handling
//!
//! # Example
//!
//! ```rust,ignore
//! use stop_governor::config::GovernorConfig;
//! use stop_governor::hooks::{run_stop_hook, HookInput, HookKind};
//!
//! let config = GovernorConfig::from_env(".");
//! let input = HookInput::parse(&raw_stdin);
//! if let Some(line) = run_stop_hook(HookKind::RefineLoop, &input, &config) {
//!     println!("{}", line);
//! }
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod persistence;
pub mod refine;
pub mod task;
pub mod testing;
pub mod trigger;

// Re-export commonly used types
pub use error::{GovernorError, Result};

pub use config::{GovernorConfig, GovernorSettings};

pub use hooks::{evaluate_hook, run_stop_hook, HookInput, HookKind, StopDecision};

pub use refine::{RefineGovernor, RefineLoopState, TerminationReason, TerminationSignal};

pub use task::{classify, find_executable, load_tasks, Classification, Task, TaskGraph, TaskStatus};

pub use trigger::{CooldownLock, ExecutionTrigger};
