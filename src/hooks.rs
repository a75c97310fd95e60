//! Stop-hook adapter.
//!
//! The host runs a hook command when the agent's turn ends, passing a JSON
//! payload on stdin. The adapter runs exactly one governor and answers with
//! either nothing (the session may stop) or a block decision:
//!
//! ```json
//! {"decision":"block","reason":"<instruction>","systemMessage":"<status>"}
//! ```
//!
//! Every failure inside a governor ends in an allow-stop. The error is
//! logged to stderr and the process still exits successfully.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::GovernorConfig;
use crate::error::Result;
use crate::refine::RefineGovernor;
use crate::trigger::ExecutionTrigger;

/// Governors that can be run as a stop hook
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum HookKind {
    /// Keep a bounded critique-and-fix loop running
    RefineLoop,
    /// Continue while autoRun tasks are executable
    TaskRunner,
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookKind::RefineLoop => write!(f, "refine-loop"),
            HookKind::TaskRunner => write!(f, "task-runner"),
        }
    }
}

/// Payload the host sends with a stop event. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub hook_event_name: Option<String>,
}

impl HookInput {
    /// Parse the raw payload; anything that is not a JSON object yields an
    /// empty input.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(input) => input,
            Err(e) => {
                debug!("Hook input is not valid JSON ({}), using empty input", e);
                Self::default()
            }
        }
    }
}

/// Decision marker. Only blocking is ever emitted; allowing is silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Block,
}

/// A request to keep the session going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopDecision {
    pub decision: DecisionKind,
    /// Instruction re-injected into the session, verbatim.
    pub reason: String,
    /// Short human-readable status line.
    #[serde(rename = "systemMessage")]
    pub system_message: String,
}

impl StopDecision {
    /// Create a block decision.
    pub fn block(reason: impl Into<String>, system_message: impl Into<String>) -> Self {
        Self {
            decision: DecisionKind::Block,
            reason: reason.into(),
            system_message: system_message.into(),
        }
    }

    /// Serialize for the host's response channel.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Run one governor for a stop event.
pub fn evaluate_hook(
    kind: HookKind,
    input: &HookInput,
    config: &GovernorConfig,
) -> Result<Option<StopDecision>> {
    debug!(
        hook = %kind,
        session = input.session_id.as_deref().unwrap_or("-"),
        event = input.hook_event_name.as_deref().unwrap_or("-"),
        "Evaluating stop hook"
    );
    match kind {
        HookKind::RefineLoop => {
            RefineGovernor::new(config).evaluate(input.transcript_path.as_deref())
        }
        HookKind::TaskRunner => ExecutionTrigger::new(config).run(),
    }
}

/// Run one governor and fail open: errors are logged and become allow-stop.
///
/// Returns the response line to print, if any.
#[must_use]
pub fn run_stop_hook(kind: HookKind, input: &HookInput, config: &GovernorConfig) -> Option<String> {
    let decision = match evaluate_hook(kind, input, config) {
        Ok(decision) => decision?,
        Err(e) => {
            if e.is_fatal() {
                error!("{}: {}", kind, e);
            } else {
                warn!("{}: {}", kind, e);
            }
            return None;
        }
    };

    match decision.to_json() {
        Ok(line) => Some(line),
        Err(e) => {
            error!("{}: failed to encode decision: {}", kind, e);
            None
        }
    }
}
