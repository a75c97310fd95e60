//! Decision logic for one stop event of a refine loop.

use tracing::{info, warn};

use super::signals::{self, TerminationSignal};
use super::state::{RefineLoopState, StateDocument};
use super::transcript::{last_assistant_message, normalize_transcript_path};
use super::{find_active_loop, ActiveLoop, LoopKind};
use crate::config::GovernorConfig;
use crate::error::Result;
use crate::hooks::StopDecision;
use crate::persistence::{remove_dir_best_effort, write_atomic, FileLockGuard, WritePolicy};

/// Why an active loop was ended and its state removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// `iteration` or `max_iterations` unusable.
    InvalidState(String),
    MaxIterations(u32),
    MissingTranscriptPath,
    NoAssistantMessage,
    Signal(TerminationSignal),
    EmptyPrompt,
}

impl TerminationReason {
    /// Normal completion, as opposed to a fault in the loop's inputs.
    #[must_use]
    pub fn is_completion(&self) -> bool {
        matches!(self, Self::Signal(_) | Self::MaxIterations(_))
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidState(detail) => write!(f, "{detail}"),
            Self::MaxIterations(max) => write!(f, "Refine loop: Max iterations ({max}) reached."),
            Self::MissingTranscriptPath => write!(f, "Refine loop: No transcript path in hook input"),
            Self::NoAssistantMessage => write!(f, "Refine loop: No assistant messages found"),
            Self::Signal(signal) => write!(f, "Refine loop: {signal}"),
            Self::EmptyPrompt => write!(f, "Refine loop: No prompt text found"),
        }
    }
}

/// Result of evaluating an active loop, before cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Continue(StopDecision),
    Terminate(TerminationReason),
}

/// Governor for the refine loop.
#[derive(Debug, Clone)]
pub struct RefineGovernor<'a> {
    config: &'a GovernorConfig,
}

impl<'a> RefineGovernor<'a> {
    #[must_use]
    pub fn new(config: &'a GovernorConfig) -> Self {
        Self { config }
    }

    fn kinds(&self) -> Vec<LoopKind> {
        self.config
            .settings
            .refine_kinds
            .iter()
            .map(LoopKind::new)
            .collect()
    }

    /// The loop that would be evaluated, if any.
    #[must_use]
    pub fn active_loop(&self) -> Option<ActiveLoop> {
        find_active_loop(&self.config.refine_base_dir(), &self.kinds())
    }

    /// Evaluate one stop event.
    ///
    /// `Ok(None)` allows the stop; when a loop was terminated it has been
    /// removed. A loop whose lock is held by another invocation is left
    /// alone. `Err` means the invocation failed without touching the
    /// loop's state (for example the iteration could not be persisted).
    pub fn evaluate(&self, transcript_path: Option<&str>) -> Result<Option<StopDecision>> {
        let Some(active) = self.active_loop() else {
            return Ok(None);
        };

        // Held until the state is written or the directory is removed
        let Some(_lock) = FileLockGuard::try_acquire(&active.state_file)? else {
            info!(kind = %active.kind, "Refine loop: state is locked by another invocation, allowing stop");
            return Ok(None);
        };

        match step(&active, transcript_path)? {
            Step::Continue(decision) => Ok(Some(decision)),
            Step::Terminate(reason) => {
                if reason.is_completion() {
                    info!(kind = %active.kind, "{}", reason);
                } else {
                    warn!(kind = %active.kind, "{}", reason);
                }
                remove_dir_best_effort(&active.dir);
                Ok(None)
            }
        }
    }
}

fn step(active: &ActiveLoop, transcript_path: Option<&str>) -> Result<Step> {
    let content = std::fs::read_to_string(&active.state_file)?;
    let mut doc = StateDocument::parse(&content);

    let state = match RefineLoopState::from_document(&doc) {
        Ok(state) => state,
        Err(e) => return Ok(Step::Terminate(TerminationReason::InvalidState(e.to_string()))),
    };

    if state.is_exhausted() {
        return Ok(Step::Terminate(TerminationReason::MaxIterations(
            state.max_iterations,
        )));
    }

    let Some(transcript_path) = transcript_path.filter(|p| !p.trim().is_empty()) else {
        return Ok(Step::Terminate(TerminationReason::MissingTranscriptPath));
    };

    let Some(message) = last_assistant_message(&normalize_transcript_path(transcript_path))? else {
        return Ok(Step::Terminate(TerminationReason::NoAssistantMessage));
    };

    if let Some(signal) = signals::detect(&message, state.completion_promise.as_deref()) {
        return Ok(Step::Terminate(TerminationReason::Signal(signal)));
    }

    if state.prompt.is_empty() {
        return Ok(Step::Terminate(TerminationReason::EmptyPrompt));
    }

    let next = state.iteration.saturating_add(1);
    doc.set_field("iteration", &next.to_string());
    write_atomic(&active.state_file, doc.render().as_bytes(), WritePolicy::Required)?;

    info!(kind = %active.kind, iteration = next, "Refine loop continuing");
    Ok(Step::Continue(StopDecision::block(
        state.prompt.clone(),
        state.status_line(next),
    )))
}
