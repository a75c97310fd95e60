//! Termination signals in the agent's last message.
//!
//! Three literal signals end a refine loop, checked in this order:
//!
//! 1. all remaining issues unfixable: `UNFIXABLE_COUNT = N` (N > 0) together
//!    with `ISSUE_COUNT = 0`
//! 2. nothing left to fix: `ISSUE_COUNT = 0`
//! 3. the configured completion promise: `<promise>VALUE</promise>`

use regex::Regex;
use std::sync::LazyLock;

static ZERO_ISSUES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ISSUE_COUNT\s*=\s*0(?:\D|$)").expect("valid issue regex"));

static UNFIXABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"UNFIXABLE_COUNT\s*=\s*[1-9]").expect("valid unfixable regex"));

/// Why a refine loop should end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationSignal {
    AllUnfixable,
    ZeroIssues,
    CompletionPromise(String),
}

impl std::fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllUnfixable => write!(f, "All remaining issues are unfixable. Loop complete."),
            Self::ZeroIssues => write!(f, "ISSUE_COUNT = 0 detected. Loop complete."),
            Self::CompletionPromise(p) => write!(f, "<promise>{p}</promise> detected."),
        }
    }
}

#[must_use]
pub fn has_zero_issue_count(message: &str) -> bool {
    ZERO_ISSUES.is_match(message)
}

#[must_use]
pub fn has_all_unfixable(message: &str) -> bool {
    UNFIXABLE.is_match(message) && has_zero_issue_count(message)
}

/// Whether `<promise>PROMISE</promise>` appears verbatim.
#[must_use]
pub fn has_completion_promise(message: &str, promise: Option<&str>) -> bool {
    match promise {
        Some(p) if !p.is_empty() && p != "null" => {
            message.contains(&format!("<promise>{p}</promise>"))
        }
        _ => false,
    }
}

/// First matching termination signal, if any.
#[must_use]
pub fn detect(message: &str, promise: Option<&str>) -> Option<TerminationSignal> {
    if has_all_unfixable(message) {
        Some(TerminationSignal::AllUnfixable)
    } else if has_zero_issue_count(message) {
        Some(TerminationSignal::ZeroIssues)
    } else if has_completion_promise(message, promise) {
        promise.map(|p| TerminationSignal::CompletionPromise(p.to_string()))
    } else {
        None
    }
}
