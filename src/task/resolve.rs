//! The `tasks resolve` report.
//!
//! Always produces a JSON object: either the classification of a ticket's
//! tasks or `{"error": "..."}`. Callers never see a process failure.

use serde::Serialize;
use std::path::Path;
use tracing::debug;

use super::readiness::{classify, Classification};
use super::store::load_tasks;
use crate::config::tasks_dir_for;
use crate::error::Result;

/// Classification plus the number of skipped records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    #[serde(flatten)]
    pub classification: Classification,
    #[serde(rename = "skippedCount", skip_serializing_if = "Option::is_none")]
    pub skipped_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResolveOutput {
    Report(ResolveReport),
    Error { error: String },
}

impl ResolveOutput {
    fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Classify the tasks of `ticket` under `home`.
///
/// Blank `ticket` and `filter` values count as absent.
#[must_use]
pub fn resolve(home: Option<&Path>, ticket: Option<&str>, filter: Option<&str>) -> ResolveOutput {
    let Some(ticket) = ticket.map(str::trim).filter(|t| !t.is_empty()) else {
        return ResolveOutput::error("TICKET_ID is required");
    };
    let Some(home) = home else {
        return ResolveOutput::error("HOME directory not found");
    };
    let filter = filter.map(str::trim).filter(|f| !f.is_empty());

    let dir = tasks_dir_for(home, ticket);
    let report = match load_tasks(&dir) {
        Ok(report) => report,
        Err(e) => return ResolveOutput::error(e.to_string()),
    };
    debug!(
        ticket,
        tasks = report.graph.len(),
        skipped = report.skipped_count(),
        "Resolved task directory"
    );

    let skipped = report.skipped_count();
    ResolveOutput::Report(ResolveReport {
        classification: classify(&report.graph, filter),
        skipped_count: (skipped > 0).then_some(skipped),
    })
}
