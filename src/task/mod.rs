//! Task records and the task graph.
//!
//! Task records are written by the host's task tooling, one JSON file per
//! task. This crate only reads them. A record is accepted when it has a
//! non-empty `id` and a `status`; everything else is optional.
//!
//! ```json
//! {
//!   "id": "3",
//!   "subject": "Implement: parser",
//!   "status": "pending",
//!   "blockedBy": ["1", "2"],
//!   "metadata": { "autoRun": true }
//! }
//! ```

pub mod readiness;
pub mod resolve;
pub mod store;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

pub use readiness::{classify, find_executable, is_executable, is_ready, Classification};
pub use resolve::{resolve, ResolveOutput, ResolveReport};
pub use store::{load_tasks, TaskLoadReport};

/// Task status. Values other than `pending` and `completed` are kept as-is
/// and never count as ready or completed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Completed,
    Other(String),
}

impl TaskStatus {
    /// Status string as written in the record.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Self::Pending,
            "completed" => Self::Completed,
            _ => Self::Other(s),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// Optional task metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    /// Opt-in for automatic triggering. Only a literal `true` counts.
    #[serde(default, deserialize_with = "strict_true")]
    pub auto_run: bool,
}

/// Any value other than boolean `true` (strings, numbers, null) is false.
fn strict_true<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value == serde_json::Value::Bool(true))
}

/// A unit of outstanding work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Authoritative id; the file name is irrelevant.
    pub id: String,
    pub status: TaskStatus,
    /// Ids this task waits on.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub blocked_by: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: TaskMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TaskMetadata, D::Error> {
    Ok(Option::<TaskMetadata>::deserialize(deserializer)?.unwrap_or_default())
}

impl Task {
    /// Create a pending task with no blockers.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::Pending,
            blocked_by: Vec::new(),
            metadata: TaskMetadata::default(),
            subject: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn completed(self) -> Self {
        self.with_status(TaskStatus::Completed)
    }

    #[must_use]
    pub fn with_blockers<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_by = ids.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_auto_run(mut self, enabled: bool) -> Self {
        self.metadata.auto_run = enabled;
        self
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Whether the subject contains `filter`. Tasks without a subject never match.
    #[must_use]
    pub fn subject_matches(&self, filter: &str) -> bool {
        self.subject.as_deref().is_some_and(|s| s.contains(filter))
    }
}

/// Tasks keyed by id. Ordered, so every walk over the graph is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskGraph {
    tasks: BTreeMap<String, Task>,
}

impl TaskGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task, replacing any task with the same id.
    pub fn insert(&mut self, task: Task) -> Option<Task> {
        self.tasks.insert(task.id.clone(), task)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// A blocker is resolved when it is absent from the graph or completed.
    #[must_use]
    pub fn is_resolved(&self, blocker_id: &str) -> bool {
        self.get(blocker_id)
            .is_none_or(|blocker| blocker.status == TaskStatus::Completed)
    }
}

impl FromIterator<Task> for TaskGraph {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        let mut graph = Self::new();
        for task in iter {
            graph.insert(task);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_record() {
        let json = r#"{
            "id": "3",
            "subject": "Implement: parser",
            "description": "ignored",
            "status": "pending",
            "blockedBy": ["1", "2"],
            "blocks": [],
            "metadata": {"autoRun": true, "owner": "x"}
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, "3");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.blocked_by, vec!["1", "2"]);
        assert!(task.metadata.auto_run);
        assert_eq!(task.subject.as_deref(), Some("Implement: parser"));
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let task: Task = serde_json::from_str(r#"{"id":"1","status":"completed"}"#).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.blocked_by.is_empty());
        assert!(!task.metadata.auto_run);
        assert!(task.subject.is_none());
    }

    #[test]
    fn test_null_optionals_are_defaults() {
        let task: Task =
            serde_json::from_str(r#"{"id":"1","status":"pending","blockedBy":null,"metadata":null}"#)
                .unwrap();
        assert!(task.blocked_by.is_empty());
        assert!(!task.metadata.auto_run);
    }

    #[test]
    fn test_auto_run_requires_literal_true() {
        for raw in [r#""true""#, "1", "null", "false"] {
            let json = format!(r#"{{"id":"1","status":"pending","metadata":{{"autoRun":{raw}}}}}"#);
            let task: Task = serde_json::from_str(&json).unwrap();
            assert!(!task.metadata.auto_run, "autoRun {raw} must not count");
        }
    }

    #[test]
    fn test_other_status_passes_through() {
        let task: Task = serde_json::from_str(r#"{"id":"1","status":"in_progress"}"#).unwrap();
        assert_eq!(task.status, TaskStatus::Other("in_progress".to_string()));
        assert_eq!(serde_json::to_value(&task.status).unwrap(), "in_progress");
    }

    #[test]
    fn test_missing_status_rejected() {
        assert!(serde_json::from_str::<Task>(r#"{"id":"1"}"#).is_err());
    }

    #[test]
    fn test_subject_matches() {
        let task = Task::new("1").with_subject("Implement: login");
        assert!(task.subject_matches("Implement:"));
        assert!(!task.subject_matches("Review:"));
        assert!(!Task::new("2").subject_matches("Implement:"));
    }

    #[test]
    fn test_is_resolved() {
        let graph: TaskGraph = [
            Task::new("a").completed(),
            Task::new("b"),
            Task::new("c").with_status(TaskStatus::Other("in_progress".into())),
        ]
        .into_iter()
        .collect();

        assert!(graph.is_resolved("a"));
        assert!(!graph.is_resolved("b"));
        assert!(!graph.is_resolved("c"));
        assert!(graph.is_resolved("missing"));
    }
}
