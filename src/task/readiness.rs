//! Dependency readiness classification.
//!
//! A task is *ready* when it is pending and every blocker is resolved
//! (absent from the graph or completed). A task is *executable* when it is
//! ready and has opted into automatic triggering with `metadata.autoRun`.

use serde::Serialize;
use std::collections::BTreeMap;

use super::{Task, TaskGraph, TaskStatus};

/// Partition of a task graph by readiness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub ready: Vec<String>,
    pub pending: Vec<String>,
    pub completed: Vec<String>,
    /// Pending task id -> blockers still present and not completed.
    pub blocked: BTreeMap<String, Vec<String>>,
}

/// Pending with every blocker resolved.
#[must_use]
pub fn is_ready(task: &Task, graph: &TaskGraph) -> bool {
    task.status == TaskStatus::Pending && task.blocked_by.iter().all(|id| graph.is_resolved(id))
}

/// Ready and flagged `autoRun: true`.
#[must_use]
pub fn is_executable(task: &Task, graph: &TaskGraph) -> bool {
    task.metadata.auto_run && is_ready(task, graph)
}

/// Ids of every executable task, in graph order.
#[must_use]
pub fn find_executable(graph: &TaskGraph) -> Vec<String> {
    graph
        .iter()
        .filter(|task| is_executable(task, graph))
        .map(|task| task.id.clone())
        .collect()
}

/// Blockers of `task` that are present in the graph and not completed.
#[must_use]
pub fn unresolved_blockers(task: &Task, graph: &TaskGraph) -> Vec<String> {
    task.blocked_by
        .iter()
        .filter(|id| !graph.is_resolved(id))
        .cloned()
        .collect()
}

/// Partition `graph` into ready, pending and completed ids.
///
/// With a `filter`, only tasks whose subject contains it are considered;
/// everything else is left out of all buckets. Blocker resolution still
/// looks at the whole graph.
#[must_use]
pub fn classify(graph: &TaskGraph, filter: Option<&str>) -> Classification {
    let mut result = Classification::default();

    for task in graph.iter() {
        if let Some(filter) = filter {
            if !task.subject_matches(filter) {
                continue;
            }
        }

        if task.status == TaskStatus::Completed {
            result.completed.push(task.id.clone());
        } else if is_ready(task, graph) {
            result.ready.push(task.id.clone());
        } else {
            result.pending.push(task.id.clone());
            let unresolved = unresolved_blockers(task, graph);
            if !unresolved.is_empty() {
                result.blocked.insert(task.id.clone(), unresolved);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucketed(result: &Classification) -> usize {
        result.ready.len() + result.pending.len() + result.completed.len()
    }

    fn graph(tasks: impl IntoIterator<Item = Task>) -> TaskGraph {
        tasks.into_iter().collect()
    }

    #[test]
    fn test_absent_blocker_is_resolved() {
        let g = graph([Task::new("a").with_blockers(["x"])]);
        let result = classify(&g, None);
        assert_eq!(result.ready, vec!["a"]);
        assert!(result.blocked.is_empty());
    }

    #[test]
    fn test_completed_blocker_is_resolved() {
        let g = graph([
            Task::new("x").completed(),
            Task::new("a").with_blockers(["x"]),
        ]);
        let result = classify(&g, None);
        assert_eq!(result.ready, vec!["a"]);
        assert_eq!(result.completed, vec!["x"]);
    }

    #[test]
    fn test_unresolved_blocker_is_pending_and_blocked() {
        let g = graph([
            Task::new("x").with_status(TaskStatus::Other("in_progress".into())),
            Task::new("a").with_blockers(["x", "gone"]),
        ]);
        let result = classify(&g, None);
        assert!(result.ready.is_empty());
        assert_eq!(result.pending, vec!["a", "x"]);
        assert_eq!(result.blocked.get("a"), Some(&vec!["x".to_string()]));
        // x has no blockers, so it is pending without a blocked entry
        assert!(!result.blocked.contains_key("x"));
    }

    #[test]
    fn test_pending_blocker_chain() {
        let g = graph([
            Task::new("1"),
            Task::new("2").with_blockers(["1"]),
            Task::new("3").with_blockers(["1", "2"]),
        ]);
        let result = classify(&g, None);
        assert_eq!(result.ready, vec!["1"]);
        assert_eq!(result.pending, vec!["2", "3"]);
        assert_eq!(result.blocked["3"], vec!["1", "2"]);
    }

    #[test]
    fn test_every_task_in_exactly_one_bucket() {
        let g = graph([
            Task::new("a").completed(),
            Task::new("b").with_blockers(["a"]),
            Task::new("c").with_blockers(["b"]),
            Task::new("d").with_status(TaskStatus::Other("deleted".into())),
            Task::new("e"),
        ]);
        let result = classify(&g, None);
        assert_eq!(bucketed(&result), g.len());

        for task in g.iter() {
            let hits = [&result.ready, &result.pending, &result.completed]
                .iter()
                .filter(|bucket| bucket.contains(&task.id))
                .count();
            assert_eq!(hits, 1, "task {} in {} buckets", task.id, hits);
        }
    }

    #[test]
    fn test_filter_excludes_from_all_buckets() {
        let g = graph([
            Task::new("1").with_subject("Implement: a").completed(),
            Task::new("2").with_subject("Implement: b").with_blockers(["3"]),
            Task::new("3").with_subject("Review: b"),
            Task::new("4"),
        ]);
        let result = classify(&g, Some("Implement:"));
        assert_eq!(result.completed, vec!["1"]);
        assert_eq!(result.pending, vec!["2"]);
        // Filtered-out blocker still counts as unresolved
        assert_eq!(result.blocked["2"], vec!["3"]);
        assert!(result.ready.is_empty());
        assert_eq!(bucketed(&result), 2);
    }

    #[test]
    fn test_same_input_same_output() {
        let g = graph([
            Task::new("b"),
            Task::new("a").with_blockers(["b"]),
            Task::new("c").completed(),
        ]);
        assert_eq!(classify(&g, None), classify(&g.clone(), None));
    }

    #[test]
    fn test_executable_requires_auto_run() {
        let g = graph([
            Task::new("a").with_auto_run(true),
            Task::new("b"),
            Task::new("c").with_auto_run(true).with_blockers(["b"]),
            Task::new("d").with_auto_run(true).completed(),
        ]);
        assert!(is_ready(g.get("b").unwrap(), &g));
        assert!(!is_executable(g.get("b").unwrap(), &g));
        assert_eq!(find_executable(&g), vec!["a"]);
    }

    #[test]
    fn test_serialized_shape() {
        let g = graph([Task::new("2").with_blockers(["1"]), Task::new("1")]);
        let json = serde_json::to_value(classify(&g, None)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ready": ["1"],
                "pending": ["2"],
                "completed": [],
                "blocked": {"2": ["1"]}
            })
        );
    }
}
