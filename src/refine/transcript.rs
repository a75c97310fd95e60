//! Reading the agent's last message out of a session transcript.
//!
//! Transcripts are JSON lines. Assistant records look like
//! `{"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"..."}]}}`;
//! every other record is skipped.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;

/// Raw marker used for lines that are not valid JSON.
const ASSISTANT_MARKER: &str = r#""role":"assistant""#;

/// Turn doubled backslashes (as JSON-escaped Windows paths arrive) into
/// forward slashes.
#[must_use]
pub fn normalize_transcript_path(raw: &str) -> PathBuf {
    PathBuf::from(raw.replace("\\\\", "/"))
}

/// Text of the last assistant record in the transcript file.
///
/// A missing file is `Ok(None)`; any other read failure is an error.
pub fn last_assistant_message(path: &Path) -> Result<Option<String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Transcript {} does not exist", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    Ok(last_assistant_message_in(&content))
}

/// Text of the last assistant record in transcript content.
#[must_use]
pub fn last_assistant_message_in(content: &str) -> Option<String> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(assistant_text)
        .last()
}

fn assistant_text(line: &str) -> Option<String> {
    match serde_json::from_str::<Value>(line) {
        Ok(record) => {
            if !is_assistant(&record) {
                return None;
            }
            let content = record
                .get("message")
                .and_then(|m| m.get("content"))
                .or_else(|| record.get("content"));
            Some(content.map(content_text).unwrap_or_default())
        }
        Err(_) => line.contains(ASSISTANT_MARKER).then(|| line.to_string()),
    }
}

fn is_assistant(record: &Value) -> bool {
    let is = |v: Option<&Value>| v.and_then(Value::as_str) == Some("assistant");
    is(record.get("message").and_then(|m| m.get("role")))
        || is(record.get("role"))
        || is(record.get("type"))
}

/// Joins the text parts of a message; tool calls and other parts are dropped.
fn content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}
