//! Refine-loop state file.
//!
//! The state file is a small document with a key-value header between two
//! delimiter lines, followed by the prompt body:
//!
//! ```text
//! ---
//! iteration: 1
//! max_iterations: 5
//! completion_promise: "all-green"
//! ---
//! Review the diff and fix every issue you find.
//! ```
//!
//! Grammar:
//!
//! ```text
//! document  := preamble? open header close body
//! open      := line whose trimmed text is "---"
//! header    := (field | other-line)*
//! field     := KEY ":" WS* VALUE          KEY = [A-Za-z0-9_]+
//! close     := line whose trimmed text is "---"
//! body      := every remaining line, verbatim
//! ```
//!
//! VALUE is trimmed and a surrounding pair of double quotes is dropped.
//! Parsing never fails; [`RefineLoopState::from_document`] decides whether
//! the fields are usable.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{GovernorError, Result};

/// Header delimiter line.
pub const HEADER_DELIMITER: &str = "---";

static FIELD_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+):\s*(.*)$").expect("valid field regex"));

/// One `KEY: VALUE` header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub key: String,
    pub value: String,
    line: usize,
}

/// A parsed state file that can be rendered back byte-for-byte, with
/// individual header lines replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDocument {
    lines: Vec<String>,
    fields: Vec<HeaderField>,
    /// Index of the closing delimiter line, if the header was closed.
    close: Option<usize>,
}

impl StateDocument {
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let lines: Vec<String> = content.split('\n').map(str::to_string).collect();
        let mut fields = Vec::new();
        let mut open = false;
        let mut close = None;

        for (index, line) in lines.iter().enumerate() {
            if line.trim() == HEADER_DELIMITER {
                if open {
                    close = Some(index);
                    break;
                }
                open = true;
                continue;
            }
            if !open {
                continue;
            }
            if let Some(caps) = FIELD_LINE.captures(line) {
                fields.push(HeaderField {
                    key: caps[1].to_string(),
                    value: unquote(caps[2].trim()).to_string(),
                    line: index,
                });
            }
        }

        Self {
            lines,
            fields,
            close,
        }
    }

    /// Value of a header field. When a key repeats, the last one counts.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }

    /// All header fields in file order.
    #[must_use]
    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    /// Whether both header delimiters were found.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.close.is_some()
    }

    /// Everything after the closing delimiter, trimmed. Empty when the
    /// header is not closed.
    #[must_use]
    pub fn body(&self) -> String {
        match self.close {
            Some(close) => self.lines[close + 1..].join("\n").trim().to_string(),
            None => String::new(),
        }
    }

    /// Rewrite the line of an existing header field as `KEY: VALUE`.
    ///
    /// Returns false, leaving the document unchanged, if the field does not
    /// exist.
    pub fn set_field(&mut self, key: &str, value: &str) -> bool {
        let Some(field) = self.fields.iter_mut().rev().find(|f| f.key == key) else {
            return false;
        };
        field.value = value.to_string();
        let line = &mut self.lines[field.line];
        let ending = if line.ends_with('\r') { "\r" } else { "" };
        *line = format!("{key}: {value}{ending}");
        true
    }

    /// Render the document. Untouched lines come back exactly as read.
    #[must_use]
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Outcome of reading one header field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<T> {
    Missing,
    Invalid(String),
    Valid(T),
}

impl<T> FieldValue<T> {
    /// Turn into a value, or an [`GovernorError::InvalidStateField`].
    pub fn require(self, field: &str) -> Result<T> {
        match self {
            Self::Valid(v) => Ok(v),
            Self::Missing => Err(GovernorError::invalid_field(field, "")),
            Self::Invalid(raw) => Err(GovernorError::invalid_field(field, raw)),
        }
    }
}

/// Typed view of the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateHeader {
    pub iteration: FieldValue<u32>,
    pub max_iterations: FieldValue<u32>,
    /// `None` when absent, empty, or the literal `null`.
    pub completion_promise: Option<String>,
}

impl StateHeader {
    #[must_use]
    pub fn from_document(doc: &StateDocument) -> Self {
        Self {
            iteration: count_field(doc.field("iteration")),
            max_iterations: count_field(doc.field("max_iterations")),
            completion_promise: doc
                .field("completion_promise")
                .filter(|p| !p.is_empty() && *p != "null")
                .map(str::to_string),
        }
    }
}

fn count_field(raw: Option<&str>) -> FieldValue<u32> {
    match raw {
        None => FieldValue::Missing,
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(n) => FieldValue::Valid(n),
            Err(_) => FieldValue::Invalid(raw.to_string()),
        },
    }
}

/// Validated refine-loop state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineLoopState {
    pub iteration: u32,
    /// `0` means no iteration bound.
    pub max_iterations: u32,
    pub completion_promise: Option<String>,
    /// Instruction re-injected on every continuation; may be empty.
    pub prompt: String,
}

impl RefineLoopState {
    /// Validate a parsed document. Fails when `iteration` or
    /// `max_iterations` is missing or not a non-negative integer.
    pub fn from_document(doc: &StateDocument) -> Result<Self> {
        let header = StateHeader::from_document(doc);
        Ok(Self {
            iteration: header.iteration.require("iteration")?,
            max_iterations: header.max_iterations.require("max_iterations")?,
            completion_promise: header.completion_promise,
            prompt: doc.body(),
        })
    }

    /// Whether the iteration bound has been reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.max_iterations > 0 && self.iteration >= self.max_iterations
    }

    /// Status line shown when continuing into `iteration`.
    #[must_use]
    pub fn status_line(&self, iteration: u32) -> String {
        match &self.completion_promise {
            Some(promise) => format!(
                "Refine iteration {iteration} | Exit: ISSUE_COUNT = 0 or <promise>{promise}</promise>"
            ),
            None => format!("Refine iteration {iteration} | Exit: ISSUE_COUNT = 0"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "---\niteration: 2\nmax_iterations: 5\ncompletion_promise: \"done-xyz\"\nmode: strict\n---\nFix the reported issues.\n\nThen re-run the review.\n";

    #[test]
    fn test_parse_header_fields() {
        let doc = StateDocument::parse(SAMPLE);
        assert!(doc.is_closed());
        assert_eq!(doc.field("iteration"), Some("2"));
        assert_eq!(doc.field("max_iterations"), Some("5"));
        assert_eq!(doc.field("completion_promise"), Some("done-xyz"));
        assert_eq!(doc.field("mode"), Some("strict"));
        assert_eq!(doc.fields().len(), 4);
    }

    #[test]
    fn test_body_is_everything_after_close() {
        let doc = StateDocument::parse(SAMPLE);
        assert_eq!(doc.body(), "Fix the reported issues.\n\nThen re-run the review.");
    }

    #[test]
    fn test_body_keeps_later_delimiters() {
        let doc = StateDocument::parse("---\niteration: 1\n---\nStep one\n---\nStep two\n");
        assert_eq!(doc.body(), "Step one\n---\nStep two");
    }

    #[test]
    fn test_unclosed_header_has_empty_body() {
        let doc = StateDocument::parse("---\niteration: 1\nmax_iterations: 2\n");
        assert!(!doc.is_closed());
        assert_eq!(doc.body(), "");
        assert_eq!(doc.field("iteration"), Some("1"));
    }

    #[test]
    fn test_lines_outside_header_are_not_fields() {
        let doc = StateDocument::parse("iteration: 9\n---\niteration: 1\n---\niteration: 7\n");
        assert_eq!(doc.field("iteration"), Some("1"));
        assert_eq!(doc.fields().len(), 1);
    }

    #[test]
    fn test_set_field_preserves_everything_else() {
        let mut doc = StateDocument::parse(SAMPLE);
        assert!(doc.set_field("iteration", "3"));
        assert_eq!(doc.render(), SAMPLE.replace("iteration: 2", "iteration: 3"));
        assert!(!doc.set_field("missing", "x"));
    }

    #[test]
    fn test_set_field_keeps_crlf() {
        let content = "---\r\niteration: 1\r\nmax_iterations: 3\r\n---\r\nFix.\r\n";
        let mut doc = StateDocument::parse(content);
        assert_eq!(doc.field("iteration"), Some("1"));

        assert!(doc.set_field("iteration", "2"));
        assert_eq!(doc.render(), content.replace("iteration: 1\r", "iteration: 2\r"));
    }

    #[test]
    fn test_render_roundtrips_untouched() {
        let content = "  preamble\n---\r\niteration: 1\r\n---\r\nbody\r\n";
        assert_eq!(StateDocument::parse(content).render(), content);
    }

    #[test]
    fn test_state_from_document() {
        let state = RefineLoopState::from_document(&StateDocument::parse(SAMPLE)).unwrap();
        assert_eq!(state.iteration, 2);
        assert_eq!(state.max_iterations, 5);
        assert_eq!(state.completion_promise.as_deref(), Some("done-xyz"));
        assert!(!state.is_exhausted());
    }

    #[test]
    fn test_null_promise_is_none() {
        for raw in ["null", "\"null\"", "\"\"", ""] {
            let content = format!("---\niteration: 0\nmax_iterations: 0\ncompletion_promise: {raw}\n---\nx\n");
            let state = RefineLoopState::from_document(&StateDocument::parse(&content)).unwrap();
            assert!(state.completion_promise.is_none(), "promise {raw:?}");
        }
    }

    #[test]
    fn test_non_numeric_iteration_is_invalid() {
        let doc = StateDocument::parse("---\niteration: two\nmax_iterations: 5\n---\nx\n");
        let header = StateHeader::from_document(&doc);
        assert_eq!(header.iteration, FieldValue::Invalid("two".to_string()));

        let err = RefineLoopState::from_document(&doc).unwrap_err();
        assert!(err.to_string().contains("iteration field is invalid (got: 'two')"));
    }

    #[test]
    fn test_missing_max_iterations_is_invalid() {
        let doc = StateDocument::parse("---\niteration: 1\n---\nx\n");
        assert_eq!(StateHeader::from_document(&doc).max_iterations, FieldValue::Missing);
        assert!(RefineLoopState::from_document(&doc).is_err());
    }

    #[test]
    fn test_negative_count_is_invalid() {
        let doc = StateDocument::parse("---\niteration: 1\nmax_iterations: -1\n---\nx\n");
        assert!(RefineLoopState::from_document(&doc).is_err());
    }

    #[test]
    fn test_is_exhausted() {
        let mut state = RefineLoopState {
            iteration: 5,
            max_iterations: 5,
            completion_promise: None,
            prompt: String::new(),
        };
        assert!(state.is_exhausted());
        state.max_iterations = 0;
        assert!(!state.is_exhausted());
    }

    #[test]
    fn test_status_line() {
        let mut state = RefineLoopState {
            iteration: 1,
            max_iterations: 0,
            completion_promise: None,
            prompt: String::new(),
        };
        assert_eq!(state.status_line(2), "Refine iteration 2 | Exit: ISSUE_COUNT = 0");
        state.completion_promise = Some("done".to_string());
        assert_eq!(
            state.status_line(2),
            "Refine iteration 2 | Exit: ISSUE_COUNT = 0 or <promise>done</promise>"
        );
    }
}
