//! Unwrapping of upstream AI/workflow responses.
//!
//! Upstream services never committed to a single response shape: some send
//! plain text, some `{"output": "..."}`, some an array of either, and some
//! JSON that was serialised into a string one more time. Two entry points
//! cover that:
//!
//! * [`extract_content`] is the lenient path for display-only content. It
//!   never fails and falls back to a sentinel or a JSON dump.
//! * [`Envelope::parse`] is the strict path. It accepts only the known
//!   envelope variants and reports anything else as
//!   [`EnvelopeError::UnrecognizedFormat`].

use serde_json::{Map, Value};
use std::collections::VecDeque;

use crate::error::EnvelopeError;

/// Returned when an array response yields no usable content.
pub const NO_VALID_CONTENT: &str = "No valid content found in response";

/// Returned when the response is not a string, array or object.
pub const UNABLE_TO_EXTRACT: &str = "Unable to extract content from response";

/// Joins multiple surviving array entries.
pub const ENTRY_SEPARATOR: &str = "\n\n---\n\n";

/// Field names probed on objects, in priority order.
pub const CONTENT_FIELDS: [&str; 5] = ["content", "output", "message", "response", "text"];

/// serde_json values are trees, so nesting depth is the only runaway guard needed.
pub const MAX_DEPTH: usize = 32;

/// Entries sharing this many leading characters are treated as duplicates.
const DEDUP_PREFIX_CHARS: usize = 100;

#[derive(Debug, PartialEq, Eq)]
enum Miss {
    NoContent,
    Unsupported,
}

/// Extracts a single best-guess human-readable string from `value`.
pub fn extract_content(value: &Value) -> String {
    resolve(extract(value, 0))
}

/// Same as [`extract_content`] for a raw text body that may hold JSON.
pub fn extract_content_str(raw: &str) -> String {
    resolve(extract_from_str(raw, 0))
}

fn resolve(result: Result<String, Miss>) -> String {
    match result {
        Ok(text) => text,
        Err(Miss::NoContent) => NO_VALID_CONTENT.to_string(),
        Err(Miss::Unsupported) => UNABLE_TO_EXTRACT.to_string(),
    }
}

fn extract(value: &Value, depth: usize) -> Result<String, Miss> {
    if depth > MAX_DEPTH {
        return Err(Miss::Unsupported);
    }

    match value {
        Value::String(text) => extract_from_str(text, depth),
        Value::Array(items) => extract_from_array(items, depth),
        Value::Object(map) => Ok(find_content_field(map).unwrap_or_else(|| {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        })),
        _ => Err(Miss::Unsupported),
    }
}

fn extract_from_str(text: &str, depth: usize) -> Result<String, Miss> {
    if !looks_like_json(text) {
        return Ok(text.to_string());
    }

    match serde_json::from_str::<Value>(text.trim()) {
        Ok(parsed) => extract(&parsed, depth + 1),
        Err(_) => Ok(text.to_string()),
    }
}

fn extract_from_array(items: &[Value], depth: usize) -> Result<String, Miss> {
    let mut survivors: Vec<String> = Vec::new();

    for item in items {
        let Ok(text) = extract(item, depth + 1) else {
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        if survivors.iter().any(|seen| is_duplicate(seen, &text)) {
            continue;
        }
        survivors.push(text);
    }

    match survivors.len() {
        0 => Err(Miss::NoContent),
        1 => Ok(survivors.remove(0)),
        _ => Ok(survivors.join(ENTRY_SEPARATOR)),
    }
}

fn is_duplicate(seen: &str, candidate: &str) -> bool {
    if seen == candidate {
        return true;
    }

    let long_enough = |s: &str| s.chars().nth(DEDUP_PREFIX_CHARS).is_some();
    long_enough(seen)
        && long_enough(candidate)
        && seen
            .chars()
            .take(DEDUP_PREFIX_CHARS)
            .eq(candidate.chars().take(DEDUP_PREFIX_CHARS))
}

/// Level-by-level search so a shallow match always wins over a deeper one.
fn find_content_field(root: &Map<String, Value>) -> Option<String> {
    let mut queue: VecDeque<(&Map<String, Value>, usize)> = VecDeque::new();
    queue.push_back((root, 0));

    while let Some((map, depth)) = queue.pop_front() {
        if let Some((_, text)) = direct_content_field(map) {
            return Some(text.to_string());
        }
        if depth >= MAX_DEPTH {
            continue;
        }

        for value in map.values() {
            match value {
                Value::Object(nested) => queue.push_back((nested, depth + 1)),
                Value::Array(items) => {
                    for item in items {
                        if let Value::Object(nested) = item {
                            queue.push_back((nested, depth + 1));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    None
}

fn direct_content_field(map: &Map<String, Value>) -> Option<(&'static str, &str)> {
    CONTENT_FIELDS.iter().find_map(|field| match map.get(*field) {
        Some(Value::String(text)) if !text.trim().is_empty() => Some((*field, text.as_str())),
        _ => None,
    })
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim();
    (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}

/// The response shapes upstream services are known to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// A bare text payload.
    PlainText(String),
    /// An object carrying its payload under one of [`CONTENT_FIELDS`].
    Object { field: &'static str, content: String },
    /// A list of envelopes, e.g. one per workflow branch.
    Array(Vec<Envelope>),
}

impl Envelope {
    pub fn parse(value: &Value) -> Result<Self, EnvelopeError> {
        Self::parse_at(value, 0)
    }

    /// Parses a raw reply body. Valid JSON must be a known envelope;
    /// anything else, including bracketed markdown, is plain text.
    pub fn parse_str(raw: &str) -> Result<Self, EnvelopeError> {
        if !looks_like_json(raw) {
            return Ok(Envelope::PlainText(raw.to_string()));
        }

        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => Self::parse(&value),
            Err(_) => Ok(Envelope::PlainText(raw.to_string())),
        }
    }

    fn parse_at(value: &Value, depth: usize) -> Result<Self, EnvelopeError> {
        if depth > MAX_DEPTH {
            return Err(EnvelopeError::TooDeep(MAX_DEPTH));
        }

        match value {
            Value::String(text) => Ok(Envelope::PlainText(text.clone())),
            Value::Object(map) => direct_content_field(map)
                .map(|(field, content)| Envelope::Object {
                    field,
                    content: content.to_string(),
                })
                .ok_or_else(|| {
                    EnvelopeError::UnrecognizedFormat(format!(
                        "object without any of the fields {:?}",
                        CONTENT_FIELDS
                    ))
                }),
            Value::Array(items) if items.is_empty() => Err(EnvelopeError::UnrecognizedFormat(
                "empty array".to_string(),
            )),
            Value::Array(items) => items
                .iter()
                .map(|item| Self::parse_at(item, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Envelope::Array),
            Value::Null => Err(EnvelopeError::UnrecognizedFormat("null".to_string())),
            Value::Bool(_) => Err(EnvelopeError::UnrecognizedFormat("boolean".to_string())),
            Value::Number(_) => Err(EnvelopeError::UnrecognizedFormat("number".to_string())),
        }
    }

    /// Flattens the envelope into display text. Identical array entries
    /// collapse into one.
    pub fn into_text(self) -> String {
        match self {
            Envelope::PlainText(text) => text,
            Envelope::Object { content, .. } => content,
            Envelope::Array(items) => {
                let mut parts: Vec<String> = Vec::new();
                for text in items.into_iter().map(Envelope::into_text) {
                    if !text.trim().is_empty() && !parts.contains(&text) {
                        parts.push(text);
                    }
                }
                parts.join(ENTRY_SEPARATOR)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_field_wins_over_output() {
        assert_eq!(extract_content(&json!({"content": "A", "output": "B"})), "A");
        assert_eq!(extract_content(&json!({"text": "T", "output": "B"})), "B");
    }

    #[test]
    fn test_blank_field_is_skipped() {
        assert_eq!(extract_content(&json!({"content": "  ", "message": "M"})), "M");
    }

    #[test]
    fn test_shallow_match_preferred() {
        let value = json!({
            "data": {"content": "deep"},
            "meta": {"inner": {"content": "deeper"}},
            "response": "shallow"
        });
        assert_eq!(extract_content(&value), "shallow");

        let nested = json!({"data": {"result": {"output": "found"}}, "status": "ok"});
        assert_eq!(extract_content(&nested), "found");
    }

    #[test]
    fn test_searches_objects_inside_arrays() {
        let value = json!({"choices": [{"message": {"role": "assistant", "content": "hello"}}]});
        assert_eq!(extract_content(&value), "hello");
    }

    #[test]
    fn test_object_without_fields_dumps_json() {
        let value = json!({"status": "ok"});
        assert_eq!(extract_content(&value), "{\n  \"status\": \"ok\"\n}");
    }

    #[test]
    fn test_array_dedup_single_survivor() {
        assert_eq!(extract_content(&json!(["same text", "same text"])), "same text");
    }

    #[test]
    fn test_array_dedup_long_common_prefix() {
        let prefix = "x".repeat(120);
        let value = json!([format!("{prefix} ending one"), format!("{prefix} ending two")]);
        assert_eq!(extract_content(&value), format!("{prefix} ending one"));
    }

    #[test]
    fn test_array_joins_distinct_entries() {
        let value = json!([{"output": "first"}, "", "  ", {"content": "second"}]);
        assert_eq!(extract_content(&value), "first\n\n---\n\nsecond");
    }

    #[test]
    fn test_empty_array_returns_sentinel() {
        assert_eq!(extract_content(&json!([])), NO_VALID_CONTENT);
        assert_eq!(extract_content(&json!(["", null])), NO_VALID_CONTENT);
        assert_eq!(extract_content_str("[]"), NO_VALID_CONTENT);
    }

    #[test]
    fn test_scalar_returns_sentinel() {
        assert_eq!(extract_content(&json!(42)), UNABLE_TO_EXTRACT);
        assert_eq!(extract_content(&Value::Null), UNABLE_TO_EXTRACT);
    }

    #[test]
    fn test_json_inside_string_is_parsed() {
        let value = json!("{\"output\": \"from embedded json\"}");
        assert_eq!(extract_content(&value), "from embedded json");
        assert_eq!(extract_content_str("  [{\"text\": \"t\"}]  "), "t");
    }

    #[test]
    fn test_malformed_json_string_returned_verbatim() {
        let raw = "{\"output\": \"missing brace\"";
        assert_eq!(extract_content_str(raw), raw);
        let raw = "{not json at all}";
        assert_eq!(extract_content_str(raw), raw);
    }

    #[test]
    fn test_plain_string_returned() {
        assert_eq!(extract_content_str("just text"), "just text");
    }

    #[test]
    fn test_envelope_variants() {
        assert_eq!(
            Envelope::parse_str("# Markdown").unwrap(),
            Envelope::PlainText("# Markdown".to_string())
        );
        assert_eq!(
            Envelope::parse(&json!({"response": "r"})).unwrap(),
            Envelope::Object {
                field: "response",
                content: "r".to_string()
            }
        );

        let array = Envelope::parse(&json!(["a", {"output": "b"}, "a"])).unwrap();
        assert_eq!(array.into_text(), "a\n\n---\n\nb");
    }

    #[test]
    fn test_envelope_rejects_unknown_shapes() {
        assert!(matches!(
            Envelope::parse(&json!({"status": "ok"})),
            Err(EnvelopeError::UnrecognizedFormat(_))
        ));
        assert!(matches!(
            Envelope::parse(&json!([])),
            Err(EnvelopeError::UnrecognizedFormat(_))
        ));
        assert!(matches!(
            Envelope::parse(&json!(["fine", 3])),
            Err(EnvelopeError::UnrecognizedFormat(_))
        ));
        assert!(matches!(
            Envelope::parse_str("{broken"),
            Ok(Envelope::PlainText(_))
        ));
        assert!(matches!(
            Envelope::parse_str(r#"{"status": "ok"}"#),
            Err(EnvelopeError::UnrecognizedFormat(_))
        ));
    }

    #[test]
    fn test_bracketed_markdown_is_plain_text() {
        let reply = "[Acme] wins the tender\n\nSee the appendix [1]";
        assert_eq!(
            Envelope::parse_str(reply).unwrap(),
            Envelope::PlainText(reply.to_string())
        );
        assert_eq!(
            Envelope::parse_str("{broken}").unwrap(),
            Envelope::PlainText("{broken}".to_string())
        );
    }
}
