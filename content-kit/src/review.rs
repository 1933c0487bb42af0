//! Classified reviewer comments.
//!
//! The classifier is asked for a JSON array with one object per comment,
//! each echoing the `index` of the comment it classifies. Replies are accepted
//! bare, fenced, or wrapped in one of the known response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::docx::ExtractedComment;
use crate::envelope::Envelope;
use crate::error::ReviewError;
use crate::normalize::normalize_content;

/// Object keys under which a wrapped classification array is accepted.
const LIST_FIELDS: [&str; 3] = ["comments", "classifications", "items"];

/// What a comment asks the reviser to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Modify,
    Remove,
    Add,
    Conditional,
    Clarify,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Modify => "modify",
            ActionType::Remove => "remove",
            ActionType::Add => "add",
            ActionType::Conditional => "conditional",
            ActionType::Clarify => "clarify",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "modify" => Ok(ActionType::Modify),
            "remove" => Ok(ActionType::Remove),
            "add" => Ok(ActionType::Add),
            "conditional" => Ok(ActionType::Conditional),
            "clarify" => Ok(ActionType::Clarify),
            _ => Err(ReviewError::UnknownActionType(s.to_string())),
        }
    }
}

/// A reviewer comment plus the classifier's reading of it.
///
/// The flattened comment keeps its camelCase keys; the classification
/// fields serialize as snake_case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedComment {
    #[serde(flatten)]
    pub comment: ExtractedComment,
    pub category: String,
    pub severity: String,
    pub issue: String,
    pub instruction: String,
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_needed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conservative_action: Option<String>,
}

impl ProcessedComment {
    /// Used when the classifier returned no entry for `comment`: the comment
    /// text becomes the instruction and the reviser is asked to clarify.
    pub fn unclassified(comment: ExtractedComment) -> Self {
        let text = comment.comment_text.clone();
        Self {
            comment,
            category: "general".to_string(),
            severity: "medium".to_string(),
            issue: text.clone(),
            instruction: text,
            action_type: ActionType::Clarify,
            decision_needed: None,
            conservative_action: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Classification {
    #[serde(alias = "comment_index")]
    index: Option<Value>,
    category: String,
    severity: String,
    issue: String,
    instruction: String,
    #[serde(alias = "actionType")]
    action_type: Option<String>,
    #[serde(alias = "decisionNeeded")]
    decision_needed: Option<String>,
    #[serde(alias = "conservativeAction")]
    conservative_action: Option<String>,
}

fn non_empty(text: String) -> Option<String> {
    let text = normalize_content(&text);
    (!text.is_empty()).then_some(text)
}

impl Classification {
    /// The echoed comment index, as a number or a numeric string.
    fn echoed_index(&self) -> Option<usize> {
        match self.index.as_ref()? {
            Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Pairs the classifier reply with `comments`.
///
/// Entries echoing a valid `index` land on that comment. Entries without one
/// fill the remaining comments in order. Comments the reply does not cover
/// are kept as [`ProcessedComment::unclassified`]; surplus, out-of-range and
/// repeated entries are ignored.
pub fn parse_classifications(
    raw: &str,
    comments: &[ExtractedComment],
) -> Result<Vec<ProcessedComment>, ReviewError> {
    let entries = classification_entries(raw)?;
    if entries.len() != comments.len() {
        warn!(
            expected = comments.len(),
            received = entries.len(),
            "Classifier reply does not match the comment count"
        );
    }

    let mut slots = pair_entries(entries, comments.len());
    let mut processed = Vec::with_capacity(comments.len());
    for (index, comment) in comments.iter().enumerate() {
        let Some(entry) = slots[index].take() else {
            processed.push(ProcessedComment::unclassified(comment.clone()));
            continue;
        };

        let action_type = match entry.action_type.as_deref().map(str::parse::<ActionType>) {
            Some(Ok(action)) => action,
            Some(Err(e)) => {
                warn!(comment = index, "{}, defaulting to clarify", e);
                ActionType::Clarify
            }
            None => {
                warn!(comment = index, "Missing action type, defaulting to clarify");
                ActionType::Clarify
            }
        };

        let fallback = ProcessedComment::unclassified(comment.clone());
        processed.push(ProcessedComment {
            category: non_empty(entry.category).unwrap_or(fallback.category),
            severity: non_empty(entry.severity)
                .map(|s| s.to_ascii_lowercase())
                .unwrap_or(fallback.severity),
            issue: non_empty(entry.issue).unwrap_or(fallback.issue),
            instruction: non_empty(entry.instruction).unwrap_or(fallback.instruction),
            action_type,
            decision_needed: entry.decision_needed.and_then(non_empty),
            conservative_action: entry.conservative_action.and_then(non_empty),
            comment: fallback.comment,
        });
    }

    Ok(processed)
}

fn pair_entries(entries: Vec<Classification>, count: usize) -> Vec<Option<Classification>> {
    let mut slots: Vec<Option<Classification>> = (0..count).map(|_| None).collect();
    let mut unindexed = Vec::new();

    for entry in entries {
        match entry.echoed_index() {
            Some(index) if index < count && slots[index].is_none() => slots[index] = Some(entry),
            Some(index) => warn!(index, "Ignoring classification with an out-of-range or repeated index"),
            None => unindexed.push(entry),
        }
    }

    let mut unindexed = unindexed.into_iter();
    for slot in slots.iter_mut().filter(|slot| slot.is_none()) {
        match unindexed.next() {
            Some(entry) => *slot = Some(entry),
            None => break,
        }
    }
    slots
}

fn classification_entries(raw: &str) -> Result<Vec<Classification>, ReviewError> {
    let text = strip_code_fence(raw);
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ReviewError::MalformedReply(format!("not JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let listed = LIST_FIELDS.iter().find_map(|field| match map.remove(*field) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            });
            if let Some(items) = listed {
                items
            } else {
                // A workflow envelope carrying the array as text.
                let inner = Envelope::parse(&Value::Object(map))?.into_text();
                let text = strip_code_fence(&inner);
                match serde_json::from_str(text) {
                    Ok(Value::Array(items)) => items,
                    _ => {
                        return Err(ReviewError::MalformedReply(
                            "envelope does not hold a JSON array".to_string(),
                        ));
                    }
                }
            }
        }
        other => {
            return Err(ReviewError::MalformedReply(format!(
                "expected a JSON array, got {}",
                other
            )));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(ReviewError::MalformedReply(format!(
                    "entry {} is not an object",
                    index
                )));
            }
            serde_json::from_value(item)
                .map_err(|e| ReviewError::MalformedReply(format!("entry {}: {}", index, e)))
        })
        .collect()
}

/// Removes a surrounding ```` ```json ```` (or untagged) fence.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    match body.split_once('\n') {
        Some((tag, inner)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => inner.trim(),
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(text: &str) -> ExtractedComment {
        ExtractedComment {
            author: "Reviewer".to_string(),
            date: "2026-10-01T09:00:00Z".to_string(),
            comment_text: text.to_string(),
            anchor_text: "anchored".to_string(),
        }
    }

    #[test]
    fn test_action_type_from_str() {
        assert_eq!(" Modify ".parse::<ActionType>().unwrap(), ActionType::Modify);
        assert_eq!("clarify".parse::<ActionType>().unwrap(), ActionType::Clarify);
        assert!(matches!(
            "rewrite".parse::<ActionType>(),
            Err(ReviewError::UnknownActionType(_))
        ));
    }

    #[test]
    fn test_pairs_entries_by_position() {
        let comments = vec![comment("Too long"), comment("Drop this")];
        let reply = r#"[
            {"category": "style", "severity": "Low", "issue": "Wordy", "instruction": "Shorten", "action_type": "modify"},
            {"category": "content", "severity": "high", "issue": "Off topic", "instruction": "Delete paragraph", "actionType": "remove"}
        ]"#;

        let processed = parse_classifications(reply, &comments).unwrap();
        assert_eq!(processed.len(), 2);
        assert_eq!(processed[0].comment.comment_text, "Too long");
        assert_eq!(processed[0].action_type, ActionType::Modify);
        assert_eq!(processed[0].severity, "low");
        assert_eq!(processed[1].action_type, ActionType::Remove);
        assert_eq!(processed[1].instruction, "Delete paragraph");
    }

    #[test]
    fn test_pairs_entries_by_echoed_index() {
        let comments = vec![comment("Too long"), comment("Drop this"), comment("Cite it")];
        let reply = r#"[
            {"index": 2, "category": "data", "action_type": "add"},
            {"index": "0", "category": "style", "action_type": "modify"},
            {"category": "content", "action_type": "remove"},
            {"index": 7, "category": "stray", "action_type": "modify"}
        ]"#;

        let processed = parse_classifications(reply, &comments).unwrap();
        assert_eq!(processed.len(), 3);
        assert_eq!(processed[0].comment.comment_text, "Too long");
        assert_eq!(processed[0].action_type, ActionType::Modify);
        assert_eq!(processed[1].comment.comment_text, "Drop this");
        assert_eq!(processed[1].action_type, ActionType::Remove);
        assert_eq!(processed[2].comment.comment_text, "Cite it");
        assert_eq!(processed[2].category, "data");
        assert_eq!(processed[2].action_type, ActionType::Add);
    }

    #[test]
    fn test_repeated_index_does_not_overwrite() {
        let comments = vec![comment("First"), comment("Second")];
        let reply = r#"[
            {"index": 0, "category": "style", "action_type": "modify"},
            {"index": 0, "category": "legal", "action_type": "remove"}
        ]"#;

        let processed = parse_classifications(reply, &comments).unwrap();
        assert_eq!(processed[0].category, "style");
        assert_eq!(processed[1].action_type, ActionType::Clarify);
        assert_eq!(processed[1].instruction, "Second");
    }

    #[test]
    fn test_unknown_action_defaults_to_clarify() {
        let comments = vec![comment("Hmm?")];
        let reply = r#"[{"category": "tone", "severity": "medium", "issue": "Unclear", "instruction": "Ask", "action_type": "rewrite"}]"#;

        let processed = parse_classifications(reply, &comments).unwrap();
        assert_eq!(processed[0].action_type, ActionType::Clarify);
    }

    #[test]
    fn test_accepts_fenced_and_wrapped_replies() {
        let comments = vec![comment("Add numbers")];
        let fenced = "```json\n[{\"category\": \"data\", \"action_type\": \"add\", \"decision_needed\": \"Which year?\"}]\n```";
        let processed = parse_classifications(fenced, &comments).unwrap();
        assert_eq!(processed[0].action_type, ActionType::Add);
        assert_eq!(processed[0].decision_needed.as_deref(), Some("Which year?"));
        assert_eq!(processed[0].instruction, "Add numbers");

        let wrapped = r#"{"comments": [{"category": "data", "action_type": "conditional"}]}"#;
        let processed = parse_classifications(wrapped, &comments).unwrap();
        assert_eq!(processed[0].action_type, ActionType::Conditional);

        let enveloped = r#"{"output": "[{\"category\": \"data\", \"action_type\": \"add\"}]"}"#;
        let processed = parse_classifications(enveloped, &comments).unwrap();
        assert_eq!(processed[0].category, "data");
    }

    #[test]
    fn test_missing_entries_are_kept_unclassified() {
        let comments = vec![comment("First"), comment("Second")];
        let reply = r#"[{"category": "style", "action_type": "modify"}]"#;

        let processed = parse_classifications(reply, &comments).unwrap();
        assert_eq!(processed.len(), 2);
        assert_eq!(processed[1].action_type, ActionType::Clarify);
        assert_eq!(processed[1].instruction, "Second");
    }

    #[test]
    fn test_rejects_malformed_replies() {
        let comments = vec![comment("x")];
        for reply in ["Sure! Here you go.", "[1, 2]", r#"{"status": "ok"}"#, "42"] {
            assert!(parse_classifications(reply, &comments).is_err(), "{reply}");
        }
    }

    #[test]
    fn test_serializes_classification_fields_snake_case() {
        let mut processed = ProcessedComment::unclassified(comment("Check"));
        processed.conservative_action = Some("Leave as is".to_string());
        let value = serde_json::to_value(&processed).unwrap();
        assert_eq!(value["commentText"], "Check");
        assert_eq!(value["anchorText"], "anchored");
        assert_eq!(value["action_type"], "clarify");
        assert_eq!(value["conservative_action"], "Leave as is");
        assert!(value.get("actionType").is_none());
        assert!(value.get("decision_needed").is_none());

        let back: ProcessedComment = serde_json::from_value(value).unwrap();
        assert_eq!(back, processed);
    }
}
