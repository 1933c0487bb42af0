use super::utils::get_llm_agent;
use async_trait::async_trait;
use content_kit::{ExtractedComment, ProcessedComment, parse_classifications};
use rig::completion::Prompt;
use serde_json::json;
use tracing::info;

/// Turns raw reviewer comments into actionable, classified instructions.
#[async_trait]
pub trait CommentClassifier: Send + Sync {
    async fn classify(&self, comments: &[ExtractedComment]) -> anyhow::Result<Vec<ProcessedComment>>;
}

const CLASSIFIER_PREAMBLE: &str = "You are an editorial assistant that triages reviewer comments on business documents. You answer with JSON only.";

pub struct LlmCommentClassifier {
    api_key: String,
    model: String,
}

impl LlmCommentClassifier {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CommentClassifier for LlmCommentClassifier {
    async fn classify(&self, comments: &[ExtractedComment]) -> anyhow::Result<Vec<ProcessedComment>> {
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        info!("Classifying {} reviewer comments", comments.len());

        let agent = get_llm_agent(&self.api_key, &self.model, CLASSIFIER_PREAMBLE)?;
        let reply = agent.prompt(&classification_prompt(comments)).await?;
        let processed = parse_classifications(&reply, comments)?;

        info!("Classified {} comments", processed.len());
        Ok(processed)
    }
}

fn classification_prompt(comments: &[ExtractedComment]) -> String {
    let listed: Vec<_> = comments
        .iter()
        .enumerate()
        .map(|(index, comment)| {
            json!({
                "index": index,
                "author": comment.author,
                "comment": comment.comment_text,
                "anchored_text": comment.anchor_text,
            })
        })
        .collect();
    let listed = serde_json::to_string_pretty(&listed).unwrap_or_default();

    format!(
        "Classify each reviewer comment below.

        Return a JSON array with exactly one object per comment, each with:
        - index: the index of the comment being classified, copied from the input
        - category: short label such as style, content, data, structure, legal
        - severity: low, medium or high
        - issue: one sentence describing the problem
        - instruction: a concrete editing instruction for the writer
        - action_type: one of modify, remove, add, conditional, clarify
        - decision_needed: the question for the author when the comment needs a decision, otherwise null
        - conservative_action: the safest edit to make if nobody answers, otherwise null

        Comments:
        {}",
        listed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(text: &str, anchor: &str) -> ExtractedComment {
        ExtractedComment {
            author: "Reviewer".to_string(),
            date: String::new(),
            comment_text: text.to_string(),
            anchor_text: anchor.to_string(),
        }
    }

    #[test]
    fn test_prompt_lists_every_comment_in_order() {
        let prompt = classification_prompt(&[
            comment("Cite a source", "Revenue doubled"),
            comment("Too informal", "Hey folks"),
        ]);
        let first = prompt.find("Cite a source").unwrap();
        let second = prompt.find("Too informal").unwrap();
        assert!(first < second);
        assert!(prompt.contains("Revenue doubled"));
        assert!(prompt.contains("action_type"));
        assert!(prompt.contains("\"index\": 1"));
        assert!(prompt.contains("- index: the index of the comment being classified"));
    }

    #[tokio::test]
    async fn test_llm_classification() -> anyhow::Result<()> {
        let api_key = match std::env::var("OPENROUTER_API_KEY") {
            Ok(key) => key,
            Err(_) => {
                println!("Skipping test - set OPENROUTER_API_KEY environment variable");
                return Ok(());
            }
        };

        let classifier = LlmCommentClassifier::new(api_key, "openai/gpt-4.1-mini");
        let comments = vec![comment("Please remove this sentence", "We are the best")];
        let processed = classifier.classify(&comments).await?;

        assert_eq!(processed.len(), 1);
        assert_eq!(processed[0].comment.comment_text, "Please remove this sentence");
        Ok(())
    }
}
