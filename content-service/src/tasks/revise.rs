use super::utils::get_llm_agent;
use async_trait::async_trait;
use content_kit::{Envelope, ProcessedComment, normalize_content};
use rig::completion::Prompt;
use std::fmt::Write as _;
use tracing::{info, warn};

/// Rewrites a document so that it addresses the classified comments.
#[async_trait]
pub trait DocumentReviser: Send + Sync {
    /// Returns the revised document as markdown.
    async fn revise(&self, paragraphs: &[String], comments: &[ProcessedComment]) -> anyhow::Result<String>;
}

const REVISER_PREAMBLE: &str = "You are a senior editor. You revise business documents precisely according to reviewer instructions and change nothing else.";

pub struct LlmDocumentReviser {
    api_key: String,
    model: String,
}

impl LlmDocumentReviser {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl DocumentReviser for LlmDocumentReviser {
    async fn revise(&self, paragraphs: &[String], comments: &[ProcessedComment]) -> anyhow::Result<String> {
        info!(
            paragraphs = paragraphs.len(),
            comments = comments.len(),
            "Revising document"
        );

        let agent = get_llm_agent(&self.api_key, &self.model, REVISER_PREAMBLE)?;
        let reply = agent.prompt(&revision_prompt(paragraphs, comments)).await?;

        let revised = revised_text(&reply)?;
        if revised.is_empty() {
            warn!("Reviser returned an empty document");
            anyhow::bail!("LLM returned an empty revision");
        }

        info!("Revision completed ({} characters)", revised.len());
        Ok(revised)
    }
}

/// The markdown carried by a reviser reply, bare or enveloped.
fn revised_text(reply: &str) -> anyhow::Result<String> {
    Ok(normalize_content(&Envelope::parse_str(reply)?.into_text()))
}

fn revision_prompt(paragraphs: &[String], comments: &[ProcessedComment]) -> String {
    let mut instructions = String::new();
    for (index, comment) in comments.iter().enumerate() {
        let _ = writeln!(
            instructions,
            "{}. [{} / {} / {}] {}",
            index + 1,
            comment.action_type,
            comment.category,
            comment.severity,
            comment.instruction
        );
        if !comment.comment.anchor_text.is_empty() {
            let _ = writeln!(instructions, "   Applies to: \"{}\"", comment.comment.anchor_text);
        }
        if let Some(fallback) = &comment.conservative_action {
            let _ = writeln!(instructions, "   If unsure: {}", fallback);
        }
    }

    format!(
        "Revise the document below by applying every instruction.

        Rules:
        1. Apply modify, remove and add instructions exactly
        2. For conditional or clarify instructions make the conservative change only
        3. Keep all untouched wording as it is
        4. Answer with the full revised document as markdown, using # for chapter headings and ## for sub-headings
        5. Do not add commentary before or after the document

        Instructions:
        {}
        Document:
        {}",
        instructions,
        paragraphs.join("\n\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_kit::{ActionType, ExtractedComment};

    #[test]
    fn test_reply_starting_with_a_link_is_markdown() {
        let reply = "[Acme](https://acme.example) leads the market\n\n# Outlook\n\nGrowth [2]";
        assert_eq!(revised_text(reply).unwrap(), reply);

        let wrapped = r##"{"output": "# Revised\n\nText"}"##;
        assert_eq!(revised_text(wrapped).unwrap(), "# Revised\n\nText");
    }

    #[test]
    fn test_prompt_carries_instructions_and_text() {
        let mut comment = ProcessedComment::unclassified(ExtractedComment {
            author: "A".to_string(),
            date: String::new(),
            comment_text: "Drop the slogan".to_string(),
            anchor_text: "Best in class".to_string(),
        });
        comment.action_type = ActionType::Remove;
        comment.conservative_action = Some("Soften the claim".to_string());

        let prompt = revision_prompt(&["Intro".to_string(), "Best in class".to_string()], &[comment]);
        assert!(prompt.contains("1. [remove / general / medium] Drop the slogan"));
        assert!(prompt.contains("Applies to: \"Best in class\""));
        assert!(prompt.contains("If unsure: Soften the claim"));
        assert!(prompt.contains("Intro\n\nBest in class"));
    }
}
