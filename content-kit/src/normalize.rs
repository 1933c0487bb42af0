//! Cleanup of AI-generated markdown before it is rendered or stored.
//!
//! Generated content regularly arrives wrapped in noise: YAML front-matter
//! (sometimes inside a code fence), SEO metadata lines, a fence around the
//! whole answer, HTML-escaped entities, or JSON escape sequences that were
//! never decoded. [`normalize_content`] peels those layers off in a fixed
//! order and leaves legitimate markdown alone.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

const FENCE: &str = "```";

/// Compiled pattern set, built once per process.
static PATTERNS: LazyLock<Result<Patterns, regex::Error>> = LazyLock::new(Patterns::build);

struct Patterns {
    fenced_front_matter: Regex,
    closing_fence: Regex,
    front_matter: Regex,
    metadata_line: Regex,
    whole_fence: Regex,
    excess_newlines: Regex,
}

impl Patterns {
    fn build() -> Result<Self, regex::Error> {
        Ok(Self {
            fenced_front_matter: Regex::new(
                r"(?s)\A\s*```[A-Za-z]*[ \t]*\r?\n---[ \t]*\r?\n(?:.*?\r?\n)?---[ \t]*(?:\r?\n|\z)",
            )?,
            closing_fence: Regex::new(r"\A[ \t]*```[ \t]*(?:\r?\n|\z)")?,
            front_matter: Regex::new(
                r"(?s)\A\s*---[ \t]*\r?\n(?:.*?\r?\n)?---[ \t]*(?:\r?\n|\z)",
            )?,
            metadata_line: Regex::new(
                r"(?i)\A\s*(?:title|meta_description|meta|keywords|description)[ \t]*:[^\n]*(?:\n|\z)",
            )?,
            whole_fence: Regex::new(r"(?si)\A```(?:markdown|md|text)?[ \t]*\r?\n(.*?)\r?\n?```\z")?,
            excess_newlines: Regex::new(r"\n{4,}")?,
        })
    }

    fn apply(&self, input: &str) -> String {
        let mut text = input.to_string();
        // An unwrapped fence may expose front-matter or metadata of its own.
        loop {
            text = self.strip_fenced_front_matter(text);
            text = self.front_matter.replace(&text, "").into_owned();
            text = self.strip_metadata_lines(text);
            match self.unwrap_whole_fence(&text) {
                Some(inner) => text = inner,
                None => break,
            }
        }
        text = decode_entities(&text);
        text = decode_literal_escapes(&text);

        let text = text.replace("\r\n", "\n");
        self.excess_newlines
            .replace_all(&text, "\n\n")
            .trim()
            .to_string()
    }

    /// Strips a front-matter block that sits alone in its own fence. When the
    /// fence keeps going past the block it wraps the whole answer instead,
    /// and is left for [`Self::unwrap_whole_fence`].
    fn strip_fenced_front_matter(&self, text: String) -> String {
        let Some(block_end) = self.fenced_front_matter.find(&text).map(|m| m.end()) else {
            return text;
        };
        match self.closing_fence.find(&text[block_end..]).map(|m| m.end()) {
            Some(fence_end) => text[block_end + fence_end..].to_string(),
            None => text,
        }
    }

    fn strip_metadata_lines(&self, mut text: String) -> String {
        while let Some(found) = self.metadata_line.find(&text) {
            let end = found.end();
            text.replace_range(..end, "");
        }
        text
    }

    /// Unwraps a fence only when it spans the whole trimmed content and
    /// holds no other fence line inside it.
    fn unwrap_whole_fence(&self, text: &str) -> Option<String> {
        let caps = self.whole_fence.captures(text.trim())?;
        let inner = caps.get(1).map_or("", |m| m.as_str());

        if inner
            .lines()
            .any(|line| line.trim_start().starts_with(FENCE))
        {
            return None;
        }
        Some(inner.to_string())
    }
}

fn decode_entities(text: &str) -> String {
    // `&amp;` goes last so `&amp;lt;` decodes to `&lt;`, not `<`.
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn decode_literal_escapes(text: &str) -> String {
    text.replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\r", "\r")
}

/// Strips generation artifacts from `input` and returns render-ready markdown.
///
/// Never fails: if the pattern set is unavailable the input comes back
/// unchanged.
pub fn normalize_content(input: &str) -> String {
    match &*PATTERNS {
        Ok(patterns) => patterns.apply(input),
        Err(e) => {
            warn!("Content normalization unavailable, returning input unchanged: {}", e);
            input.to_string()
        }
    }
}
