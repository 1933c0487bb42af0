//! Markdown to document sections.

use crate::docx::{ContentSection, SectionText};
use crate::normalize::normalize_content;

/// Splits markdown into sections for [`crate::generate_document`].
///
/// `#` headings open numbered chapters (`01`, `02`, ...), `##` headings open
/// unnumbered sections. Deeper headings stay in the body as bold lines and
/// list bullets are rendered as `•`. Text before the first heading becomes a
/// plain text section.
pub fn sections_from_markdown(markdown: &str) -> Vec<ContentSection> {
    let normalized = normalize_content(markdown);

    let mut sections = Vec::new();
    let mut current: Option<SectionText> = None;
    let mut body: Vec<String> = Vec::new();
    let mut chapter = 0u32;

    for line in normalized.lines() {
        let heading = match heading_level(line) {
            Some((1, title)) => {
                chapter += 1;
                Some((Some(format!("{:02}", chapter)), title))
            }
            Some((2, title)) => Some((None, title)),
            Some((_, title)) => {
                body.push(format!("**{}**", title));
                None
            }
            None => {
                body.push(render_line(line));
                None
            }
        };

        if let Some((chapter, title)) = heading {
            flush(&mut sections, current.take(), &mut body);
            current = Some(SectionText {
                chapter,
                title: title.to_string(),
                subtitle: None,
                body: String::new(),
            });
        }
    }
    flush(&mut sections, current, &mut body);

    sections
}

fn flush(sections: &mut Vec<ContentSection>, current: Option<SectionText>, body: &mut Vec<String>) {
    let text = body.join("\n").trim().to_string();
    body.clear();

    match current {
        Some(mut section) => {
            section.body = text;
            sections.push(ContentSection::Heading(section));
        }
        None if !text.is_empty() => sections.push(ContentSection::Text { body: text }),
        None => {}
    }
}

fn heading_level(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim();
    (!title.is_empty()).then_some((level, title))
}

fn render_line(line: &str) -> String {
    let indent = line.len() - line.trim_start().len();
    let trimmed = line.trim_start();
    match trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
        Some(item) => format!("{}• {}", " ".repeat(indent), item),
        None => line.to_string(),
    }
}
