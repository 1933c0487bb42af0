//! Reviewer comment extraction.
//!
//! Comments live in `word/comments.xml`; the text they are attached to is
//! marked in `word/document.xml` by `commentRangeStart`/`commentRangeEnd`
//! pairs carrying the comment id. Elements are matched by local name so
//! packages that use a prefix other than `w:` still read correctly.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use super::archive::{self, COMMENTS_PART, DOCUMENT_PART};
use crate::error::Result;

/// One reviewer annotation recovered from a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedComment {
    pub author: String,
    pub date: String,
    pub comment_text: String,
    /// Best effort; empty when the anchor range could not be resolved.
    pub anchor_text: String,
}

#[derive(Debug, Default)]
struct RawComment {
    id: Option<String>,
    author: String,
    date: String,
    paragraphs: Vec<String>,
}

impl RawComment {
    fn from_element(element: &BytesStart<'_>) -> Self {
        let mut comment = RawComment::default();
        for attr in element.attributes().flatten() {
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => continue,
            };
            match attr.key.local_name().as_ref() {
                b"id" => comment.id = Some(value),
                b"author" => comment.author = value,
                b"date" => comment.date = value,
                _ => {}
            }
        }
        comment
    }

    fn push_text(&mut self, text: &str) {
        match self.paragraphs.last_mut() {
            Some(paragraph) => paragraph.push_str(text),
            None => self.paragraphs.push(text.to_string()),
        }
    }

    fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Extracts reviewer comments, in document order, from raw `.docx` bytes.
///
/// Fails only when `bytes` is not a ZIP archive. A package without a
/// comments part yields an empty list; a damaged comments part yields the
/// comments read before the damage.
pub fn extract_comments(bytes: &[u8]) -> Result<Vec<ExtractedComment>> {
    let mut archive = archive::open(bytes)?;

    let comments_xml = match archive::read_part(&mut archive, COMMENTS_PART) {
        Ok(Some(xml)) => xml,
        Ok(None) => {
            info!("Document has no {} part", COMMENTS_PART);
            return Ok(Vec::new());
        }
        Err(e) => {
            warn!("Could not read {}: {}", COMMENTS_PART, e);
            return Ok(Vec::new());
        }
    };

    let raw_comments = scan_comments(&comments_xml);
    if raw_comments.is_empty() {
        return Ok(Vec::new());
    }

    let anchors = match archive::read_part(&mut archive, DOCUMENT_PART) {
        Ok(Some(xml)) => scan_anchors(&xml),
        Ok(None) => HashMap::new(),
        Err(e) => {
            warn!("Could not read {} for comment anchors: {}", DOCUMENT_PART, e);
            HashMap::new()
        }
    };

    let comments: Vec<ExtractedComment> = raw_comments
        .into_iter()
        .map(|raw| {
            let anchor_text = raw
                .id
                .as_deref()
                .and_then(|id| anchors.get(id))
                .map(|text| text.trim().to_string())
                .unwrap_or_default();
            ExtractedComment {
                comment_text: raw.text(),
                author: raw.author,
                date: raw.date,
                anchor_text,
            }
        })
        .collect();

    info!(
        count = comments.len(),
        anchored = comments.iter().filter(|c| !c.anchor_text.is_empty()).count(),
        "Extracted reviewer comments"
    );
    Ok(comments)
}

fn scan_comments(xml: &str) -> Vec<RawComment> {
    let mut reader = Reader::from_str(xml);
    let mut comments = Vec::new();
    let mut current: Option<RawComment> = None;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => match element.local_name().as_ref() {
                b"comment" => current = Some(RawComment::from_element(&element)),
                b"p" => {
                    if let Some(comment) = current.as_mut() {
                        comment.paragraphs.push(String::new());
                    }
                }
                b"t" => in_text = current.is_some(),
                _ => {}
            },
            Ok(Event::Empty(element)) => {
                if let (b"tab", Some(comment)) = (element.local_name().as_ref(), current.as_mut()) {
                    comment.push_text("\t");
                }
            }
            Ok(Event::Text(text)) if in_text => {
                if let Some(comment) = current.as_mut() {
                    match text.unescape() {
                        Ok(text) => comment.push_text(&text),
                        Err(e) => warn!("Skipping undecodable comment text: {}", e),
                    }
                }
            }
            Ok(Event::End(element)) => match element.local_name().as_ref() {
                b"t" => in_text = false,
                b"comment" => {
                    if let Some(comment) = current.take() {
                        if comment.text().is_empty() {
                            info!(id = ?comment.id, "Dropping comment without text");
                        } else {
                            comments.push(comment);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(
                    "Stopped reading {} at byte {}: {}",
                    COMMENTS_PART,
                    reader.buffer_position(),
                    e
                );
                break;
            }
            _ => {}
        }
    }

    comments
}

/// Text covered by each comment range in the main document, keyed by comment id.
fn scan_anchors(xml: &str) -> HashMap<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut anchors: HashMap<String, String> = HashMap::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) if element.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                match element.local_name().as_ref() {
                    b"commentRangeStart" => {
                        if let Some(id) = id_attribute(&element) {
                            anchors.entry(id.clone()).or_default();
                            open.push(id);
                        }
                    }
                    b"commentRangeEnd" => {
                        if let Some(id) = id_attribute(&element) {
                            open.retain(|open_id| open_id != &id);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(text)) if in_text && !open.is_empty() => match text.unescape() {
                Ok(text) => {
                    for id in &open {
                        if let Some(anchor) = anchors.get_mut(id) {
                            anchor.push_str(&text);
                        }
                    }
                }
                Err(e) => warn!("Skipping undecodable anchor text: {}", e),
            },
            Ok(Event::End(element)) => match element.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    for id in &open {
                        if let Some(anchor) = anchors.get_mut(id) {
                            anchor.push('\n');
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Comment anchors left unresolved after parse error: {}", e);
                break;
            }
            _ => {}
        }
    }

    if !open.is_empty() {
        warn!(unclosed = ?open, "Comment ranges without a matching end marker");
    }
    anchors
}

fn id_attribute(element: &BytesStart<'_>) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"id")
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}
