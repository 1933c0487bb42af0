use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::warn;

use super::archive::{self, DOCUMENT_PART};
use crate::error::{DocxError, Result};

/// Plain text of every non-empty body paragraph, in document order.
///
/// Deleted revision text (`w:delText`) is skipped; tabs and manual line
/// breaks are kept as `\t` and `\n`.
pub fn extract_body_paragraphs(bytes: &[u8]) -> Result<Vec<String>> {
    let mut archive = archive::open(bytes)?;
    let xml = archive::read_part(&mut archive, DOCUMENT_PART)?
        .ok_or_else(|| DocxError::MissingPart(DOCUMENT_PART.to_string()))?;

    Ok(scan_paragraphs(&xml))
}

fn scan_paragraphs(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => match element.local_name().as_ref() {
                b"p" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(element)) => match element.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(text)) if in_text => match text.unescape() {
                Ok(text) => current.push_str(&text),
                Err(e) => warn!("Skipping undecodable body text: {}", e),
            },
            Ok(Event::End(element)) => match element.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = current.trim();
                    if !text.is_empty() {
                        paragraphs.push(text.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Stopped reading {} early: {}", DOCUMENT_PART, e);
                break;
            }
            _ => {}
        }
    }

    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::fixtures::{docx_with, wrap_document};

    #[test]
    fn test_collects_paragraph_text() {
        let document = wrap_document(concat!(
            r#"<w:p><w:r><w:t xml:space="preserve">Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>"#,
            r#"<w:p/>"#,
            r#"<w:p><w:r><w:delText>gone</w:delText></w:r><w:r><w:t>Kept</w:t><w:tab/><w:t>col</w:t></w:r></w:p>"#
        ));
        let bytes = docx_with(&[("word/document.xml", document.as_str())]);

        let paragraphs = extract_body_paragraphs(&bytes).unwrap();
        assert_eq!(paragraphs, vec!["Hello world", "Kept\tcol"]);
    }

    #[test]
    fn test_missing_document_part() {
        let bytes = docx_with(&[("word/styles.xml", "<w:styles/>")]);
        assert!(matches!(
            extract_body_paragraphs(&bytes),
            Err(DocxError::MissingPart(_))
        ));
    }
}
