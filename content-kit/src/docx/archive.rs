use std::io::{Cursor, Read};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{DocxError, Result};

pub(crate) const COMMENTS_PART: &str = "word/comments.xml";
pub(crate) const DOCUMENT_PART: &str = "word/document.xml";

pub(crate) type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Opens `bytes` as an OOXML package. A buffer that is not a ZIP is a hard error.
pub(crate) fn open(bytes: &[u8]) -> Result<Archive<'_>> {
    Ok(ZipArchive::new(Cursor::new(bytes))?)
}

/// Upper bound on the uncompressed size of a single XML part.
pub(crate) const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

/// Reads a UTF-8 part; `Ok(None)` when the package has no such part.
pub(crate) fn read_part(archive: &mut Archive<'_>, name: &str) -> Result<Option<String>> {
    read_part_limited(archive, name, MAX_PART_BYTES)
}

fn read_part_limited(archive: &mut Archive<'_>, name: &str, limit: u64) -> Result<Option<String>> {
    let file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let too_large = || DocxError::PartTooLarge {
        part: name.to_string(),
        limit,
    };

    // The declared size can lie, so the read itself is capped as well.
    if file.size() > limit {
        return Err(too_large());
    }
    let mut xml = String::new();
    file.take(limit + 1).read_to_string(&mut xml)?;
    if xml.len() as u64 > limit {
        return Err(too_large());
    }
    Ok(Some(xml))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::fixtures::docx_with;

    #[test]
    fn test_reads_present_and_missing_parts() {
        let bytes = docx_with(&[(DOCUMENT_PART, "<w:document/>")]);
        let mut archive = open(&bytes).unwrap();
        assert_eq!(
            read_part(&mut archive, DOCUMENT_PART).unwrap().as_deref(),
            Some("<w:document/>")
        );
        assert!(read_part(&mut archive, COMMENTS_PART).unwrap().is_none());
    }

    #[test]
    fn test_oversized_part_is_refused() {
        let body = "<w:p/>".repeat(1000);
        let bytes = docx_with(&[(DOCUMENT_PART, body.as_str())]);
        let mut archive = open(&bytes).unwrap();

        let err = read_part_limited(&mut archive, DOCUMENT_PART, 1024).unwrap_err();
        assert!(matches!(err, DocxError::PartTooLarge { limit: 1024, .. }));

        let xml = read_part_limited(&mut archive, DOCUMENT_PART, 6000).unwrap();
        assert_eq!(xml.map(|xml| xml.len()), Some(6000));
    }
}
