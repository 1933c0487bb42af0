pub mod docx;
pub mod envelope;
pub mod error;
pub mod markdown;
pub mod normalize;
pub mod review;

// Re-export commonly used types
pub use docx::{
    Brand, ContentSection, DocumentMetadata, DocumentRequest, ExtractedComment, FooterCell,
    FooterConfig, GeneratedDocument, HeaderAlignment, HeaderConfig, ImageSource, PageGroupLayout,
    PageLayouts, SectionText, TocEntry, extract_body_paragraphs, extract_comments,
    generate_document, suggested_filename,
};
pub use envelope::{Envelope, NO_VALID_CONTENT, UNABLE_TO_EXTRACT, extract_content, extract_content_str};
pub use error::{DocxError, EnvelopeError, Result, ReviewError};
pub use markdown::sections_from_markdown;
pub use normalize::normalize_content;
pub use review::{ActionType, ProcessedComment, parse_classifications};
