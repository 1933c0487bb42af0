//! Reading and writing `.docx` packages.

mod archive;
mod body;
mod comments;
mod media;
mod model;
mod writer;
mod xml;

pub use body::extract_body_paragraphs;
pub use comments::{ExtractedComment, extract_comments};
pub use model::{
    Brand, ContentSection, DocumentMetadata, DocumentRequest, FooterCell, FooterConfig,
    GeneratedDocument, HeaderAlignment, HeaderConfig, ImageSource, PageGroupLayout, PageLayouts,
    SectionText, TocEntry,
};
pub use writer::{generate_document, suggested_filename};
