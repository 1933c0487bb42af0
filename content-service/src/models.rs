use content_kit::{DocumentMetadata, ExtractedComment, PageLayouts, ProcessedComment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentResponse {
    pub content: String,
}

/// A `.docx` upload, base64 encoded (a `data:` URL prefix is accepted).
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub document_base64: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentsResponse {
    pub comments: Vec<ExtractedComment>,
    pub count: usize,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub review_id: String,
    pub comments: Vec<ProcessedComment>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviseRequest {
    pub document_base64: String,
    /// Cover metadata for the regenerated document. A blank title falls
    /// back to the first paragraph of the uploaded document.
    #[serde(default)]
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub layouts: PageLayouts,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviseResponse {
    pub review_id: String,
    pub filename: String,
    pub document_base64: String,
    pub comments: Vec<ProcessedComment>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub filename: String,
    pub document_base64: String,
}
