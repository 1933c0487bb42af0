use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use content_kit::{
    Brand, DocumentRequest, DocxError, ExtractedComment, GeneratedDocument, ProcessedComment,
    extract_body_paragraphs, extract_comments, extract_content_str, generate_document,
    normalize_content, sections_from_markdown,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    config::ServiceConfig,
    models::{
        CommentsResponse, ContentRequest, ContentResponse, DocumentUpload, GenerateResponse,
        ReviewResponse, ReviseRequest, ReviseResponse,
    },
    tasks::{
        CommentClassifier, DocumentReviser, LlmCommentClassifier, LlmDocumentReviser,
        resolve_remote_images,
    },
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

/// Longest cover title taken from the first paragraph of a revised document.
const MAX_FALLBACK_TITLE_CHARS: usize = 120;

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn payload_too_large_error(limit: usize) -> ApiError {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(json!({
            "error": "Document too large",
            "max_bytes": limit
        })),
    )
}

fn unprocessable_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn docx_error(e: DocxError) -> ApiError {
    match &e {
        DocxError::Archive(_) | DocxError::MissingPart(_) | DocxError::PartTooLarge { .. } => {
            unprocessable_error("Document is not a readable DOCX file", &e.to_string())
        }
        DocxError::InvalidMetadata(_) => bad_request_error(&e.to_string()),
        DocxError::Io(_) | DocxError::Image(_) => {
            error!("Document processing failed: {}", e);
            internal_error("Document processing failed", &e.to_string())
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub brand: Arc<Brand>,
    pub classifier: Arc<dyn CommentClassifier>,
    pub reviser: Arc<dyn DocumentReviser>,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        classifier: Arc<dyn CommentClassifier>,
        reviser: Arc<dyn DocumentReviser>,
    ) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.image_fetch_timeout)
            .build()?;

        Ok(Self {
            brand: Arc::new(Brand::new(config.brand_company.clone())),
            config: Arc::new(config),
            classifier,
            reviser,
            http_client,
        })
    }
}

pub fn create_app(config: ServiceConfig) -> anyhow::Result<Router> {
    let classifier = Arc::new(LlmCommentClassifier::new(
        config.openrouter_api_key.clone(),
        config.llm_model.clone(),
    ));
    let reviser = Arc::new(LlmDocumentReviser::new(
        config.openrouter_api_key.clone(),
        config.llm_model.clone(),
    ));

    let app_state = AppState::new(config, classifier, reviser)?;
    Ok(build_router(app_state))
}

pub fn build_router(app_state: AppState) -> Router {
    // base64 inflates uploads by a third; leave room for the JSON around it.
    let body_limit = app_state.config.max_document_bytes / 3 * 4 + 64 * 1024;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/content/normalize", post(normalize))
        .route("/content/extract", post(extract))
        .route("/documents/comments", post(document_comments))
        .route("/documents/review", post(review_document))
        .route("/documents/revise", post(revise_document))
        .route("/documents/generate", post(generate))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Content Document Service",
        "version": "1.0.0",
        "description": "Content cleanup, reviewer comment extraction, AI-assisted revision and branded DOCX generation",
        "endpoints": {
            "POST /content/normalize": "Clean up AI-generated markdown",
            "POST /content/extract": "Extract readable content from an AI/workflow response",
            "POST /documents/comments": "List reviewer comments in a DOCX",
            "POST /documents/review": "Classify reviewer comments into editing instructions",
            "POST /documents/revise": "Apply reviewer comments and return a regenerated DOCX",
            "POST /documents/generate": "Generate a branded DOCX",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn normalize(Json(request): Json<ContentRequest>) -> Json<ContentResponse> {
    Json(ContentResponse {
        content: normalize_content(&request.content),
    })
}

/// Accepts any body: JSON is unwrapped, other text is returned as-is.
async fn extract(body: String) -> Json<ContentResponse> {
    Json(ContentResponse {
        content: extract_content_str(&body),
    })
}

fn decode_document(encoded: &str, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
    let payload = match encoded.trim().strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => encoded.trim(),
    };
    if payload.is_empty() {
        return Err(bad_request_error("document_base64 is required"));
    }

    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| bad_request_error(&format!("document_base64 is not valid base64: {}", e)))?;

    if bytes.len() > max_bytes {
        return Err(payload_too_large_error(max_bytes));
    }
    Ok(bytes)
}

/// Runs DOCX parsing or generation on the blocking pool.
async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, DocxError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| {
            error!("Document task failed: {}", e);
            internal_error("Document processing failed", &e.to_string())
        })?
        .map_err(docx_error)
}

async fn read_comments(bytes: Arc<[u8]>) -> Result<Vec<ExtractedComment>, ApiError> {
    run_blocking(move || {
        extract_comments(&bytes).inspect_err(|e| warn!("Failed to read comments: {}", e))
    })
    .await
}

async fn document_comments(
    State(state): State<AppState>,
    Json(request): Json<DocumentUpload>,
) -> ApiResult<CommentsResponse> {
    let bytes = decode_document(&request.document_base64, state.config.max_document_bytes)?;
    let comments = read_comments(bytes.into()).await?;

    let message = if comments.is_empty() {
        "No comments found in document. Add reviewer comments in Word and upload again."
            .to_string()
    } else {
        format!("Extracted {} comments", comments.len())
    };
    info!("{}", message);

    Ok(Json(CommentsResponse {
        count: comments.len(),
        comments,
        message,
    }))
}

async fn classify(
    state: &AppState,
    review_id: &str,
    comments: &[ExtractedComment],
) -> Result<Vec<ProcessedComment>, ApiError> {
    state.classifier.classify(comments).await.map_err(|e| {
        error!(review_id = %review_id, "Failed to classify comments: {}", e);
        internal_error("Failed to classify comments", &e.to_string())
    })
}

async fn review_document(
    State(state): State<AppState>,
    Json(request): Json<DocumentUpload>,
) -> ApiResult<ReviewResponse> {
    let review_id = Uuid::new_v4().to_string();
    let bytes = decode_document(&request.document_base64, state.config.max_document_bytes)?;
    let comments = read_comments(bytes.into()).await?;
    info!(review_id = %review_id, "Reviewing {} comments", comments.len());

    let comments = if comments.is_empty() {
        Vec::new()
    } else {
        classify(&state, &review_id, &comments).await?
    };

    Ok(Json(ReviewResponse {
        review_id,
        comments,
    }))
}

async fn revise_document(
    State(state): State<AppState>,
    Json(request): Json<ReviseRequest>,
) -> ApiResult<ReviseResponse> {
    let review_id = Uuid::new_v4().to_string();
    let bytes: Arc<[u8]> = decode_document(&request.document_base64, state.config.max_document_bytes)?.into();

    let comments = read_comments(bytes.clone()).await?;
    if comments.is_empty() {
        return Err(bad_request_error("Document has no reviewer comments to apply"));
    }
    let paragraphs = run_blocking(move || extract_body_paragraphs(&bytes)).await?;
    if paragraphs.is_empty() {
        return Err(unprocessable_error(
            "Document has no text to revise",
            "word/document.xml contains no text paragraphs",
        ));
    }

    info!(
        review_id = %review_id,
        comments = comments.len(),
        paragraphs = paragraphs.len(),
        "Starting document revision"
    );

    let processed = classify(&state, &review_id, &comments).await?;
    let revised = state
        .reviser
        .revise(&paragraphs, &processed)
        .await
        .map_err(|e| {
            error!(review_id = %review_id, "Failed to revise document: {}", e);
            internal_error("Failed to revise document", &e.to_string())
        })?;

    let mut metadata = request.metadata;
    if metadata.title.trim().is_empty() {
        metadata.title = paragraphs[0].chars().take(MAX_FALLBACK_TITLE_CHARS).collect();
    }
    let document_request = DocumentRequest {
        metadata,
        toc: Vec::new(),
        sections: sections_from_markdown(&revised),
        layouts: request.layouts,
    };

    let document = render(&state, document_request).await?;
    info!(review_id = %review_id, filename = %document.filename, "Revision completed");

    Ok(Json(ReviseResponse {
        review_id,
        filename: document.filename,
        document_base64: STANDARD.encode(&document.bytes),
        comments: processed,
    }))
}

async fn generate(
    State(state): State<AppState>,
    Json(mut request): Json<DocumentRequest>,
) -> ApiResult<GenerateResponse> {
    info!("Generating document: {}", request.metadata.title);

    if request.metadata.title.trim().is_empty() {
        return Err(bad_request_error("metadata.title is required"));
    }
    resolve_remote_images(&state.http_client, &mut request, state.config.max_document_bytes).await;

    let document = render(&state, request).await?;
    Ok(Json(GenerateResponse {
        filename: document.filename,
        document_base64: STANDARD.encode(&document.bytes),
    }))
}

async fn render(state: &AppState, request: DocumentRequest) -> Result<GeneratedDocument, ApiError> {
    let brand = state.brand.clone();
    run_blocking(move || generate_document(&request, &brand)).await
}
