use thiserror::Error;

/// Errors raised while reading or writing OOXML packages.
#[derive(Error, Debug)]
pub enum DocxError {
    #[error("Invalid DOCX archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error while assembling document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document part missing: {0}")]
    MissingPart(String),

    #[error("Document part {part} is larger than {limit} bytes")]
    PartTooLarge { part: String, limit: u64 },

    #[error("Invalid document metadata: {0}")]
    InvalidMetadata(String),

    #[error("Image rejected: {0}")]
    Image(String),
}

/// Errors raised by the strict response-envelope parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Unrecognized response format: {0}")]
    UnrecognizedFormat(String),

    #[error("Response envelope nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Errors raised while interpreting classifier replies.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Unknown action type: {0}")]
    UnknownActionType(String),

    #[error("Malformed classifier reply: {0}")]
    MalformedReply(String),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

pub type Result<T> = std::result::Result<T, DocxError>;
