pub mod classify;
pub mod images;
pub mod revise;
pub mod utils;

pub use classify::{CommentClassifier, LlmCommentClassifier};
pub use images::resolve_remote_images;
pub use revise::{DocumentReviser, LlmDocumentReviser};
