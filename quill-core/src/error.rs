//! Error types for Quill Core

use thiserror::Error;

/// Result type alias using QuillError
pub type Result<T> = std::result::Result<T, QuillError>;

/// Top-level error type for all export operations
#[derive(Debug, Error)]
pub enum QuillError {
    /// The request was malformed (e.g. a book id that is not a UUID)
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The book exists but belongs to someone else
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Export encoding failed: {0}")]
    Encoding(ConversionError),

    /// The output sink failed after streaming had started
    #[error("Stream transport failed: {0}")]
    Transport(#[source] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<ConversionError> for QuillError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::Sink(e) => QuillError::Transport(e),
            other => QuillError::Encoding(other),
        }
    }
}

/// Errors that occur while encoding a book
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    /// Writing to the output sink failed
    #[error("Sink write failed: {0}")]
    Sink(#[source] std::io::Error),
}

impl From<zip::result::ZipError> for ConversionError {
    fn from(err: zip::result::ZipError) -> Self {
        ConversionError::EncodingFailed(format!("zip: {}", err))
    }
}

impl From<quick_xml::Error> for ConversionError {
    fn from(err: quick_xml::Error) -> Self {
        ConversionError::EncodingFailed(format!("xml: {}", err))
    }
}

/// Errors that occur in the book store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    BackendError(String),

    /// A stored record could not be decoded
    #[error("Corrupt record {path}: {reason}")]
    Corrupt { path: String, reason: String },
}
