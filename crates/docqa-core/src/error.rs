//! Error taxonomy shared by the ingestion and query pipelines.
//!
//! Each stage has its own error type so callers can decide how far a
//! failure propagates:
//!
//! | Error | Scope | Effect |
//! |-------|-------|--------|
//! | [`ExtractionError`] | one file | file skipped, batch continues |
//! | [`EmbeddingError`] | one batch | batch aborted, earlier batches kept |
//! | [`IndexError`] | operation | fatal to the current operation |
//! | [`GenerationError`] | one request | degraded answer (context only) |
//! | [`ValidationError`] | one request | rejected before external calls |
//!
//! [`QaError`] is the request-level umbrella returned by the answer
//! pipeline; [`QaError::kind`] yields a stable machine-readable code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("PDF extraction failed for {filename}: {message}")]
    Pdf { filename: String, message: String },

    #[error("no extractable text in {0}")]
    Empty(String),
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider is disabled")]
    Disabled,

    #[error("embedding service unreachable: {0}")]
    Unreachable(String),

    #[error("embedding request timed out after {0}s")]
    Timeout(u64),

    #[error("embedding service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding service returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("embedding has {got} dimensions, expected {expected}")]
    Dimension { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index storage error: {0}")]
    Storage(String),

    #[error("index state is corrupt: {0}")]
    Corrupt(String),

    #[error("index lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation provider is disabled")]
    Disabled,

    #[error("generation service unreachable: {0}")]
    Unreachable(String),

    #[error("generation request timed out after {0}s")]
    Timeout(u64),

    #[error("generation service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("question exceeds {max} characters")]
    QuestionTooLong { max: usize },
}

/// Request-level error returned by [`answer`](crate::answer::answer).
#[derive(Debug, Error)]
pub enum QaError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl QaError {
    /// Stable machine-readable code for the error contract of outer layers.
    pub fn kind(&self) -> &'static str {
        match self {
            QaError::Validation(_) => "validation_error",
            QaError::Embedding(EmbeddingError::Timeout(_)) => "timeout",
            QaError::Embedding(_) => "embedding_error",
            QaError::Index(_) => "index_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        assert_eq!(
            QaError::from(ValidationError::EmptyQuestion).kind(),
            "validation_error"
        );
        assert_eq!(
            QaError::from(EmbeddingError::Unreachable("down".into())).kind(),
            "embedding_error"
        );
        assert_eq!(QaError::from(EmbeddingError::Timeout(30)).kind(), "timeout");
        assert_eq!(
            QaError::from(IndexError::Storage("disk".into())).kind(),
            "index_error"
        );
    }

    #[test]
    fn messages_are_human_readable() {
        let err = EmbeddingError::CountMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(
            err.to_string(),
            "embedding service returned 2 vectors for 3 inputs"
        );
    }
}
