use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {details}")]
    Invalid { key: &'static str, details: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid topK parameter. It must be a valid integer.")]
    InvalidTopK,

    #[error("topK {requested} exceeds the maximum of {max}")]
    TopKTooLarge { requested: usize, max: usize },

    #[error("indexName must not be blank")]
    EmptyIndexName,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("storage upload timed out")]
    Timeout,

    #[error("storage transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("storage returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("invalid blob url: {0}")]
    Url(#[from] url::ParseError),

    #[error("could not sign storage request: {0}")]
    Signing(String),
}

impl UploadError {
    pub(crate) fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(error)
        }
    }
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request timed out")]
    Timeout,

    #[error("could not reach embedding endpoint: {0}")]
    Connection(String),

    #[error("embedding provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("embedding response malformed: {0}")]
    MalformedResponse(String),

    #[error("unexpected embedding failure: {0}")]
    Unexpected(String),
}

impl EmbeddingError {
    pub(crate) fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connection(error.to_string())
        } else if error.is_decode() {
            Self::MalformedResponse(error.to_string())
        } else {
            Self::Unexpected(error.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request timed out")]
    Timeout,

    #[error("could not reach search endpoint: {0}")]
    Connection(String),

    #[error("search provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("search response malformed: {0}")]
    MalformedResponse(String),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl SearchError {
    pub(crate) fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_decode() {
            Self::MalformedResponse(error.to_string())
        } else {
            Self::Connection(error.to_string())
        }
    }
}

/// Stage-level classification carried by every per-file error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    MissingField,
    Upload,
    Embedding,
    Search,
    Timeout,
    Internal,
}

/// Failure of one file's pipeline, tagged with the stage it happened in.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("no embedding produced: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector search failed: {0}")]
    Search(#[from] SearchError),

    #[error("deadline elapsed before the file finished processing")]
    DeadlineElapsed,

    #[error("{0}")]
    Internal(String),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::MissingField(_) => FailureKind::MissingField,
            PipelineError::Upload(UploadError::Timeout) => FailureKind::Timeout,
            PipelineError::Upload(_) => FailureKind::Upload,
            PipelineError::Embedding(EmbeddingError::Timeout) => FailureKind::Timeout,
            PipelineError::Embedding(_) => FailureKind::Embedding,
            PipelineError::Search(SearchError::Timeout) => FailureKind::Timeout,
            PipelineError::Search(_) => FailureKind::Search,
            PipelineError::DeadlineElapsed => FailureKind::Timeout,
            PipelineError::Internal(_) => FailureKind::Internal,
        }
    }
}
