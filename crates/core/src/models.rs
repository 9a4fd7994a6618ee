use crate::decoder::DecodedFields;
use crate::error::{FailureKind, PipelineError};
use bytes::Bytes;
use serde::Serialize;

/// One uploaded file as it arrived in the request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            content_type: None,
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub index_name: String,
    pub top_k: usize,
    pub files: Vec<UploadedImage>,
}

/// One ranked hit returned by the vector index, with its score already normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateMatch {
    pub title: String,
    pub image_url: String,
    pub raw_score: f64,
    pub confidence_score: f64,
    pub similarity_percentage: f64,
}

impl CandidateMatch {
    pub fn new(title: impl Into<String>, image_url: impl Into<String>, raw_score: f64) -> Self {
        Self {
            title: title.into(),
            image_url: image_url.into(),
            raw_score,
            confidence_score: round_to(raw_score, 4),
            similarity_percentage: round_to(raw_score * 100.0, 2),
        }
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedResult {
    pub model_name: String,
    pub original_file: String,
    #[serde(flatten)]
    pub fields: DecodedFields,
    pub similar_file: String,
    #[serde(rename = "confidence_score")]
    pub confidence_score: f64,
    #[serde(rename = "similarity_percentage")]
    pub similarity_percentage: f64,
}

/// Error entry for a single file; serialized next to successful entries.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileError {
    pub error: String,
    pub file: Option<String>,
    pub index: String,
    pub kind: FailureKind,
}

impl FileError {
    pub fn from_pipeline(file: Option<&str>, index: &str, error: &PipelineError) -> Self {
        let error_message = match file {
            Some(name) => format!("Failed to process file {name}: {error}"),
            None => format!("Failed to process file: {error}"),
        };

        Self {
            error: error_message,
            file: file.map(str::to_string),
            index: index.to_string(),
            kind: error.kind(),
        }
    }
}

/// Result for one submitted file, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FileOutcome {
    Matches(Vec<DecodedResult>),
    Failed(FileError),
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Matches(_))
    }

    pub fn error(&self) -> Option<&FileError> {
        match self {
            FileOutcome::Failed(error) => Some(error),
            FileOutcome::Matches(_) => None,
        }
    }
}
