pub mod config;
pub mod decoder;
pub mod embeddings;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod stores;
pub mod traits;

pub use config::{
    PipelineSettings, RawSettings, SearchSettings, ServiceConfig, StorageConnection,
    StorageCredential, StorageSettings, VisionSettings,
};
pub use decoder::{decode_title, CatalogTier, DecodedFields, IndexPattern, ProductLine, UNKNOWN_FIELD};
pub use embeddings::Embedding;
pub use error::{
    ConfigError, EmbeddingError, FailureKind, PipelineError, SearchError, UploadError,
    ValidationError,
};
pub use models::{
    round_to, CandidateMatch, DecodedResult, FileError, FileOutcome, SearchRequest, UploadedImage,
};
pub use orchestrator::{parse_top_k, BatchOrchestrator, RequestLimits};
pub use pipeline::{FilePipeline, PipelineStage};
pub use stores::{AzureBlobStore, AzureSearchIndex, AzureVisionEmbedder};
pub use traits::{ImageEmbedder, ImageStore, VectorIndex};

/// Orchestrator wired to the Azure storage, vision and search clients.
pub type AzureOrchestrator = BatchOrchestrator<AzureBlobStore, AzureVisionEmbedder, AzureSearchIndex>;
