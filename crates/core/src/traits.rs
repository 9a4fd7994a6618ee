use crate::{CandidateMatch, Embedding, EmbeddingError, SearchError, UploadError, UploadedImage};
use async_trait::async_trait;

#[async_trait]
pub trait ImageStore {
    /// Persists the image and returns a locator the embedding provider can fetch.
    async fn upload(&self, image: &UploadedImage) -> Result<String, UploadError>;
}

#[async_trait]
pub trait ImageEmbedder {
    async fn embed(&self, image_url: &str) -> Result<Embedding, EmbeddingError>;
}

#[async_trait]
pub trait VectorIndex {
    async fn search(
        &self,
        index_name: &str,
        embedding: Embedding,
        top_k: usize,
    ) -> Result<Vec<CandidateMatch>, SearchError>;
}
