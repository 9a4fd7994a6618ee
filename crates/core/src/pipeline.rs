use crate::decoder::IndexPattern;
use crate::error::PipelineError;
use crate::models::{DecodedResult, UploadedImage};
use crate::traits::{ImageEmbedder, ImageStore, VectorIndex};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Uploading,
    Embedding,
    Searching,
    Decoding,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Uploading => "uploading",
            PipelineStage::Embedding => "embedding",
            PipelineStage::Searching => "searching",
            PipelineStage::Decoding => "decoding",
        };
        f.write_str(name)
    }
}

/// Upload, embed, search and decode for a single file.
pub struct FilePipeline<S, E, V>
where
    S: ImageStore,
    E: ImageEmbedder,
    V: VectorIndex,
{
    pub(crate) store: S,
    pub(crate) embedder: E,
    pub(crate) index: V,
}

impl<S, E, V> FilePipeline<S, E, V>
where
    S: ImageStore + Send + Sync,
    E: ImageEmbedder + Send + Sync,
    V: VectorIndex + Send + Sync,
{
    pub fn new(store: S, embedder: E, index: V) -> Self {
        Self {
            store,
            embedder,
            index,
        }
    }

    pub async fn run(
        &self,
        image: &UploadedImage,
        index_name: &str,
        top_k: usize,
    ) -> Result<Vec<DecodedResult>, PipelineError> {
        let file_name = image
            .file_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or(PipelineError::MissingField("filename"))?;
        let started = Instant::now();

        debug!(file = file_name, stage = %PipelineStage::Uploading, "pipeline stage");
        let original_file = self.store.upload(image).await?;

        debug!(file = file_name, stage = %PipelineStage::Embedding, "pipeline stage");
        let embedding = self.embedder.embed(&original_file).await?;

        debug!(file = file_name, stage = %PipelineStage::Searching, "pipeline stage");
        let candidates = self.index.search(index_name, embedding, top_k).await?;

        debug!(file = file_name, stage = %PipelineStage::Decoding, "pipeline stage");
        let pattern = IndexPattern::parse(index_name);
        let results: Vec<DecodedResult> = candidates
            .into_iter()
            .map(|candidate| DecodedResult {
                model_name: index_name.to_string(),
                original_file: original_file.clone(),
                fields: pattern.decode(&candidate.title),
                similar_file: candidate.image_url,
                confidence_score: candidate.confidence_score,
                similarity_percentage: candidate.similarity_percentage,
            })
            .collect();

        info!(
            file = file_name,
            index = index_name,
            matches = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "file matched"
        );
        Ok(results)
    }
}
