use crate::config::{PipelineSettings, DEFAULT_MAX_TOP_K};
use crate::error::{PipelineError, ValidationError};
use crate::models::{FileError, FileOutcome, SearchRequest, UploadedImage};
use crate::pipeline::FilePipeline;
use crate::traits::{ImageEmbedder, ImageStore, VectorIndex};
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Request-level bounds that are checked before any file is touched.
#[derive(Debug, Clone)]
pub struct RequestLimits {
    pub default_index: Option<String>,
    pub max_top_k: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            default_index: None,
            max_top_k: DEFAULT_MAX_TOP_K,
        }
    }
}

/// Fans a batch out over [`FilePipeline`] and collects one outcome per file.
pub struct BatchOrchestrator<S, E, V>
where
    S: ImageStore,
    E: ImageEmbedder,
    V: VectorIndex,
{
    pipeline: Arc<FilePipeline<S, E, V>>,
    permits: Arc<Semaphore>,
    settings: PipelineSettings,
    limits: RequestLimits,
}

impl<S, E, V> BatchOrchestrator<S, E, V>
where
    S: ImageStore + Send + Sync + 'static,
    E: ImageEmbedder + Send + Sync + 'static,
    V: VectorIndex + Send + Sync + 'static,
{
    pub fn new(
        pipeline: FilePipeline<S, E, V>,
        settings: PipelineSettings,
        limits: RequestLimits,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            permits: Arc::new(Semaphore::new(settings.max_concurrency.max(1))),
            settings,
            limits,
        }
    }

    pub fn limits(&self) -> &RequestLimits {
        &self.limits
    }

    /// Validates raw request fields in the order the HTTP API reports them:
    /// `topK`, then `indexName`, then `files`.
    pub fn prepare(
        &self,
        index_name: Option<String>,
        top_k: Option<&str>,
        files: Option<Vec<UploadedImage>>,
    ) -> Result<SearchRequest, ValidationError> {
        let top_k = parse_top_k(top_k)?;
        let index_name = index_name
            .or_else(|| self.limits.default_index.clone())
            .ok_or(ValidationError::MissingField("indexName"))?;
        let files = files.ok_or(ValidationError::MissingField("files"))?;

        self.check(&index_name, top_k)?;
        Ok(SearchRequest {
            index_name,
            top_k,
            files,
        })
    }

    pub async fn run(&self, request: SearchRequest) -> Result<Vec<FileOutcome>, ValidationError> {
        self.process(request.files, &request.index_name, request.top_k)
            .await
    }

    pub async fn process(
        &self,
        files: Vec<UploadedImage>,
        index_name: &str,
        top_k: usize,
    ) -> Result<Vec<FileOutcome>, ValidationError> {
        self.check(index_name, top_k)?;

        let started = Instant::now();
        let deadline = self
            .settings
            .batch_deadline
            .map(|budget| tokio::time::Instant::now() + budget);
        info!(index = index_name, files = files.len(), top_k, "batch started");

        let handles: Vec<(Option<String>, JoinHandle<FileOutcome>)> = files
            .into_iter()
            .map(|image| {
                let file_name = image.file_name.clone();
                let handle = self.spawn_file(image, index_name.to_string(), top_k, deadline);
                (file_name, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (file_name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    let reason = if join_error.is_panic() {
                        panic_message(join_error.into_panic())
                    } else {
                        "task was cancelled".to_string()
                    };
                    let error = PipelineError::Internal(reason);
                    warn!(file = ?file_name, index = index_name, "file task aborted: {error}");
                    FileOutcome::Failed(FileError::from_pipeline(
                        file_name.as_deref(),
                        index_name,
                        &error,
                    ))
                }
            };
            outcomes.push(outcome);
        }

        let failed = outcomes.iter().filter(|outcome| !outcome.is_success()).count();
        info!(
            index = index_name,
            succeeded = outcomes.len() - failed,
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );

        Ok(outcomes)
    }

    fn check(&self, index_name: &str, top_k: usize) -> Result<(), ValidationError> {
        if index_name.trim().is_empty() {
            return Err(ValidationError::EmptyIndexName);
        }
        if top_k == 0 {
            return Err(ValidationError::InvalidTopK);
        }
        if top_k > self.limits.max_top_k {
            return Err(ValidationError::TopKTooLarge {
                requested: top_k,
                max: self.limits.max_top_k,
            });
        }
        Ok(())
    }

    fn spawn_file(
        &self,
        image: UploadedImage,
        index_name: String,
        top_k: usize,
        deadline: Option<tokio::time::Instant>,
    ) -> JoinHandle<FileOutcome> {
        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let work = async {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|error| PipelineError::Internal(error.to_string()))?;
                pipeline.run(&image, &index_name, top_k).await
            };

            let result = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, work)
                    .await
                    .unwrap_or(Err(PipelineError::DeadlineElapsed)),
                None => work.await,
            };

            match result {
                Ok(results) => FileOutcome::Matches(results),
                Err(error) => {
                    warn!(
                        file = ?image.file_name,
                        index = %index_name,
                        kind = ?error.kind(),
                        "file failed: {error}"
                    );
                    FileOutcome::Failed(FileError::from_pipeline(
                        image.file_name.as_deref(),
                        &index_name,
                        &error,
                    ))
                }
            }
        })
    }
}

/// `topK` must be present and a positive decimal integer.
pub fn parse_top_k(raw: Option<&str>) -> Result<usize, ValidationError> {
    let raw = raw.map(str::trim).ok_or(ValidationError::MissingField("topK"))?;
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ValidationError::InvalidTopK);
    }

    match raw.parse::<usize>() {
        Ok(0) | Err(_) => Err(ValidationError::InvalidTopK),
        Ok(value) => Ok(value),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "file task panicked".to_string()
    }
}
