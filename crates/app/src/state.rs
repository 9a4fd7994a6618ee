use image_match_core::{
    AzureBlobStore, AzureOrchestrator, AzureSearchIndex, AzureVisionEmbedder, BatchOrchestrator,
    FilePipeline, ImageEmbedder, ImageStore, RequestLimits, ServiceConfig, VectorIndex,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const NOT_SET: &str = "NOT_SET";
const REDACTED: &str = "***";

/// Shared, read-only handles given to every request.
pub struct AppState<S, E, V>
where
    S: ImageStore,
    E: ImageEmbedder,
    V: VectorIndex,
{
    pub orchestrator: Arc<BatchOrchestrator<S, E, V>>,
    pub environment: Arc<EnvironmentReport>,
}

impl<S, E, V> Clone for AppState<S, E, V>
where
    S: ImageStore,
    E: ImageEmbedder,
    V: VectorIndex,
{
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            environment: Arc::clone(&self.environment),
        }
    }
}

impl<S, E, V> AppState<S, E, V>
where
    S: ImageStore,
    E: ImageEmbedder,
    V: VectorIndex,
{
    pub fn new(orchestrator: BatchOrchestrator<S, E, V>, environment: EnvironmentReport) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            environment: Arc::new(environment),
        }
    }
}

pub type AzureState = AppState<AzureBlobStore, AzureVisionEmbedder, AzureSearchIndex>;

/// Builds the process-wide clients once from validated configuration.
pub fn azure_state(config: &ServiceConfig) -> anyhow::Result<AzureState> {
    let store = AzureBlobStore::new(&config.storage)?;
    let embedder = AzureVisionEmbedder::new(&config.vision)?;
    let index = AzureSearchIndex::new(&config.search)?;

    let orchestrator: AzureOrchestrator = BatchOrchestrator::new(
        FilePipeline::new(store, embedder, index),
        config.pipeline.clone(),
        RequestLimits {
            default_index: config.search.default_index.clone(),
            max_top_k: config.search.max_top_k,
        },
    );

    Ok(AppState::new(orchestrator, EnvironmentReport::from_config(config)))
}

/// Configuration summary served by `/debug/env`, with secrets masked.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct EnvironmentReport(BTreeMap<&'static str, String>);

impl EnvironmentReport {
    pub fn from_config(config: &ServiceConfig) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            "AZURE_SEARCH_SERVICE_ENDPOINT",
            config.search.endpoint.to_string(),
        );
        entries.insert("AZURE_SEARCH_ADMIN_KEY", mask(&config.search.admin_key));
        entries.insert(
            "AZURE_SEARCH_INDEX_NAME",
            config
                .search
                .default_index
                .clone()
                .unwrap_or_else(|| NOT_SET.to_string()),
        );
        entries.insert("AZURE_AI_VISION_ENDPOINT", config.vision.endpoint.to_string());
        entries.insert("AZURE_AI_VISION_API_KEY", mask(&config.vision.api_key));
        entries.insert("BLOB_CONNECTION_STRING", REDACTED.to_string());
        entries.insert("BLOB_CONTAINER_NAME", config.storage.container.clone());
        Self(entries)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        NOT_SET.to_string()
    } else {
        REDACTED.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image_match_core::RawSettings;

    fn config() -> ServiceConfig {
        ServiceConfig::try_from(RawSettings {
            search_endpoint: Some("https://catalog.search.windows.net".to_string()),
            search_admin_key: Some("admin-secret".to_string()),
            vision_endpoint: Some("https://vision.cognitiveservices.azure.com".to_string()),
            vision_api_key: Some("vision-secret".to_string()),
            blob_connection_string: Some("AccountName=photos;AccountKey=c2VjcmV0".to_string()),
            blob_container_name: Some("uploads".to_string()),
            ..RawSettings::default()
        })
        .expect("valid test configuration")
    }

    #[test]
    fn report_masks_secrets() -> Result<(), serde_json::Error> {
        let report = EnvironmentReport::from_config(&config());
        let rendered = serde_json::to_string(&report)?;

        assert!(!rendered.contains("admin-secret"));
        assert!(!rendered.contains("vision-secret"));
        assert!(!rendered.contains("c2VjcmV0"));
        assert_eq!(report.get("AZURE_SEARCH_ADMIN_KEY"), Some("***"));
        assert_eq!(report.get("AZURE_SEARCH_INDEX_NAME"), Some("NOT_SET"));
        assert_eq!(report.get("BLOB_CONTAINER_NAME"), Some("uploads"));
        Ok(())
    }

    #[test]
    fn azure_state_builds_from_valid_config() -> anyhow::Result<()> {
        let state = azure_state(&config())?;
        assert_eq!(state.orchestrator.limits().max_top_k, 50);
        Ok(())
    }
}
