use clap::Parser;
use image_match_core::RawSettings;

/// Every setting is also read from the environment (and from `.env` when present).
#[derive(Debug, Parser)]
#[command(name = "image-match-server", version)]
pub struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Largest accepted request body, in megabytes
    #[arg(long, env = "MAX_UPLOAD_MB", default_value = "25")]
    pub max_upload_mb: usize,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    /// Azure AI Search service URL
    #[arg(long, env = "AZURE_SEARCH_SERVICE_ENDPOINT")]
    pub search_endpoint: Option<String>,

    /// Azure AI Search admin key
    #[arg(long, env = "AZURE_SEARCH_ADMIN_KEY", hide_env_values = true)]
    pub search_admin_key: Option<String>,

    /// Azure AI Search REST api-version
    #[arg(long, env = "AZURE_SEARCH_API_VERSION")]
    pub search_api_version: Option<String>,

    /// Vector field queried in every index
    #[arg(long, env = "AZURE_SEARCH_VECTOR_FIELD")]
    pub search_vector_field: Option<String>,

    /// Index used when a request does not name one
    #[arg(long, env = "AZURE_SEARCH_INDEX_NAME")]
    pub search_index_name: Option<String>,

    /// Largest topK a request may ask for
    #[arg(long, env = "AZURE_SEARCH_TOP_K")]
    pub search_max_top_k: Option<usize>,

    /// Seconds to wait for one search call
    #[arg(long, env = "AZURE_SEARCH_TIMEOUT_SECS")]
    pub search_timeout_secs: Option<u64>,

    /// Azure AI Vision endpoint
    #[arg(long, env = "AZURE_AI_VISION_ENDPOINT")]
    pub vision_endpoint: Option<String>,

    /// Azure AI Vision key
    #[arg(long, env = "AZURE_AI_VISION_API_KEY", hide_env_values = true)]
    pub vision_api_key: Option<String>,

    /// api-version sent to vectorizeImage
    #[arg(long, env = "AZURE_AI_VISION_MODEL_VERSION")]
    pub vision_api_version: Option<String>,

    /// model-version sent to vectorizeImage
    #[arg(long, env = "AZURE_AI_VISION_VECTORIZE_MODEL")]
    pub vision_model_version: Option<String>,

    /// Seconds to wait for one embedding call
    #[arg(long, env = "EMBEDDING_TIMEOUT_SECS")]
    pub embedding_timeout_secs: Option<u64>,

    /// Storage account connection string
    #[arg(long, env = "BLOB_CONNECTION_STRING", hide_env_values = true)]
    pub blob_connection_string: Option<String>,

    /// Container that receives uploaded images
    #[arg(long, env = "BLOB_CONTAINER_NAME")]
    pub blob_container_name: Option<String>,

    /// Seconds to wait for one blob upload
    #[arg(long, env = "BLOB_UPLOAD_TIMEOUT_SECS")]
    pub upload_timeout_secs: Option<u64>,

    /// Files processed concurrently within one batch
    #[arg(long, env = "SEARCH_MAX_CONCURRENCY")]
    pub max_concurrency: Option<usize>,

    /// Overall batch deadline in seconds; unset means no deadline
    #[arg(long, env = "SEARCH_BATCH_DEADLINE_SECS")]
    pub batch_deadline_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
    pub log_json: bool,
}

impl Cli {
    pub fn into_parts(self) -> (RawSettings, ServerOptions) {
        let options = ServerOptions {
            host: self.host,
            port: self.port,
            max_body_bytes: self.max_upload_mb.saturating_mul(1024 * 1024),
            log_json: self.log_json,
        };

        let settings = RawSettings {
            search_endpoint: self.search_endpoint,
            search_admin_key: self.search_admin_key,
            search_api_version: self.search_api_version,
            search_vector_field: self.search_vector_field,
            search_index_name: self.search_index_name,
            search_max_top_k: self.search_max_top_k,
            search_timeout_secs: self.search_timeout_secs,
            vision_endpoint: self.vision_endpoint,
            vision_api_key: self.vision_api_key,
            vision_api_version: self.vision_api_version,
            vision_model_version: self.vision_model_version,
            embedding_timeout_secs: self.embedding_timeout_secs,
            blob_connection_string: self.blob_connection_string,
            blob_container_name: self.blob_container_name,
            upload_timeout_secs: self.upload_timeout_secs,
            max_concurrency: self.max_concurrency,
            batch_deadline_secs: self.batch_deadline_secs,
        };

        (settings, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image_match_core::{ConfigError, ServiceConfig};

    #[test]
    fn flags_map_onto_settings() -> Result<(), Box<dyn std::error::Error>> {
        let cli = Cli::try_parse_from([
            "image-match-server",
            "--port",
            "9000",
            "--max-upload-mb",
            "2",
            "--search-endpoint",
            "https://catalog.search.windows.net",
            "--search-admin-key",
            "admin",
            "--vision-endpoint",
            "https://vision.cognitiveservices.azure.com",
            "--vision-api-key",
            "vision",
            "--blob-connection-string",
            "AccountName=photos;AccountKey=c2VjcmV0",
            "--blob-container-name",
            "uploads",
            "--max-concurrency",
            "3",
            "--log-json",
        ])?;

        let (settings, options) = cli.into_parts();
        assert_eq!(options.port, 9000);
        assert!(options.log_json);
        assert_eq!(options.max_body_bytes, 2 * 1024 * 1024);

        let config = ServiceConfig::try_from(settings)?;
        assert_eq!(config.pipeline.max_concurrency, 3);
        assert_eq!(config.storage.container, "uploads");
        Ok(())
    }

    #[test]
    fn missing_storage_settings_fail_fast() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from([
            "image-match-server",
            "--search-endpoint",
            "https://catalog.search.windows.net",
            "--search-admin-key",
            "admin",
            "--vision-endpoint",
            "https://vision.cognitiveservices.azure.com",
            "--vision-api-key",
            "vision",
            "--blob-container-name",
            "uploads",
        ])?;
        let (mut settings, _) = cli.into_parts();
        settings.blob_connection_string = None;

        assert_eq!(
            ServiceConfig::try_from(settings).err(),
            Some(ConfigError::Missing("BLOB_CONNECTION_STRING"))
        );
        Ok(())
    }
}
