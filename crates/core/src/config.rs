use crate::error::ConfigError;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_VISION_API_VERSION: &str = "2024-02-01";
pub const DEFAULT_SEARCH_API_VERSION: &str = "2023-11-01";
pub const DEFAULT_VECTOR_FIELD: &str = "imageVector";
pub const DEFAULT_MAX_TOP_K: usize = 50;
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 60;

/// Unvalidated settings as they come from flags or the environment.
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
    pub search_endpoint: Option<String>,
    pub search_admin_key: Option<String>,
    pub search_api_version: Option<String>,
    pub search_vector_field: Option<String>,
    pub search_index_name: Option<String>,
    pub search_max_top_k: Option<usize>,
    pub search_timeout_secs: Option<u64>,
    pub vision_endpoint: Option<String>,
    pub vision_api_key: Option<String>,
    pub vision_api_version: Option<String>,
    pub vision_model_version: Option<String>,
    pub embedding_timeout_secs: Option<u64>,
    pub blob_connection_string: Option<String>,
    pub blob_container_name: Option<String>,
    pub upload_timeout_secs: Option<u64>,
    pub max_concurrency: Option<usize>,
    pub batch_deadline_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct VisionSettings {
    pub endpoint: Url,
    pub api_key: String,
    pub api_version: String,
    pub model_version: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub endpoint: Url,
    pub admin_key: String,
    pub api_version: String,
    pub vector_field: String,
    pub default_index: Option<String>,
    pub max_top_k: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub connection: StorageConnection,
    pub container: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_concurrency: usize,
    pub batch_deadline: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            batch_deadline: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub vision: VisionSettings,
    pub search: SearchSettings,
    pub storage: StorageSettings,
    pub pipeline: PipelineSettings,
}

impl TryFrom<RawSettings> for ServiceConfig {
    type Error = ConfigError;

    fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
        let search = SearchSettings {
            endpoint: parse_endpoint(
                "AZURE_SEARCH_SERVICE_ENDPOINT",
                require("AZURE_SEARCH_SERVICE_ENDPOINT", raw.search_endpoint)?,
            )?,
            admin_key: require("AZURE_SEARCH_ADMIN_KEY", raw.search_admin_key)?,
            api_version: optional(raw.search_api_version)
                .unwrap_or_else(|| DEFAULT_SEARCH_API_VERSION.to_string()),
            vector_field: optional(raw.search_vector_field)
                .unwrap_or_else(|| DEFAULT_VECTOR_FIELD.to_string()),
            default_index: optional(raw.search_index_name),
            max_top_k: positive(
                "AZURE_SEARCH_TOP_K",
                raw.search_max_top_k.unwrap_or(DEFAULT_MAX_TOP_K),
            )?,
            timeout: timeout(
                "AZURE_SEARCH_TIMEOUT_SECS",
                raw.search_timeout_secs,
                DEFAULT_SEARCH_TIMEOUT_SECS,
            )?,
        };

        let vision = VisionSettings {
            endpoint: parse_endpoint(
                "AZURE_AI_VISION_ENDPOINT",
                require("AZURE_AI_VISION_ENDPOINT", raw.vision_endpoint)?,
            )?,
            api_key: require("AZURE_AI_VISION_API_KEY", raw.vision_api_key)?,
            api_version: optional(raw.vision_api_version)
                .unwrap_or_else(|| DEFAULT_VISION_API_VERSION.to_string()),
            model_version: optional(raw.vision_model_version),
            timeout: timeout(
                "EMBEDDING_TIMEOUT_SECS",
                raw.embedding_timeout_secs,
                DEFAULT_EMBEDDING_TIMEOUT_SECS,
            )?,
        };

        let storage = StorageSettings {
            connection: StorageConnection::parse(&require(
                "BLOB_CONNECTION_STRING",
                raw.blob_connection_string,
            )?)?,
            container: require("BLOB_CONTAINER_NAME", raw.blob_container_name)?,
            timeout: timeout(
                "BLOB_UPLOAD_TIMEOUT_SECS",
                raw.upload_timeout_secs,
                DEFAULT_UPLOAD_TIMEOUT_SECS,
            )?,
        };

        let pipeline = PipelineSettings {
            max_concurrency: positive(
                "SEARCH_MAX_CONCURRENCY",
                raw.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY),
            )?,
            batch_deadline: raw
                .batch_deadline_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        };

        Ok(Self {
            vision,
            search,
            storage,
            pipeline,
        })
    }
}

pub fn require(key: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    optional(value).ok_or(ConfigError::Missing(key))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn positive(key: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            details: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Per-request timeout for one provider call, in whole seconds.
fn timeout(key: &'static str, secs: Option<u64>, default: u64) -> Result<Duration, ConfigError> {
    match secs.unwrap_or(default) {
        0 => Err(ConfigError::Invalid {
            key,
            details: "must be greater than zero".to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_endpoint(key: &'static str, value: String) -> Result<Url, ConfigError> {
    let trimmed = value.trim_end_matches('/');
    Url::parse(trimmed).map_err(|error| ConfigError::Invalid {
        key,
        details: error.to_string(),
    })
}

#[derive(Clone)]
pub enum StorageCredential {
    SharedKey { account: String, key: Vec<u8> },
    Sas(String),
}

impl fmt::Debug for StorageCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageCredential::SharedKey { account, .. } => f
                .debug_struct("SharedKey")
                .field("account", account)
                .field("key", &"***")
                .finish(),
            StorageCredential::Sas(_) => f.debug_tuple("Sas").field(&"***").finish(),
        }
    }
}

/// Parsed Azure storage connection string.
#[derive(Debug, Clone)]
pub struct StorageConnection {
    pub blob_endpoint: Url,
    pub credential: StorageCredential,
}

impl StorageConnection {
    pub fn parse(connection_string: &str) -> Result<Self, ConfigError> {
        const KEY: &str = "BLOB_CONNECTION_STRING";

        let pairs: HashMap<String, String> = connection_string
            .split(';')
            .filter(|part| !part.trim().is_empty())
            .filter_map(|part| part.split_once('='))
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
            .collect();

        let invalid = |details: &str| ConfigError::Invalid {
            key: KEY,
            details: details.to_string(),
        };

        let explicit_endpoint = pairs
            .get("blobendpoint")
            .map(|endpoint| parse_endpoint(KEY, endpoint.clone()))
            .transpose()?;

        if let Some(token) = pairs.get("sharedaccesssignature") {
            let blob_endpoint = explicit_endpoint
                .ok_or_else(|| invalid("SharedAccessSignature requires BlobEndpoint"))?;
            return Ok(Self {
                blob_endpoint,
                credential: StorageCredential::Sas(token.trim_start_matches('?').to_string()),
            });
        }

        let account = pairs
            .get("accountname")
            .cloned()
            .ok_or_else(|| invalid("AccountName is missing"))?;
        let encoded_key = pairs
            .get("accountkey")
            .ok_or_else(|| invalid("AccountKey is missing"))?;
        let key = STANDARD
            .decode(encoded_key)
            .map_err(|_| invalid("AccountKey is not valid base64"))?;

        let blob_endpoint = match explicit_endpoint {
            Some(endpoint) => endpoint,
            None => {
                let protocol = pairs
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = pairs
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or("core.windows.net");
                parse_endpoint(KEY, format!("{protocol}://{account}.blob.{suffix}"))?
            }
        };

        Ok(Self {
            blob_endpoint,
            credential: StorageCredential::SharedKey { account, key },
        })
    }
}
