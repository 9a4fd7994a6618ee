use crate::config::VisionSettings;
use crate::traits::ImageEmbedder;
use crate::{Embedding, EmbeddingError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Azure AI Vision `retrieval:vectorizeImage` client.
pub struct AzureVisionEmbedder {
    url: Url,
    api_key: String,
    client: Client,
}

impl AzureVisionEmbedder {
    pub fn new(settings: &VisionSettings) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(settings.timeout))
            .build()
            .map_err(|error| EmbeddingError::Unexpected(error.to_string()))?;

        Ok(Self {
            url: vectorize_url(settings)?,
            api_key: settings.api_key.clone(),
            client,
        })
    }
}

fn vectorize_url(settings: &VisionSettings) -> Result<Url, EmbeddingError> {
    let mut url = settings.endpoint.clone();
    url.path_segments_mut()
        .map_err(|_| {
            EmbeddingError::Unexpected(format!(
                "vision endpoint cannot be a base url: {}",
                settings.endpoint
            ))
        })?
        .pop_if_empty()
        .extend(["computervision", "retrieval:vectorizeImage"]);

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("api-version", &settings.api_version);
        if let Some(model_version) = &settings.model_version {
            query.append_pair("model-version", model_version);
        }
    }

    Ok(url)
}

fn parse_vector_response(body: &Value) -> Result<Embedding, EmbeddingError> {
    let vector = body
        .pointer("/vector")
        .and_then(Value::as_array)
        .ok_or_else(|| EmbeddingError::MalformedResponse("missing vector field".to_string()))?;

    let values = vector
        .iter()
        .map(|value| {
            value.as_f64().map(|number| number as f32).ok_or_else(|| {
                EmbeddingError::MalformedResponse(format!("non-numeric vector entry {value}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Embedding::new(values)
}

#[async_trait]
impl ImageEmbedder for AzureVisionEmbedder {
    async fn embed(&self, image_url: &str) -> Result<Embedding, EmbeddingError> {
        let response = self
            .client
            .post(self.url.clone())
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .json(&json!({ "url": image_url }))
            .send()
            .await
            .map_err(EmbeddingError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "vectorizeImage rejected request");
            return Err(EmbeddingError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(EmbeddingError::from_transport)?;
        let embedding = parse_vector_response(&parsed)?;
        debug!(dimensions = embedding.dimensions(), "image vectorized");
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: &str, model_version: Option<&str>) -> VisionSettings {
        VisionSettings {
            endpoint: Url::parse(endpoint).expect("valid endpoint"),
            api_key: "key".to_string(),
            api_version: "2024-02-01".to_string(),
            model_version: model_version.map(str::to_string),
            timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn vectorize_url_carries_versions() -> Result<(), EmbeddingError> {
        let url = vectorize_url(&settings(
            "https://vision.cognitiveservices.azure.com/",
            Some("2023-04-15"),
        ))?;
        assert_eq!(
            url.as_str(),
            "https://vision.cognitiveservices.azure.com/computervision/retrieval:vectorizeImage?api-version=2024-02-01&model-version=2023-04-15"
        );

        let url = vectorize_url(&settings("https://vision.cognitiveservices.azure.com", None))?;
        assert!(url.as_str().ends_with("retrieval:vectorizeImage?api-version=2024-02-01"));
        Ok(())
    }

    #[test]
    fn vector_response_is_parsed() -> Result<(), EmbeddingError> {
        let embedding = parse_vector_response(&json!({
            "modelVersion": "2023-04-15",
            "vector": [0.5, -0.25, 1.0]
        }))?;
        assert_eq!(embedding.as_slice(), &[0.5, -0.25, 1.0]);
        Ok(())
    }

    #[test]
    fn missing_or_garbled_vector_is_malformed() {
        assert!(matches!(
            parse_vector_response(&json!({ "modelVersion": "x" })),
            Err(EmbeddingError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_vector_response(&json!({ "vector": ["a"] })),
            Err(EmbeddingError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_vector_response(&json!({ "vector": [] })),
            Err(EmbeddingError::MalformedResponse(_))
        ));
    }
}
