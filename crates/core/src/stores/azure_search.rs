use crate::config::SearchSettings;
use crate::traits::VectorIndex;
use crate::{CandidateMatch, Embedding, SearchError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

const SELECTED_FIELDS: &str = "title,imageUrl";

/// Pure vector query against an Azure AI Search index.
pub struct AzureSearchIndex {
    client: Arc<Client>,
    endpoint: Url,
    admin_key: String,
    api_version: String,
    vector_field: String,
}

impl AzureSearchIndex {
    pub fn new(settings: &SearchSettings) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|error| SearchError::Connection(error.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            endpoint: settings.endpoint.clone(),
            admin_key: settings.admin_key.clone(),
            api_version: settings.api_version.clone(),
            vector_field: settings.vector_field.clone(),
        })
    }

    fn search_url(&self, index_name: &str) -> Result<Url, SearchError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| SearchError::MalformedResponse("search endpoint cannot be a base".into()))?
            .pop_if_empty()
            .extend(["indexes", index_name, "docs", "search"]);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }
}

fn build_query(embedding: &Embedding, vector_field: &str, top_k: usize) -> Value {
    json!({
        "vectorQueries": [
            {
                "kind": "vector",
                "vector": embedding.as_slice(),
                "k": top_k,
                "fields": vector_field,
            }
        ],
        "select": SELECTED_FIELDS,
        "top": top_k,
    })
}

fn parse_hits(body: &Value) -> Result<Vec<CandidateMatch>, SearchError> {
    let hits = body
        .pointer("/value")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::MalformedResponse("missing value array".to_string()))?;

    Ok(hits
        .iter()
        .map(|hit| {
            let title = hit
                .pointer("/title")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let image_url = hit
                .pointer("/imageUrl")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let score = hit
                .get("@search.score")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);

            CandidateMatch::new(title, image_url, score)
        })
        .collect())
}

#[async_trait]
impl VectorIndex for AzureSearchIndex {
    async fn search(
        &self,
        index_name: &str,
        embedding: Embedding,
        top_k: usize,
    ) -> Result<Vec<CandidateMatch>, SearchError> {
        let body = build_query(&embedding, &self.vector_field, top_k);

        let response = self
            .client
            .post(self.search_url(index_name)?)
            .header("api-key", &self.admin_key)
            .json(&body)
            .send()
            .await
            .map_err(SearchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(index = index_name, status = status.as_u16(), "vector search rejected");
            return Err(SearchError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = response.json().await.map_err(SearchError::from_transport)?;
        let hits = parse_hits(&parsed)?;
        debug!(index = index_name, hits = hits.len(), "vector search finished");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn index() -> AzureSearchIndex {
        AzureSearchIndex::new(&SearchSettings {
            endpoint: Url::parse("https://catalog.search.windows.net")
                .expect("valid endpoint"),
            admin_key: "admin".to_string(),
            api_version: "2023-11-01".to_string(),
            vector_field: "imageVector".to_string(),
            default_index: None,
            max_top_k: 50,
            timeout: Duration::from_secs(30),
        })
        .expect("search client")
    }

    #[test]
    fn search_url_targets_request_index() -> Result<(), SearchError> {
        let url = index().search_url("product-carmodelclean")?;
        assert_eq!(
            url.as_str(),
            "https://catalog.search.windows.net/indexes/product-carmodelclean/docs/search?api-version=2023-11-01"
        );
        Ok(())
    }

    #[test]
    fn query_is_vector_only_with_fixed_projection() -> Result<(), Box<dyn std::error::Error>> {
        let embedding = Embedding::new(vec![0.1, 0.2])?;
        let body = build_query(&embedding, "imageVector", 3);

        assert!(body.get("search").is_none());
        assert_eq!(body["select"], "title,imageUrl");
        assert_eq!(body["top"], 3);
        assert_eq!(body["vectorQueries"][0]["k"], 3);
        assert_eq!(body["vectorQueries"][0]["fields"], "imageVector");
        assert_eq!(body["vectorQueries"][0]["kind"], "vector");
        Ok(())
    }

    #[test]
    fn hits_keep_provider_order_and_normalize_scores() -> Result<(), SearchError> {
        let hits = parse_hits(&json!({
            "value": [
                { "@search.score": 0.912345, "title": "Bumper-4471", "imageUrl": "https://a" },
                { "@search.score": 0.5, "title": "Door-12" },
            ]
        }))?;

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Bumper-4471");
        assert_eq!(hits[0].confidence_score, 0.9123);
        assert_eq!(hits[0].similarity_percentage, 91.23);
        assert_eq!(hits[1].image_url, "");
        assert_eq!(hits[1].similarity_percentage, 50.0);
        Ok(())
    }

    #[test]
    fn body_without_value_is_malformed() {
        assert!(matches!(
            parse_hits(&json!({ "error": { "message": "nope" } })),
            Err(SearchError::MalformedResponse(_))
        ));
    }
}
