use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use image_match_core::{FileOutcome, ImageEmbedder, ImageStore, UploadedImage, VectorIndex};
use serde_json::json;
use std::sync::Arc;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "message": "API is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn home() -> &'static str {
    "This is an Image Search API"
}

pub async fn debug_env<S, E, V>(State(state): State<AppState<S, E, V>>) -> impl IntoResponse
where
    S: ImageStore + Send + Sync + 'static,
    E: ImageEmbedder + Send + Sync + 'static,
    V: VectorIndex + Send + Sync + 'static,
{
    Json(state.environment.as_ref().clone())
}

#[derive(Debug, Default)]
struct SearchForm {
    index_name: Option<String>,
    top_k: Option<String>,
    files: Option<Vec<UploadedImage>>,
}

async fn read_form(mut multipart: Multipart) -> ApiResult<SearchForm> {
    let mut form = SearchForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("indexName") => form.index_name = Some(field.text().await?),
            Some("topK") => form.top_k = Some(field.text().await?),
            Some("files") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                form.files.get_or_insert_with(Vec::new).push(UploadedImage {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            other => tracing::debug!(field = ?other, "ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// `POST /search`: one JSON entry per uploaded file, in upload order.
pub async fn search<S, E, V>(
    State(state): State<AppState<S, E, V>>,
    multipart: Multipart,
) -> ApiResult<Json<Vec<FileOutcome>>>
where
    S: ImageStore + Send + Sync + 'static,
    E: ImageEmbedder + Send + Sync + 'static,
    V: VectorIndex + Send + Sync + 'static,
{
    let form = read_form(multipart).await?;
    let request = state
        .orchestrator
        .prepare(form.index_name, form.top_k.as_deref(), form.files)?;

    let orchestrator = Arc::clone(&state.orchestrator);
    let outcomes = tokio::spawn(async move { orchestrator.run(request).await })
        .await
        .map_err(|error| ApiError::Internal(error.to_string()))??;

    Ok(Json(outcomes))
}
