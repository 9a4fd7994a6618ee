use crate::cli::ServerOptions;
use crate::routes;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use image_match_core::{ImageEmbedder, ImageStore, VectorIndex};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn build_router<S, E, V>(state: AppState<S, E, V>, max_body_bytes: usize) -> Router
where
    S: ImageStore + Send + Sync + 'static,
    E: ImageEmbedder + Send + Sync + 'static,
    V: VectorIndex + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(routes::health_check))
        .route("/home", get(routes::home))
        .route("/debug/env", get(routes::debug_env::<S, E, V>))
        .route("/search", post(routes::search::<S, E, V>))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until Ctrl+C or SIGTERM.
pub async fn serve<S, E, V>(state: AppState<S, E, V>, options: &ServerOptions) -> anyhow::Result<()>
where
    S: ImageStore + Send + Sync + 'static,
    E: ImageEmbedder + Send + Sync + 'static,
    V: VectorIndex + Send + Sync + 'static,
{
    let addr: SocketAddr = format!("{}:{}", options.host, options.port).parse()?;
    let app = build_router(state, options.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, max_body_bytes = options.max_body_bytes, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
