use chrono::Utc;
use clap::Parser;
use image_match_core::ServiceConfig;
use image_match_server::{azure_state, serve, Cli};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    let dotenv = dotenvy::dotenv().ok();

    let (settings, options) = Cli::parse().into_parts();
    init_tracing(options.log_json);

    if let Some(path) = dotenv {
        info!(path = %path.display(), "loaded environment file");
    }

    let config = ServiceConfig::try_from(settings).map_err(|config_error| {
        error!(error = %config_error, "configuration rejected");
        config_error
    })?;

    let state = azure_state(&config)?;
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        container = %config.storage.container,
        max_concurrency = config.pipeline.max_concurrency,
        max_top_k = config.search.max_top_k,
        "image-match-server boot"
    );

    serve(state, &options).await
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();
}
