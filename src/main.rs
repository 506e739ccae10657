use anyhow::{Context, Result};
use lawguide::{init_tracing, DEFAULT_LOG_FILTER};
use lawguide_api::ApiServer;
use lawguide_core::{AppContext, Settings};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_LOG_FILTER);

    info!("Starting LawGuide API...");

    let settings = Settings::load().context("failed to load configuration")?;
    let server_config = settings.server.clone();

    let context = AppContext::initialize(settings)
        .await
        .context("failed to initialize the question-answering pipeline")?;

    let server = ApiServer::new(server_config, Arc::new(context));
    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
