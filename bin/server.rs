// Unit Economics Dashboard - Web Server
// REST API with Axum; routes live in unit_economics::api

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use unit_economics::api::{router, AppState};
use unit_economics::{init_tracing, open_database, Assistant, Config, OllamaClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing(config.log_format);
    config.log_rejected();

    let conn = open_database(Path::new(&config.db_path))?;
    tracing::info!("Database path in use: {}", config.db_path);

    let client = OllamaClient::new(
        &config.ollama_url,
        &config.ollama_model,
        config.assistant_timeout,
    )
    .context("Failed to build assistant client")?;
    tracing::info!(url = %config.ollama_url, model = %client.model(), "Assistant configured");
    let assistant = Assistant::new(Arc::new(client)).with_history_limit(config.history_limit);

    let app = router(AppState::new(conn, assistant));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;

    tracing::info!("🚀 Listening on http://{}", config.listen_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
