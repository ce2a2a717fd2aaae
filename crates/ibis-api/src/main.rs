use std::sync::Arc;

use ibis_api::{
    agent::{build_graph, token_provider, vertex_client},
    build_router,
    config::Config,
    error::ApiError,
    middleware::logging::init_logging,
    state::AppState,
    telemetry::{feedback_log, init_telemetry},
};
use ibis_observability::Observer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| ApiError::Config(e.to_string()))?;

    init_logging(&config.logging);

    tracing::info!("Starting ibis-crew-ai API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let token = token_provider(&config)?;

    // Telemetry failures never stop the server
    let telemetry = match init_telemetry(&config.telemetry, &config.llm.location, Arc::clone(&token)).await {
        Ok(telemetry) => telemetry,
        Err(e) => {
            tracing::error!("Failed to initialize Telemetry: {}", e);
            None
        }
    };
    let observer = telemetry
        .as_ref()
        .map(|t| Arc::clone(&t.observer) as Arc<dyn Observer>);

    tracing::info!("Initializing Vertex AI client");
    let client = vertex_client(&config, Arc::clone(&token))?;
    let graph = build_graph(&config, client, observer)?;

    let state = Arc::new(AppState::new(
        config.clone(),
        graph,
        feedback_log(&config.telemetry, Arc::clone(&token))?,
    ));

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("API docs: http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(telemetry) = telemetry {
        telemetry.processor.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
