pub mod agent;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod remote;
pub mod schema;
pub mod state;
pub mod telemetry;
pub mod tracing_props;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::handlers::{feedback, root, stream};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(title = "ibis-crew-ai", description = "API for interacting with the Agent ibis-crew-ai"),
    paths(root::redirect_root_to_docs, feedback::collect_feedback, stream::stream_chat_events),
    components(schemas(
        schema::Feedback,
        schema::StatusResponse,
        schema::StreamRequest,
        schema::InputChat,
        schema::RunConfig,
        schema::ChatMessage,
        schema::MessageContent,
        schema::ContentBlock,
        schema::ImageUrlRef,
        schema::WireToolCall,
    ))
)]
pub struct ApiDoc;

pub fn build_router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/", get(root::redirect_root_to_docs))
        .route("/feedback", post(feedback::collect_feedback))
        .route("/stream_messages", post(stream::stream_chat_events))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn(middleware::logging::log_request))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let mut cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors = cors.allow_origin(Any);
        } else {
            let origins: Vec<axum::http::HeaderValue> = config
                .cors
                .origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            cors = cors.allow_origin(origins);
        }

        cors
    } else {
        CorsLayer::permissive()
    }
}
