use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Request logging middleware
///
/// Handlers run inside a `request` span and fill in its `run_id` through
/// [`record_run_id`]. For `/stream_messages` the duration covers the time to
/// the response head only, the body keeps streaming afterwards.
pub async fn log_request(req: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        run_id = tracing::field::Empty,
    );
    let start = Instant::now();

    let response = next.run(req).instrument(span.clone()).await;

    let streaming = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"text/event-stream"));
    span.in_scope(|| {
        tracing::info!(
            status = %response.status(),
            duration_ms = %start.elapsed().as_millis(),
            streaming,
            "Request processed"
        )
    });

    response
}

/// Attach the run id to the enclosing request span
pub fn record_run_id(run_id: &str) {
    tracing::Span::current().record("run_id", run_id);
}

/// Install the global subscriber; `RUST_LOG` wins over the configured level
pub fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
