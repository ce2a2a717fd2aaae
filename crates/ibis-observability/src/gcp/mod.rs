//! Minimal REST clients for the Google Cloud services the exporter talks to

pub mod auth;
pub mod logging;
pub mod storage;
pub mod trace;

pub use auth::{AccessTokenProvider, MetadataServerToken, StaticToken};
pub use logging::{CloudLoggingClient, LogSeverity, LogWriter};
pub use storage::{GcsClient, ObjectStore};
pub use trace::CloudTraceExporter;

use anyhow::{Context, Result};
use std::time::Duration;

pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to create HTTP client")
}

/// Pass successful responses through, turn anything else into an error with the body
pub(crate) async fn handle_response(response: reqwest::Response, api: &str) -> Result<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        tracing::debug!("{} request successful: {}", api, status);
        Ok(response)
    } else {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response body".to_string());

        tracing::error!("{} request failed: status={}, body={}", api, status, body);

        anyhow::bail!("{} error: {} - {}", api, status, body)
    }
}
