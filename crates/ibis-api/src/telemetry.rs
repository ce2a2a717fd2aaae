//! Span export pipeline and feedback log sink, wired at startup.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use ibis_observability::{
    AccessTokenProvider, BatchConfig, BatchSpanProcessor, CloudLoggingClient, CloudTraceExporter,
    CloudTraceLoggingSpanExporter, GcsClient, LogSeverity, LogWriter, SpanObserver,
};
use serde_json::Value;

use crate::config::TelemetryConfig;
use crate::schema::SERVICE_NAME;

pub const SPAN_LOG_NAME: &str = "ibis_crew_ai.spans";

pub struct Telemetry {
    pub observer: Arc<SpanObserver>,
    pub processor: Arc<BatchSpanProcessor>,
}

/// Build the Cloud Trace + Cloud Logging exporter behind a batch processor.
///
/// Returns `None` when telemetry is disabled or no project is configured.
/// Must be called inside a tokio runtime.
pub async fn init_telemetry(
    config: &TelemetryConfig,
    location: &str,
    token: Arc<dyn AccessTokenProvider>,
) -> Result<Option<Telemetry>> {
    if !config.enabled {
        tracing::info!("Telemetry disabled");
        return Ok(None);
    }
    let Some(project_id) = config.project_id.as_deref() else {
        tracing::warn!("Telemetry enabled but no project configured; spans will not be exported");
        return Ok(None);
    };

    let bucket = config
        .bucket_name
        .clone()
        .unwrap_or_else(|| CloudTraceLoggingSpanExporter::default_bucket_name(project_id));

    let storage = GcsClient::new(Arc::clone(&token))?;
    if let Err(e) = storage
        .create_bucket_if_not_exists(&bucket, project_id, location)
        .await
    {
        tracing::warn!(bucket = %bucket, "Failed to ensure span bucket exists: {}", e);
    }

    let trace = CloudTraceExporter::new(Arc::clone(&token), project_id)?;
    let logger = CloudLoggingClient::new(Arc::clone(&token), project_id, SPAN_LOG_NAME)?;
    let exporter = CloudTraceLoggingSpanExporter::new(project_id, Arc::new(trace), Arc::new(logger), Arc::new(storage))
        .with_bucket_name(Some(bucket))
        .with_debug(config.debug);

    let processor = Arc::new(BatchSpanProcessor::new(
        Arc::new(exporter),
        BatchConfig {
            max_export_batch_size: config.batch_size,
            scheduled_delay: Duration::from_millis(config.flush_interval_ms),
            ..BatchConfig::default()
        },
    ));

    tracing::info!(project_id, "Span export initialized");
    Ok(Some(Telemetry {
        observer: Arc::new(SpanObserver::new(Arc::clone(&processor))),
        processor,
    }))
}

/// Cloud Logging sink for feedback, or the local log when no project is set
pub fn feedback_log(config: &TelemetryConfig, token: Arc<dyn AccessTokenProvider>) -> Result<Arc<dyn LogWriter>> {
    match config.project_id.as_deref() {
        Some(project_id) if config.enabled => Ok(Arc::new(CloudLoggingClient::new(token, project_id, SERVICE_NAME)?)),
        _ => Ok(Arc::new(LocalLogWriter)),
    }
}

/// Writes structured records to the process log
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalLogWriter;

#[async_trait]
impl LogWriter for LocalLogWriter {
    async fn write_struct(&self, payload: Value, severity: LogSeverity) -> Result<()> {
        match severity {
            LogSeverity::Debug => tracing::debug!(payload = %payload, "structured log"),
            LogSeverity::Info => tracing::info!(payload = %payload, "structured log"),
            LogSeverity::Warning => tracing::warn!(payload = %payload, "structured log"),
            LogSeverity::Error => tracing::error!(payload = %payload, "structured log"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibis_observability::StaticToken;

    fn telemetry(enabled: bool, project_id: Option<&str>) -> TelemetryConfig {
        TelemetryConfig {
            enabled,
            project_id: project_id.map(str::to_string),
            bucket_name: None,
            debug: false,
            batch_size: 16,
            flush_interval_ms: 100,
        }
    }

    #[tokio::test]
    async fn test_disabled_telemetry_builds_nothing() {
        let token: Arc<dyn AccessTokenProvider> = Arc::new(StaticToken::new("t"));
        let result = init_telemetry(&telemetry(false, Some("p")), "us-central1", token)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_missing_project_builds_nothing() {
        let token: Arc<dyn AccessTokenProvider> = Arc::new(StaticToken::new("t"));
        let result = init_telemetry(&telemetry(true, None), "us-central1", token)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_local_log_writer_accepts_records() {
        LocalLogWriter
            .write_struct(serde_json::json!({"score": 4}), LogSeverity::Info)
            .await
            .unwrap();
    }
}
