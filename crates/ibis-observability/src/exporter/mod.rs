pub mod cloud_trace_logging;

pub use cloud_trace_logging::{CloudTraceLoggingSpanExporter, BUCKET_NOT_FOUND, MAX_ATTRIBUTES_SIZE};

use crate::span::SpanData;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportResult {
    Success,
    Failure,
}

/// Destination for finished spans
#[async_trait]
pub trait SpanExporter: Send + Sync {
    async fn export(&self, batch: Vec<SpanData>) -> ExportResult;

    /// Flush and release resources; called once by the processor on shutdown
    async fn shutdown(&self) {}
}
