pub mod observer;
pub mod types;
pub mod context;
pub mod span;
pub mod exporter;
pub mod gcp;
pub mod processor;
pub mod span_observer;
pub mod mock;

// Re-export main types
pub use observer::Observer;
pub use types::{
    NodeObservation, NodeObservationData, ObservedMessage, ToolCallInfo, ToolResultInfo,
};
pub use context::{TracingContext, TracingError};
pub use span::{SpanData, SpanStatus};
pub use exporter::{
    CloudTraceLoggingSpanExporter, ExportResult, SpanExporter, BUCKET_NOT_FOUND,
    MAX_ATTRIBUTES_SIZE,
};
pub use gcp::{
    AccessTokenProvider, CloudLoggingClient, CloudTraceExporter, GcsClient, LogSeverity,
    LogWriter, MetadataServerToken, ObjectStore, StaticToken,
};
pub use processor::{BatchConfig, BatchSpanProcessor};
pub use span_observer::SpanObserver;
