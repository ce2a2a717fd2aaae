// Trace exporter decorator that also writes every span to Cloud Logging.
//
// Cloud Trace truncates attribute values, Cloud Logging caps entries at 256 KiB.
// Attribute payloads above the cap go to Cloud Storage and the log record keeps
// only references to the stored object.

use super::{ExportResult, SpanExporter};
use crate::gcp::{LogSeverity, LogWriter, ObjectStore};
use crate::span::SpanData;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Largest serialized attribute payload that is logged inline
pub const MAX_ATTRIBUTES_SIZE: usize = 255 * 1024;

/// Returned by `store_in_gcs` instead of a URI when the bucket does not exist
pub const BUCKET_NOT_FOUND: &str = "GCS bucket not found";

pub struct CloudTraceLoggingSpanExporter {
    inner: Arc<dyn SpanExporter>,
    logger: Arc<dyn LogWriter>,
    storage: Arc<dyn ObjectStore>,
    project_id: String,
    bucket_name: String,
    debug: bool,
}

impl CloudTraceLoggingSpanExporter {
    pub fn new(
        project_id: impl Into<String>,
        inner: Arc<dyn SpanExporter>,
        logger: Arc<dyn LogWriter>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        let project_id = project_id.into();
        Self {
            bucket_name: Self::default_bucket_name(&project_id),
            inner,
            logger,
            storage,
            project_id,
            debug: false,
        }
    }

    pub fn default_bucket_name(project_id: &str) -> String {
        format!("{}-ibis-crew-ai-logs-data", project_id)
    }

    /// Override the payload bucket; `None` keeps the project default
    ///
    /// A leading `gs://` is stripped, matching `GcsClient::create_bucket_if_not_exists`.
    pub fn with_bucket_name(mut self, bucket_name: Option<String>) -> Self {
        let name = bucket_name.map(|n| match n.strip_prefix("gs://") {
            Some(bare) => bare.to_string(),
            None => n,
        });
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.bucket_name = name;
        }
        self
    }

    /// Also emit every record at DEBUG severity
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Upload `content` to `spans/{span_id}.json` and return its `gs://` URI
    ///
    /// Returns [`BUCKET_NOT_FOUND`] without uploading when the bucket is missing.
    pub async fn store_in_gcs(&self, content: Vec<u8>, span_id: &str) -> Result<String> {
        if !self.storage.bucket_exists(&self.bucket_name).await? {
            tracing::warn!(
                bucket_name = %self.bucket_name,
                "Bucket not found. Unable to store span attributes in GCS."
            );
            return Ok(BUCKET_NOT_FOUND.to_string());
        }

        let object = format!("spans/{}.json", span_id);
        self.storage
            .upload(&self.bucket_name, &object, content, "application/json")
            .await?;
        Ok(format!("gs://{}/{}", self.bucket_name, object))
    }

    /// Swap oversized attributes for references to the stored payload
    pub async fn process_large_attributes(&self, record: &mut Value, span_id: &str) {
        let attributes = record
            .get("attributes")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let payload = match serde_json::to_vec(&attributes) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to serialize span attributes: {}", e);
                return;
            }
        };
        let size = payload.len();

        if size <= MAX_ATTRIBUTES_SIZE {
            tracing::debug!(
                "Attributes size ({} bytes) is within the limit, no need to store in GCS.",
                size
            );
            return;
        }

        tracing::info!(
            "Attributes size ({} bytes) exceeds 255 KiB, storing in GCS to avoid large log entry errors.",
            size
        );

        let replacement = match self.store_in_gcs(payload, span_id).await {
            Ok(uri) if uri != BUCKET_NOT_FOUND => serde_json::json!({
                "uri_payload": uri,
                "url_payload": format!(
                    "https://storage.mtls.cloud.google.com/{}/spans/{}.json",
                    self.bucket_name, span_id
                ),
            }),
            Ok(sentinel) => Self::unavailable(sentinel, size),
            Err(e) => {
                tracing::warn!(span_id = %span_id, "Failed to store span attributes in GCS: {}", e);
                Self::unavailable(e.to_string(), size)
            }
        };

        if let Some(map) = record.as_object_mut() {
            map.insert("attributes".to_string(), replacement);
        }
    }

    fn unavailable(reason: String, size: usize) -> Value {
        serde_json::json!({
            "payload_unavailable": reason,
            "payload_size_bytes": size,
        })
    }

    async fn log_record(&self, record: Value) {
        if self.debug {
            if let Err(e) = self.logger.write_struct(record.clone(), LogSeverity::Debug).await {
                tracing::warn!("Failed to write debug span record: {}", e);
            }
        }
        if let Err(e) = self.logger.write_struct(record, LogSeverity::Info).await {
            tracing::warn!("Failed to write span record to Cloud Logging: {}", e);
        }
    }
}

#[async_trait]
impl SpanExporter for CloudTraceLoggingSpanExporter {
    async fn export(&self, batch: Vec<SpanData>) -> ExportResult {
        for span in &batch {
            let span_id = span.span_id_hex();
            let mut record = span.to_record();

            if let Some(map) = record.as_object_mut() {
                map.insert(
                    "trace".to_string(),
                    Value::String(format!(
                        "projects/{}/traces/{}",
                        self.project_id,
                        span.trace_id_hex()
                    )),
                );
                map.insert("span_id".to_string(), Value::String(span_id.clone()));
            }

            self.process_large_attributes(&mut record, &span_id).await;
            self.log_record(record).await;
        }

        self.inner.export(batch).await
    }

    async fn shutdown(&self) {
        self.inner.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{InMemoryObjectStore, RecordingLogWriter, RecordingSpanExporter};

    fn exporter(store: Arc<InMemoryObjectStore>) -> CloudTraceLoggingSpanExporter {
        CloudTraceLoggingSpanExporter::new(
            "test-project",
            Arc::new(RecordingSpanExporter::default()),
            Arc::new(RecordingLogWriter::default()),
            store,
        )
        .with_bucket_name(Some("test-bucket".to_string()))
    }

    #[test]
    fn test_defaults() {
        let e = CloudTraceLoggingSpanExporter::new(
            "test-project",
            Arc::new(RecordingSpanExporter::default()),
            Arc::new(RecordingLogWriter::default()),
            Arc::new(InMemoryObjectStore::default()),
        );
        assert_eq!(e.bucket_name(), "test-project-ibis-crew-ai-logs-data");
        assert!(!e.debug());
        assert_eq!(e.with_bucket_name(None).bucket_name(), "test-project-ibis-crew-ai-logs-data");
    }

    #[tokio::test]
    async fn test_gs_prefixed_bucket_name_uploads_to_bare_bucket() {
        let store = Arc::new(InMemoryObjectStore::with_bucket("b"));
        let e = exporter(store.clone()).with_bucket_name(Some("gs://b".to_string()));
        assert_eq!(e.bucket_name(), "b");

        let mut record = serde_json::json!({"attributes": {"big": "a".repeat(300 * 1024)}});
        e.process_large_attributes(&mut record, "s1").await;

        assert_eq!(record["attributes"]["uri_payload"], "gs://b/spans/s1.json");
        assert!(record["attributes"].get("payload_unavailable").is_none());
        assert_eq!(store.object_count(), 1);
        assert_eq!(
            CloudTraceLoggingSpanExporter::new(
                "p",
                Arc::new(RecordingSpanExporter::default()),
                Arc::new(RecordingLogWriter::default()),
                store,
            )
            .with_bucket_name(Some("gs://".to_string()))
            .bucket_name(),
            "p-ibis-crew-ai-logs-data"
        );
    }

    #[tokio::test]
    async fn test_store_in_gcs_returns_uri() {
        let store = Arc::new(InMemoryObjectStore::with_bucket("test-bucket"));
        let uri = exporter(store.clone())
            .store_in_gcs(b"test-content".to_vec(), "test-span-id")
            .await
            .unwrap();
        assert_eq!(uri, "gs://test-bucket/spans/test-span-id.json");
        assert_eq!(
            store.object("test-bucket", "spans/test-span-id.json").unwrap().0,
            b"test-content".to_vec()
        );
    }

    #[tokio::test]
    async fn test_store_in_missing_bucket_returns_sentinel() {
        let store = Arc::new(InMemoryObjectStore::default());
        let uri = exporter(store.clone())
            .store_in_gcs(b"x".to_vec(), "abc")
            .await
            .unwrap();
        assert_eq!(uri, BUCKET_NOT_FOUND);
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_small_payload_unchanged() {
        let store = Arc::new(InMemoryObjectStore::with_bucket("test-bucket"));
        let mut record = serde_json::json!({"attributes": {"key": "value"}});
        let before = record.clone();

        exporter(store.clone()).process_large_attributes(&mut record, "span-id").await;

        assert_eq!(record, before);
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_payload_exactly_at_limit_stays_inline() {
        let store = Arc::new(InMemoryObjectStore::with_bucket("test-bucket"));
        // {"k":"…"} adds 8 bytes around the value
        let value = "a".repeat(MAX_ATTRIBUTES_SIZE - 8);
        let mut record = serde_json::json!({"attributes": {"k": value}});
        assert_eq!(serde_json::to_vec(&record["attributes"]).unwrap().len(), MAX_ATTRIBUTES_SIZE);

        exporter(store.clone()).process_large_attributes(&mut record, "s").await;
        assert!(record["attributes"].get("uri_payload").is_none());

        let mut over = serde_json::json!({"attributes": {"k": "a".repeat(MAX_ATTRIBUTES_SIZE - 7)}});
        exporter(store).process_large_attributes(&mut over, "s").await;
        assert!(over["attributes"].get("uri_payload").is_some());
    }

    #[tokio::test]
    async fn test_missing_bucket_marks_payload_unavailable() {
        let store = Arc::new(InMemoryObjectStore::default());
        let mut record = serde_json::json!({"attributes": {"big": "a".repeat(300 * 1024)}});

        exporter(store).process_large_attributes(&mut record, "s1").await;

        assert_eq!(record["attributes"]["payload_unavailable"], BUCKET_NOT_FOUND);
        assert!(record["attributes"].get("big").is_none());
        assert!(record["attributes"]["payload_size_bytes"].as_u64().unwrap() > 300 * 1024);
    }
}
