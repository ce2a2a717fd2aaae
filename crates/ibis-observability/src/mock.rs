// In-memory doubles for the exporter's collaborators

use crate::exporter::{ExportResult, SpanExporter};
use crate::gcp::{LogSeverity, LogWriter, ObjectStore};
use crate::span::SpanData;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Object store backed by a map; only buckets created up front exist
#[derive(Default)]
pub struct InMemoryObjectStore {
    buckets: Mutex<HashSet<String>>,
    objects: Mutex<HashMap<(String, String), (Vec<u8>, String)>>,
    fail_uploads: bool,
}

impl InMemoryObjectStore {
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::default();
        if let Ok(mut buckets) = store.buckets.lock() {
            buckets.insert(bucket.to_string());
        }
        store
    }

    /// Every upload fails, the bucket still exists
    pub fn failing_uploads(bucket: &str) -> Self {
        let mut store = Self::with_bucket(bucket);
        store.fail_uploads = true;
        store
    }

    /// Stored bytes and content type
    pub fn object(&self, bucket: &str, name: &str) -> Option<(Vec<u8>, String)> {
        self.objects
            .lock()
            .ok()?
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self
            .buckets
            .lock()
            .map(|b| b.contains(bucket))
            .unwrap_or(false))
    }

    async fn upload(&self, bucket: &str, object: &str, content: Vec<u8>, content_type: &str) -> Result<()> {
        if self.fail_uploads {
            anyhow::bail!("upload rejected");
        }
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(
                (bucket.to_string(), object.to_string()),
                (content, content_type.to_string()),
            );
        }
        Ok(())
    }
}

/// Log writer that keeps every entry
#[derive(Default)]
pub struct RecordingLogWriter {
    entries: Mutex<Vec<(Value, LogSeverity)>>,
    fail: bool,
}

impl RecordingLogWriter {
    /// Rejects every write
    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn entries(&self) -> Vec<(Value, LogSeverity)> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn entries_with(&self, severity: LogSeverity) -> Vec<Value> {
        self.entries()
            .into_iter()
            .filter(|(_, s)| *s == severity)
            .map(|(v, _)| v)
            .collect()
    }
}

#[async_trait]
impl LogWriter for RecordingLogWriter {
    async fn write_struct(&self, payload: Value, severity: LogSeverity) -> Result<()> {
        if self.fail {
            anyhow::bail!("logging backend unavailable");
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((payload, severity));
        }
        Ok(())
    }
}

/// Span exporter that records batches and returns a fixed result
pub struct RecordingSpanExporter {
    batches: Mutex<Vec<Vec<SpanData>>>,
    result: ExportResult,
}

impl Default for RecordingSpanExporter {
    fn default() -> Self {
        Self::returning(ExportResult::Success)
    }
}

impl RecordingSpanExporter {
    pub fn returning(result: ExportResult) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            result,
        }
    }

    pub fn batches(&self) -> Vec<Vec<SpanData>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn spans(&self) -> Vec<SpanData> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl SpanExporter for RecordingSpanExporter {
    async fn export(&self, batch: Vec<SpanData>) -> ExportResult {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(batch);
        }
        self.result
    }
}
