// Finished span model shared by the processor and exporters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status_code", rename_all = "UPPERCASE")]
pub enum SpanStatus {
    Unset,
    Ok,
    Error { description: String },
}

/// A completed span, ready for export
#[derive(Debug, Clone, PartialEq)]
pub struct SpanData {
    pub trace_id: u128,
    pub span_id: u64,
    pub parent_span_id: Option<u64>,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attributes: Map<String, Value>,
    pub status: SpanStatus,
}

impl SpanData {
    pub fn new(trace_id: u128, span_id: u64, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            trace_id,
            span_id,
            parent_span_id: None,
            name: name.into(),
            start_time: now,
            end_time: now,
            attributes: Map::new(),
            status: SpanStatus::Unset,
        }
    }

    /// Random non-zero trace id
    pub fn new_trace_id() -> u128 {
        loop {
            let id = uuid::Uuid::new_v4().as_u128();
            if id != 0 {
                return id;
            }
        }
    }

    /// Random non-zero span id
    pub fn new_span_id() -> u64 {
        loop {
            let id = (uuid::Uuid::new_v4().as_u128() >> 64) as u64;
            if id != 0 {
                return id;
            }
        }
    }

    pub fn with_parent(mut self, parent_span_id: u64) -> Self {
        self.parent_span_id = Some(parent_span_id);
        self
    }

    pub fn with_times(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_status(mut self, status: SpanStatus) -> Self {
        self.status = status;
        self
    }

    /// Lower-case hex without padding
    pub fn trace_id_hex(&self) -> String {
        format!("{:x}", self.trace_id)
    }

    /// Lower-case hex without padding
    pub fn span_id_hex(&self) -> String {
        format!("{:x}", self.span_id)
    }

    /// JSON view of the span, shaped like the OpenTelemetry SDK's span dump
    pub fn to_record(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "context": {
                "trace_id": format!("0x{:032x}", self.trace_id),
                "span_id": format!("0x{:016x}", self.span_id),
                "trace_state": "[]",
            },
            "kind": "SpanKind.INTERNAL",
            "parent_id": self.parent_span_id.map(|id| format!("0x{:016x}", id)),
            "start_time": self.start_time.to_rfc3339(),
            "end_time": self.end_time.to_rfc3339(),
            "status": self.status,
            "attributes": self.attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_ids_are_unpadded() {
        let span = SpanData::new(0x7b, 0x1c8, "agent");
        assert_eq!(span.trace_id_hex(), "7b");
        assert_eq!(span.span_id_hex(), "1c8");
    }

    #[test]
    fn test_record_shape() {
        let span = SpanData::new(1, 2, "agent")
            .with_parent(3)
            .with_attribute("llm.model", "gemini");
        let record = span.to_record();
        assert_eq!(record["name"], "agent");
        assert_eq!(record["context"]["span_id"], "0x0000000000000002");
        assert_eq!(record["parent_id"], "0x0000000000000003");
        assert_eq!(record["attributes"]["llm.model"], "gemini");
        assert_eq!(record["status"]["status_code"], "UNSET");
    }

    #[test]
    fn test_generated_ids_non_zero() {
        assert_ne!(SpanData::new_trace_id(), 0);
        assert_ne!(SpanData::new_span_id(), 0);
    }
}
