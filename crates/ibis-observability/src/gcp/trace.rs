use super::auth::AccessTokenProvider;
use crate::exporter::{ExportResult, SpanExporter};
use crate::span::{SpanData, SpanStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

const TRACE_BASE_URL: &str = "https://cloudtrace.googleapis.com";

/// Cloud Trace truncates attribute strings beyond this many bytes
const MAX_ATTRIBUTE_VALUE_BYTES: usize = 256;

/// Cloud Trace v2 `batchWrite` exporter
pub struct CloudTraceExporter {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    token: Arc<dyn AccessTokenProvider>,
}

impl CloudTraceExporter {
    pub fn new(token: Arc<dyn AccessTokenProvider>, project_id: impl Into<String>) -> Result<Self> {
        Self::with_base_url(token, project_id, TRACE_BASE_URL)
    }

    pub fn with_base_url(
        token: Arc<dyn AccessTokenProvider>,
        project_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            http: super::http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            token,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn to_trace_span(&self, span: &SpanData) -> Value {
        let span_id = format!("{:016x}", span.span_id);
        let mut out = serde_json::json!({
            "name": format!(
                "projects/{}/traces/{:032x}/spans/{}",
                self.project_id, span.trace_id, span_id
            ),
            "spanId": span_id,
            "displayName": truncatable(&span.name),
            "startTime": span.start_time.to_rfc3339(),
            "endTime": span.end_time.to_rfc3339(),
            "attributes": { "attributeMap": attribute_map(&span.attributes) },
        });

        if let Some(map) = out.as_object_mut() {
            if let Some(parent) = span.parent_span_id {
                map.insert("parentSpanId".to_string(), Value::String(format!("{:016x}", parent)));
            }
            match &span.status {
                SpanStatus::Unset => {}
                SpanStatus::Ok => {
                    map.insert("status".to_string(), serde_json::json!({ "code": 0 }));
                }
                SpanStatus::Error { description } => {
                    map.insert(
                        "status".to_string(),
                        serde_json::json!({ "code": 2, "message": description }),
                    );
                }
            }
        }
        out
    }

    async fn batch_write(&self, spans: &[SpanData]) -> Result<()> {
        let body = serde_json::json!({
            "spans": spans.iter().map(|s| self.to_trace_span(s)).collect::<Vec<_>>(),
        });

        let response = self
            .http
            .post(format!(
                "{}/v2/projects/{}/traces:batchWrite",
                self.base_url, self.project_id
            ))
            .bearer_auth(self.token.access_token().await?)
            .json(&body)
            .send()
            .await
            .context("Failed to send batchWrite request")?;

        super::handle_response(response, "Cloud Trace").await?;
        Ok(())
    }
}

fn truncatable(value: &str) -> Value {
    let mut end = value.len().min(MAX_ATTRIBUTE_VALUE_BYTES);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    serde_json::json!({
        "value": &value[..end],
        "truncatedByteCount": value.len() - end,
    })
}

fn attribute_map(attributes: &Map<String, Value>) -> Map<String, Value> {
    attributes
        .iter()
        .map(|(key, value)| {
            let converted = match value {
                Value::Bool(b) => serde_json::json!({ "boolValue": b }),
                Value::Number(n) if n.is_i64() => serde_json::json!({ "intValue": n.to_string() }),
                Value::String(s) => serde_json::json!({ "stringValue": truncatable(s) }),
                other => serde_json::json!({ "stringValue": truncatable(&other.to_string()) }),
            };
            (key.clone(), converted)
        })
        .collect()
}

#[async_trait]
impl SpanExporter for CloudTraceExporter {
    async fn export(&self, batch: Vec<SpanData>) -> ExportResult {
        if batch.is_empty() {
            return ExportResult::Success;
        }
        match self.batch_write(&batch).await {
            Ok(()) => ExportResult::Success,
            Err(e) => {
                tracing::error!("Failed to export {} spans to Cloud Trace: {}", batch.len(), e);
                ExportResult::Failure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::StaticToken;
    use mockito::Matcher;

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let long = "é".repeat(200);
        let value = truncatable(&long);
        assert_eq!(value["value"].as_str().unwrap().len(), 256);
        assert_eq!(value["truncatedByteCount"], 144);
    }

    #[tokio::test]
    async fn test_batch_write_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/projects/p/traces:batchWrite")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "spans": [{
                    "name": "projects/p/traces/000000000000000000000000000000ab/spans/00000000000000cd",
                    "spanId": "00000000000000cd",
                    "parentSpanId": "0000000000000001",
                    "attributes": {"attributeMap": {
                        "graph.step": {"intValue": "2"},
                        "llm.model": {"stringValue": {"value": "gemini", "truncatedByteCount": 0}}
                    }}
                }]
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let exporter =
            CloudTraceExporter::with_base_url(Arc::new(StaticToken::new("t")), "p", server.url()).unwrap();
        let span = SpanData::new(0xab, 0xcd, "agent")
            .with_parent(1)
            .with_attribute("graph.step", 2)
            .with_attribute("llm.model", "gemini");

        assert_eq!(exporter.export(vec![span]).await, ExportResult::Success);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_backend_error_is_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v2/projects/p/traces:batchWrite")
            .with_status(503)
            .create_async()
            .await;

        let exporter =
            CloudTraceExporter::with_base_url(Arc::new(StaticToken::new("t")), "p", server.url()).unwrap();
        let result = exporter.export(vec![SpanData::new(1, 2, "agent")]).await;
        assert_eq!(result, ExportResult::Failure);
    }
}
