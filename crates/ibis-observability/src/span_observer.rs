// Observer that turns graph lifecycle callbacks into spans

use crate::observer::Observer;
use crate::processor::BatchSpanProcessor;
use crate::span::{SpanData, SpanStatus};
use crate::types::{NodeObservation, NodeObservationData};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

const ASSOCIATION_PREFIX: &str = "association.properties.";

struct RunTrace {
    trace_id: u128,
    root_span_id: u64,
    conversation_id: String,
    started_at: DateTime<Utc>,
    properties: BTreeMap<String, Value>,
}

/// One trace per graph run: a root `agent.run` span with a child span per node execution
pub struct SpanObserver {
    processor: Arc<BatchSpanProcessor>,
    runs: Mutex<HashMap<String, RunTrace>>,
}

impl SpanObserver {
    pub fn new(processor: Arc<BatchSpanProcessor>) -> Self {
        Self {
            processor,
            runs: Mutex::new(HashMap::new()),
        }
    }

    fn with_run<T>(&self, run_id: &str, f: impl FnOnce(&RunTrace) -> T) -> Result<T> {
        let runs = self
            .runs
            .lock()
            .map_err(|_| anyhow::anyhow!("span observer lock poisoned"))?;
        let run = runs
            .get(run_id)
            .with_context(|| format!("No trace started for run {}", run_id))?;
        Ok(f(run))
    }

    fn base_span(run: &RunTrace, run_id: &str, span_id: u64, name: &str) -> SpanData {
        let mut span = SpanData::new(run.trace_id, span_id, name)
            .with_attribute("run_id", run_id)
            .with_attribute("conversation_id", run.conversation_id.clone());
        for (key, value) in &run.properties {
            span.attributes
                .insert(format!("{}{}", ASSOCIATION_PREFIX, key), value.clone());
        }
        span
    }

    fn node_span(&self, observation: NodeObservation) -> Result<SpanData> {
        let ended_at =
            observation.started_at + chrono::Duration::milliseconds(observation.duration_ms as i64);

        let span = self.with_run(&observation.run_id, |run| {
            Self::base_span(run, &observation.run_id, SpanData::new_span_id(), &observation.node_name)
                .with_parent(run.root_span_id)
        })?;

        let mut span = span
            .with_times(observation.started_at, ended_at)
            .with_attribute("graph.node", observation.node_name.clone())
            .with_attribute("graph.step", observation.step as u64)
            .with_status(SpanStatus::Ok);

        match observation.data {
            NodeObservationData::Llm {
                input_messages,
                output,
                model,
            } => {
                span = span
                    .with_attribute("llm.model", model)
                    .with_attribute("llm.input", serde_json::to_string(&input_messages)?)
                    .with_attribute("llm.output", serde_json::to_string(&output)?);
            }
            NodeObservationData::Tool {
                tool_calls,
                tool_results,
            } => {
                let failed: Vec<&str> = tool_results
                    .iter()
                    .filter(|r| r.is_error)
                    .map(|r| r.tool_name.as_str())
                    .collect();
                if !failed.is_empty() {
                    span = span.with_status(SpanStatus::Error {
                        description: format!("tool failed: {}", failed.join(", ")),
                    });
                }
                span = span
                    .with_attribute("tool.calls", serde_json::to_string(&tool_calls)?)
                    .with_attribute("tool.results", serde_json::to_string(&tool_results)?);
            }
        }

        Ok(span)
    }
}

#[async_trait]
impl Observer for SpanObserver {
    async fn trace_start(
        &self,
        run_id: String,
        conversation_id: String,
        properties: BTreeMap<String, Value>,
    ) -> Result<()> {
        let run = RunTrace {
            trace_id: SpanData::new_trace_id(),
            root_span_id: SpanData::new_span_id(),
            conversation_id,
            started_at: Utc::now(),
            properties,
        };
        self.runs
            .lock()
            .map_err(|_| anyhow::anyhow!("span observer lock poisoned"))?
            .insert(run_id, run);
        Ok(())
    }

    async fn trace_llm_node(&self, observation: NodeObservation) -> Result<()> {
        let span = self.node_span(observation)?;
        self.processor.on_end(span);
        Ok(())
    }

    async fn trace_tool_node(&self, observation: NodeObservation) -> Result<()> {
        let span = self.node_span(observation)?;
        self.processor.on_end(span);
        Ok(())
    }

    async fn trace_end(&self, run_id: String, status: String, total_duration_ms: u64) -> Result<()> {
        let run = self
            .runs
            .lock()
            .map_err(|_| anyhow::anyhow!("span observer lock poisoned"))?
            .remove(&run_id)
            .with_context(|| format!("No trace started for run {}", run_id))?;

        let span_status = if status == "success" {
            SpanStatus::Ok
        } else {
            SpanStatus::Error {
                description: status.clone(),
            }
        };
        let span = Self::base_span(&run, &run_id, run.root_span_id, "agent.run")
            .with_times(run.started_at, Utc::now())
            .with_attribute("run.status", status)
            .with_attribute("run.duration_ms", total_duration_ms)
            .with_status(span_status);

        self.processor.on_end(span);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingSpanExporter;
    use crate::processor::BatchConfig;
    use crate::types::{ObservedMessage, ToolCallInfo, ToolResultInfo};

    fn observer() -> (SpanObserver, Arc<BatchSpanProcessor>, Arc<RecordingSpanExporter>) {
        let exporter = Arc::new(RecordingSpanExporter::default());
        let processor = Arc::new(BatchSpanProcessor::new(exporter.clone(), BatchConfig::default()));
        (SpanObserver::new(processor.clone()), processor, exporter)
    }

    fn observation(data: NodeObservationData, node: &str, step: usize) -> NodeObservation {
        NodeObservation {
            run_id: "run-1".to_string(),
            conversation_id: "conv-1".to_string(),
            node_name: node.to_string(),
            step,
            started_at: Utc::now(),
            duration_ms: 12,
            data,
        }
    }

    #[tokio::test]
    async fn test_run_produces_root_and_child_spans() {
        let (observer, processor, exporter) = observer();
        let mut props = BTreeMap::new();
        props.insert("user_id".to_string(), Value::String("u-7".to_string()));

        observer.trace_start("run-1".into(), "conv-1".into(), props).await.unwrap();
        observer
            .trace_llm_node(observation(
                NodeObservationData::Llm {
                    input_messages: vec![ObservedMessage {
                        role: "user".into(),
                        content: "hi".into(),
                        tool_call_id: None,
                        tool_calls: None,
                    }],
                    output: vec![],
                    model: "gemini".into(),
                },
                "agent",
                1,
            ))
            .await
            .unwrap();
        observer
            .trace_tool_node(observation(
                NodeObservationData::Tool {
                    tool_calls: vec![ToolCallInfo {
                        id: "c1".into(),
                        name: "coding_tool".into(),
                        arguments: serde_json::json!({}),
                    }],
                    tool_results: vec![ToolResultInfo {
                        tool_call_id: "c1".into(),
                        tool_name: "coding_tool".into(),
                        result: "boom".into(),
                        is_error: true,
                        duration_ms: 3,
                    }],
                },
                "dev_crew",
                2,
            ))
            .await
            .unwrap();
        observer.trace_end("run-1".into(), "success".into(), 40).await.unwrap();
        processor.force_flush().await;

        let spans = exporter.spans();
        assert_eq!(spans.len(), 3);
        let root = &spans[2];
        assert_eq!(root.name, "agent.run");
        assert_eq!(root.status, SpanStatus::Ok);
        for child in &spans[..2] {
            assert_eq!(child.trace_id, root.trace_id);
            assert_eq!(child.parent_span_id, Some(root.span_id));
            assert_eq!(child.attributes["association.properties.user_id"], "u-7");
        }
        assert_eq!(spans[0].attributes["llm.model"], "gemini");
        assert!(matches!(spans[1].status, SpanStatus::Error { .. }));
    }

    #[tokio::test]
    async fn test_node_without_start_is_an_error() {
        let (observer, _processor, _exporter) = observer();
        let result = observer
            .trace_llm_node(observation(
                NodeObservationData::Llm {
                    input_messages: vec![],
                    output: vec![],
                    model: "m".into(),
                },
                "agent",
                1,
            ))
            .await;
        assert!(result.is_err());
    }
}
