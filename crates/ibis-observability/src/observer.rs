use async_trait::async_trait;
use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use crate::types::NodeObservation;

/// Core trait for observability backends
///
/// The graph awaits each callback in order, so implementations should
/// hand work off (e.g. to a span queue) and return quickly.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Initialize a new trace for a graph execution run
    ///
    /// `properties` are the request's association properties (user, session, commit).
    async fn trace_start(
        &self,
        run_id: String,
        conversation_id: String,
        properties: BTreeMap<String, Value>,
    ) -> Result<()>;

    /// Record an LLM node execution
    async fn trace_llm_node(
        &self,
        observation: NodeObservation,
    ) -> Result<()>;

    /// Record a tool node execution
    async fn trace_tool_node(
        &self,
        observation: NodeObservation,
    ) -> Result<()>;

    /// Finalize the trace after graph execution completes
    ///
    /// `status` is "success", "error" or "max_iterations".
    async fn trace_end(
        &self,
        run_id: String,
        status: String,
        total_duration_ms: u64,
    ) -> Result<()>;
}
