use serde::{Deserialize, Serialize};

/// Events emitted by a graph run, in production order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Graph execution started
    InitStream {
        run_id: String,
        conversation_id: String,
        timestamp: i64,
    },

    /// A node is about to run; `step` counts node executions from 1
    NodeStart {
        node: String,
        step: usize,
    },

    /// Response text from the model (streamed token-by-token)
    Message {
        content: String,
    },

    /// Model decided to call a tool (streamed incrementally)
    ToolCall {
        index: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<String>,
    },

    /// Tool execution completed
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: String,
        is_error: bool,
        duration_ms: u64,
    },

    /// Model streaming completed
    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },

    /// Fatal error, the run stops after this event
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
    },

    /// Graph execution completed
    EndStream {
        status: String,
        total_duration_ms: u64,
    },
}

impl From<ibis_llm::StreamEvent> for StreamEvent {
    fn from(event: ibis_llm::StreamEvent) -> Self {
        match event {
            ibis_llm::StreamEvent::Message { content } => Self::Message { content },
            ibis_llm::StreamEvent::ToolCall {
                index,
                id,
                name,
                arguments,
            } => Self::ToolCall {
                index,
                id,
                name,
                arguments,
            },
            ibis_llm::StreamEvent::Done { finish_reason } => Self::Done { finish_reason },
        }
    }
}
