use ibis_llm::{Message, ToolCall};
use serde::{Deserialize, Serialize};

/// Observation data captured during node execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeObservation {
    /// Run identifier for the overall graph execution
    pub run_id: String,

    /// Conversation/thread identifier
    pub conversation_id: String,

    /// Graph node name: "agent" or "dev_crew"
    pub node_name: String,

    /// 1-based position of this node execution in the run
    pub step: usize,

    /// Timestamp when node execution started
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// Duration of node execution in milliseconds
    pub duration_ms: u64,

    /// Input/output data specific to node type
    pub data: NodeObservationData,
}

/// Node-specific observation data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeObservationData {
    /// Model call: full prompt history and the produced message(s)
    Llm {
        input_messages: Vec<ObservedMessage>,
        output: Vec<ObservedMessage>,
        model: String,
    },

    /// Tool execution: requested calls and their results
    Tool {
        tool_calls: Vec<ToolCallInfo>,
        tool_results: Vec<ToolResultInfo>,
    },
}

/// Flattened chat message as recorded on spans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedMessage {
    /// "system", "user", "assistant" or "tool"
    pub role: String,

    pub content: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallInfo>>,
}

impl From<&Message> for ObservedMessage {
    fn from(msg: &Message) -> Self {
        let content = msg.content().map(|c| c.text_lossy()).unwrap_or_default();
        let tool_calls = match msg.tool_calls() {
            [] => None,
            calls => Some(calls.iter().map(ToolCallInfo::from).collect()),
        };
        let tool_call_id = match msg {
            Message::Tool { tool_call_id, .. } => Some(tool_call_id.clone()),
            _ => None,
        };

        Self {
            role: msg.role().to_string(),
            content,
            tool_call_id,
            tool_calls,
        }
    }
}

/// Tool call information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallInfo {
    pub id: String,
    pub name: String,
    /// Tool arguments as JSON
    pub arguments: serde_json::Value,
}

impl From<&ToolCall> for ToolCallInfo {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: call
                .arguments_value()
                .unwrap_or_else(|_| serde_json::Value::String(call.function.arguments.clone())),
        }
    }
}

/// Tool execution result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultInfo {
    pub tool_call_id: String,
    pub tool_name: String,
    pub result: String,
    pub is_error: bool,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_message_from_tool_request() {
        let msg = Message::ai_with_tools(vec![ToolCall::new("c1", "coding_tool", r#"{"a":1}"#)]);
        let observed = ObservedMessage::from(&msg);
        assert_eq!(observed.role, "assistant");
        assert_eq!(observed.content, "");
        assert_eq!(observed.tool_calls.unwrap()[0].arguments["a"], 1);
    }

    #[test]
    fn test_unparseable_arguments_kept_as_string() {
        let info = ToolCallInfo::from(&ToolCall::new("c1", "t", "{oops"));
        assert_eq!(info.arguments, serde_json::json!("{oops"));
    }
}
