use crate::types::config::LLMConfig;
use ibis_llm::{Content, Message, ToolCall};
use ibis_observability::TracingContext;

#[derive(Debug, Clone)]
pub struct GraphState {
    pub conversation_id: String,
    pub run_id: String,
    pub messages: Vec<Message>,
    pub llm_config: LLMConfig,
    /// Bookkeeping for every tool execution of this run
    pub tool_runs: Vec<ToolRun>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolRun {
    pub tool_call_id: String,
    pub tool_name: String,
    pub is_error: bool,
    pub duration_ms: u64,
}

impl GraphState {
    pub fn from_input(input: GraphInput) -> Self {
        Self {
            conversation_id: input.conversation_id,
            run_id: input.run_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            messages: input.messages,
            llm_config: input.llm_config,
            tool_runs: Vec::new(),
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn has_pending_tool_calls(&self) -> bool {
        self.last_message()
            .map(|msg| !msg.tool_calls().is_empty())
            .unwrap_or(false)
    }

    pub fn get_pending_tool_calls(&self) -> Vec<ToolCall> {
        self.last_message()
            .map(|msg| msg.tool_calls().to_vec())
            .unwrap_or_default()
    }

    pub fn add_tool_result(&mut self, tool_call_id: String, result: String) {
        self.messages.push(Message::Tool {
            tool_call_id,
            content: Content::text(result),
        });
    }
}

/// Everything a run needs besides the graph itself
#[derive(Debug, Clone)]
pub struct GraphInput {
    pub conversation_id: String,
    /// Correlation id; generated when absent
    pub run_id: Option<String>,
    pub messages: Vec<Message>,
    pub llm_config: LLMConfig,
    /// Request-scoped association properties copied onto spans
    pub tracing: TracingContext,
}

impl GraphInput {
    pub fn new(
        conversation_id: impl Into<String>,
        messages: Vec<Message>,
        llm_config: LLMConfig,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            run_id: None,
            messages,
            llm_config,
            tracing: TracingContext::default(),
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_tracing(mut self, tracing: TracingContext) -> Self {
        self.tracing = tracing;
        self
    }
}
