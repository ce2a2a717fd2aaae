use crate::node::{EventSender, Node, NodeType};
use crate::tools::ToolRegistry;
use crate::types::{GraphState, StreamEvent, ToolRun};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

pub struct ToolNode {
    tools: Arc<ToolRegistry>,
}

impl ToolNode {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Node for ToolNode {
    async fn execute(&self, state: &mut GraphState, event_tx: EventSender) -> Result<()> {
        let tool_calls = state.get_pending_tool_calls();

        if tool_calls.is_empty() {
            return Ok(());
        }

        for tool_call in tool_calls {
            let start = Instant::now();
            let tool_name = tool_call.function.name.clone();

            let outcome = match tool_call.arguments_value() {
                Ok(args) => self.tools.execute(&tool_name, args).await,
                Err(e) => Err(anyhow::anyhow!("Invalid tool arguments: {}", e)),
            };

            // Failures are reported back to the model as the tool's result
            let (result, is_error) = match outcome {
                Ok(result) => (result, false),
                Err(e) => {
                    tracing::warn!(tool = %tool_name, error = %e, "Tool execution failed");
                    (format!("Tool execution failed: {}", e), true)
                }
            };

            let duration_ms = start.elapsed().as_millis() as u64;

            event_tx
                .send(StreamEvent::ToolResult {
                    tool_call_id: tool_call.id.clone(),
                    tool_name: tool_name.clone(),
                    result: result.clone(),
                    is_error,
                    duration_ms,
                })
                .await?;

            state.tool_runs.push(ToolRun {
                tool_call_id: tool_call.id.clone(),
                tool_name,
                is_error,
                duration_ms,
            });
            state.add_tool_result(tool_call.id, result);
        }

        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::Tool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::MockToolExecutor;
    use crate::types::{GraphInput, LLMConfig};
    use ibis_llm::{Message, ToolCall};
    use tokio::sync::mpsc;

    fn state_requesting(call: ToolCall) -> GraphState {
        GraphState::from_input(GraphInput::new(
            "conv",
            vec![Message::ai_with_tools(vec![call])],
            LLMConfig::new("m"),
        ))
    }

    #[tokio::test]
    async fn test_tool_result_appended() {
        let mock = Arc::new(MockToolExecutor::replying("coding_tool", "def f(): pass"));
        let node = ToolNode::new(Arc::new(ToolRegistry::new().register(mock.clone())));
        let mut state = state_requesting(ToolCall::new(
            "call_1",
            "coding_tool",
            r#"{"code_instructions":"stub"}"#,
        ));

        let (tx, mut rx) = mpsc::channel(4);
        node.execute(&mut state, tx).await.unwrap();

        assert_eq!(mock.calls()[0]["code_instructions"], "stub");
        match state.last_message() {
            Some(Message::Tool { tool_call_id, content }) => {
                assert_eq!(tool_call_id, "call_1");
                assert_eq!(content.as_text(), Some("def f(): pass"));
            }
            other => panic!("Expected tool message, got {:?}", other),
        }
        assert!(matches!(
            rx.recv().await,
            Some(StreamEvent::ToolResult { is_error: false, .. })
        ));
    }

    #[tokio::test]
    async fn test_tool_failure_becomes_error_result() {
        let node = ToolNode::new(Arc::new(
            ToolRegistry::new().register(Arc::new(MockToolExecutor::failing("coding_tool", "crew crashed"))),
        ));
        let mut state = state_requesting(ToolCall::new("call_1", "coding_tool", "{}"));

        let (tx, mut rx) = mpsc::channel(4);
        node.execute(&mut state, tx).await.unwrap();

        let text = state.last_message().and_then(|m| m.content()).map(|c| c.text_lossy());
        assert_eq!(text.as_deref(), Some("Tool execution failed: crew crashed"));
        assert!(state.tool_runs[0].is_error);
        assert!(matches!(
            rx.recv().await,
            Some(StreamEvent::ToolResult { is_error: true, .. })
        ));
    }
}
