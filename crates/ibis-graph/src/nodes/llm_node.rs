use crate::node::{EventSender, Node, NodeType};
use crate::prompt::SYSTEM_PROMPT;
use crate::tools::ToolRegistry;
use crate::types::GraphState;
use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use ibis_llm::traits::EventStream;
use ibis_llm::{ChatClient, ChatOptions, ChatRequest, Content, Message, ToolCall, ToolChoice};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct LLMNode {
    client: Arc<dyn ChatClient>,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
}

impl LLMNode {
    pub fn new(client: Arc<dyn ChatClient>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            client,
            tools,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Full history prefixed with the system instruction, tools bound with `auto`
    fn build_request(&self, state: &GraphState) -> ChatRequest {
        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(Message::system(self.system_prompt.as_str()));
        messages.extend(state.messages.iter().cloned());

        let mut options = ChatOptions::new();
        if !self.tools.is_empty() {
            options = options
                .tools(self.tools.llm_tools())
                .tool_choice(ToolChoice::auto());
        }
        if let Some(temp) = state.llm_config.temperature {
            options = options.temperature(temp);
        }
        if let Some(max_tokens) = state.llm_config.max_tokens {
            options = options.max_tokens(max_tokens);
        }

        ChatRequest::new(state.llm_config.model.clone(), messages).with_options(options)
    }

    /// Forward every chunk to the client and assemble the final assistant message
    async fn process_stream(&self, mut stream: EventStream, event_tx: EventSender) -> Result<Message> {
        let mut message_content = String::new();
        let mut tool_call_buffers: BTreeMap<u32, (Option<String>, Option<String>, String)> =
            BTreeMap::new();

        while let Some(event_result) = stream.next().await {
            let llm_event = event_result?;

            match &llm_event {
                ibis_llm::StreamEvent::Message { content } => {
                    message_content.push_str(content);
                }
                ibis_llm::StreamEvent::ToolCall { index, id, name, arguments } => {
                    let entry = tool_call_buffers
                        .entry(*index)
                        .or_insert((None, None, String::new()));
                    if let Some(id) = id {
                        entry.0 = Some(id.clone());
                    }
                    if let Some(name) = name {
                        entry.1 = Some(name.clone());
                    }
                    if let Some(args) = arguments {
                        entry.2.push_str(args);
                    }
                }
                ibis_llm::StreamEvent::Done { .. } => {}
            }

            event_tx.send(llm_event.into()).await?;
        }

        let tool_calls: Vec<ToolCall> = tool_call_buffers
            .into_values()
            .filter_map(|(id, name, arguments)| match (id, name) {
                (Some(id), Some(name)) => Some(ToolCall::new(id, name, arguments)),
                _ => {
                    tracing::warn!("Dropping incomplete tool call from model stream");
                    None
                }
            })
            .collect();

        Ok(Message::AI {
            content: (!message_content.is_empty()).then(|| Content::Text(message_content)),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            name: None,
        })
    }
}

#[async_trait]
impl Node for LLMNode {
    async fn execute(&self, state: &mut GraphState, event_tx: EventSender) -> Result<()> {
        let request = self.build_request(state);
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Calling model"
        );

        let stream = self.client.chat_stream(request).await?;
        let message = self.process_stream(stream, event_tx).await?;
        state.add_message(message);

        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::LLM
    }
}
