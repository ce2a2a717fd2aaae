// Scripted chat client for tests and offline runs

use crate::streaming::StreamEvent;
use crate::traits::{ChatClient, ChatRequest, ChatResponse, EventStream};
use crate::types::ToolCall;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted model turn
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    Events(Vec<StreamEvent>),
    Fail(String),
}

impl ScriptedTurn {
    /// A plain text reply streamed as one chunk per word
    pub fn text(reply: &str) -> Self {
        let mut events: Vec<StreamEvent> = reply
            .split_inclusive(' ')
            .map(|word| StreamEvent::Message { content: word.to_string() })
            .collect();
        events.push(StreamEvent::Done { finish_reason: Some("stop".to_string()) });
        Self::Events(events)
    }

    /// A single complete tool call
    pub fn tool_call(id: &str, name: &str, arguments: &str) -> Self {
        Self::Events(vec![
            StreamEvent::ToolCall {
                index: 0,
                id: Some(id.to_string()),
                name: Some(name.to_string()),
                arguments: Some(arguments.to_string()),
            },
            StreamEvent::Done { finish_reason: Some("tool_calls".to_string()) },
        ])
    }
}

/// Replays queued turns in order and records every request it receives
#[derive(Default)]
pub struct ScriptedChatClient {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatClient {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, turn: ScriptedTurn) {
        if let Ok(mut turns) = self.turns.lock() {
            turns.push_back(turn);
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next_turn(&self, request: ChatRequest) -> Result<Vec<StreamEvent>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let turn = self
            .turns
            .lock()
            .map_err(|_| anyhow::anyhow!("scripted client lock poisoned"))?
            .pop_front();

        match turn {
            Some(ScriptedTurn::Events(events)) => Ok(events),
            Some(ScriptedTurn::Fail(message)) => Err(anyhow::anyhow!(message)),
            None => anyhow::bail!("no scripted turn left"),
        }
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let events = self.next_turn(request)?;

        let mut content = String::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        let mut finish_reason = None;

        for event in events {
            match event {
                StreamEvent::Message { content: chunk } => content.push_str(&chunk),
                StreamEvent::ToolCall { id, name, arguments, .. } => tool_calls.push(ToolCall::new(
                    id.unwrap_or_default(),
                    name.unwrap_or_default(),
                    arguments.unwrap_or_default(),
                )),
                StreamEvent::Done { finish_reason: reason } => finish_reason = reason,
            }
        }

        Ok(ChatResponse {
            content: (!content.is_empty()).then_some(content),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            usage: None,
            finish_reason,
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        let events = self.next_turn(request)?;
        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_turns_replay_in_order() {
        let client = ScriptedChatClient::new(vec![
            ScriptedTurn::tool_call("call_1", "coding_tool", "{}"),
            ScriptedTurn::text("all done"),
        ]);

        let first = client.chat(ChatRequest::new("m", vec![Message::human("hi")])).await.unwrap();
        assert_eq!(first.tool_calls.unwrap()[0].function.name, "coding_tool");

        let second: Vec<_> = client
            .chat_stream(ChatRequest::new("m", vec![]))
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(second.len(), 3);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_script_is_an_error() {
        let client = ScriptedChatClient::default();
        assert!(client.chat(ChatRequest::new("m", vec![])).await.is_err());
        assert_eq!(client.call_count(), 1);
    }
}
