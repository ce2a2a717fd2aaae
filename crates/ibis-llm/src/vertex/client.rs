// Vertex AI client over the OpenAI-compatible chat completions surface

use crate::auth::{AccessTokenProvider, StaticToken};
use crate::config::{qualified_model, VertexConfig};
use crate::streaming::parse_chat_sse_stream;
use crate::traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse, EventStream, TokenUsage};
use crate::types::{Content, ContentPart, Message, ToolCall};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Vertex AI chat client (HTTP direct, no SDK)
///
/// The bearer token is fetched from the provider on every request, so a
/// refreshing provider keeps a long-lived client authenticated.
pub struct VertexClient {
    http_client: reqwest::Client,
    base_url: String,
    token: Arc<dyn AccessTokenProvider>,
}

impl VertexClient {
    pub fn new(config: VertexConfig, token: Arc<dyn AccessTokenProvider>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.endpoint(),
            token,
        })
    }

    /// Project and location from the environment, token from `GOOGLE_OAUTH_ACCESS_TOKEN`
    pub fn from_env() -> Result<Self> {
        Self::new(VertexConfig::from_env()?, Arc::new(StaticToken::from_env()?))
    }

    /// Build chat completion request payload
    fn build_chat_request(
        &self,
        model: &str,
        messages: Vec<Message>,
        options: &ChatOptions,
        stream: bool,
    ) -> Result<Value> {
        let wire_messages: Vec<Value> = messages
            .into_iter()
            .map(convert_message)
            .collect::<Result<Vec<_>>>()?;

        let mut obj = Map::new();
        obj.insert("model".to_string(), Value::String(qualified_model(model)));
        obj.insert("messages".to_string(), Value::Array(wire_messages));
        obj.insert("stream".to_string(), Value::Bool(stream));

        if let Some(temp) = options.temperature {
            obj.insert("temperature".to_string(), serde_json::json!(temp));
        }
        if let Some(max_tokens) = options.max_tokens {
            obj.insert("max_tokens".to_string(), serde_json::json!(max_tokens));
        }
        if let Some(tools) = options.tools.as_ref().filter(|t| !t.is_empty()) {
            obj.insert("tools".to_string(), serde_json::to_value(tools)?);
            if let Some(tool_choice) = &options.tool_choice {
                obj.insert("tool_choice".to_string(), serde_json::to_value(tool_choice)?);
            }
        }

        Ok(Value::Object(obj))
    }

    async fn post_completions(&self, payload: &Value) -> Result<reqwest::Response> {
        tracing::debug!(model = %payload["model"], stream = %payload["stream"], "Sending chat completion request");
        let token = self.token.access_token().await.context("Failed to obtain access token")?;
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Chat completion request failed");
            anyhow::bail!("Vertex AI API error ({}): {}", status, error_text);
        }

        Ok(response)
    }
}

/// Convert our Message type to the chat-completions wire format
fn convert_message(message: Message) -> Result<Value> {
    let value = match message {
        Message::System { content, name } => with_name(
            serde_json::json!({ "role": "system", "content": convert_content(content) }),
            name,
        ),
        Message::Human { content, name } => with_name(
            serde_json::json!({ "role": "user", "content": convert_content(content) }),
            name,
        ),
        Message::AI { content, tool_calls, name } => {
            let mut map = Map::new();
            map.insert("role".to_string(), Value::String("assistant".to_string()));
            if let Some(content) = content {
                map.insert("content".to_string(), convert_content(content));
            }
            if let Some(tool_calls) = tool_calls {
                map.insert("tool_calls".to_string(), serde_json::to_value(tool_calls)?);
            }
            with_name(Value::Object(map), name)
        }
        Message::Tool { tool_call_id, content } => serde_json::json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": convert_content(content),
        }),
    };
    Ok(value)
}

fn with_name(mut value: Value, name: Option<String>) -> Value {
    if let (Some(name), Some(map)) = (name, value.as_object_mut()) {
        map.insert("name".to_string(), Value::String(name));
    }
    value
}

/// Text stays a string; parts become an array, file references are sent as image_url parts
fn convert_content(content: Content) -> Value {
    match content {
        Content::Text(s) => Value::String(s),
        Content::Parts(parts) => Value::Array(
            parts
                .into_iter()
                .map(|part| match part {
                    ContentPart::Text { text } => serde_json::json!({ "type": "text", "text": text }),
                    ContentPart::ImageUrl { image_url } => serde_json::json!({
                        "type": "image_url",
                        "image_url": { "url": image_url.url },
                    }),
                    ContentPart::Media { file_uri, .. } => serde_json::json!({
                        "type": "image_url",
                        "image_url": { "url": file_uri },
                    }),
                })
                .collect(),
        ),
    }
}

#[async_trait]
impl ChatClient for VertexClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_chat_request(&request.model, request.messages, &request.options, false)?;
        let response = self.post_completions(&payload).await?;

        let raw: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse response")?;

        let choice = raw.choices.into_iter().next();
        let (content, tool_calls, finish_reason) = match choice {
            Some(c) => (c.message.content, c.message.tool_calls, c.finish_reason),
            None => (None, None, None),
        };

        Ok(ChatResponse {
            content,
            tool_calls,
            usage: raw.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason,
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        let payload = self.build_chat_request(&request.model, request.messages, &request.options, true)?;
        let response = self.post_completions(&payload).await?;

        Ok(parse_chat_sse_stream(response))
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
