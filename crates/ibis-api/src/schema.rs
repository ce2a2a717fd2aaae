//! Wire types for the HTTP surface.

use std::collections::HashMap;

use ibis_llm::{Content, ContentPart, Message, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// One conversation message, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatMessage {
    Human {
        content: MessageContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    Ai {
        content: MessageContent,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<WireToolCall>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    Tool {
        content: MessageContent,
        tool_call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ImageUrl { image_url: ImageUrlRef },
    Media { file_uri: String, mime_type: String },
}

/// Either a bare URL or `{url}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ImageUrlRef {
    Url(String),
    Object { url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WireToolCall {
    pub name: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InputChat {
    /// The chat messages representing the current conversation
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StreamRequest {
    pub input: InputChat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RunConfig>,
}

/// Caller-supplied run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RunConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Map<String, Value>>,
    /// Other keys (tags, callbacks, ...) kept as given
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: HashMap<String, Value>,
}

/// Run configuration with a guaranteed id and metadata map
#[derive(Debug, Clone, PartialEq)]
pub struct ValidConfig {
    pub run_id: String,
    pub metadata: Map<String, Value>,
    pub extra: HashMap<String, Value>,
}

/// Fill in a fresh `run_id` and an empty metadata map where missing
pub fn ensure_valid_config(config: Option<RunConfig>) -> ValidConfig {
    let config = config.unwrap_or_default();
    let run_id = config
        .run_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    ValidConfig {
        run_id,
        metadata: config.metadata.unwrap_or_default(),
        extra: config.extra,
    }
}

impl From<ValidConfig> for RunConfig {
    fn from(config: ValidConfig) -> Self {
        Self {
            run_id: Some(config.run_id),
            metadata: Some(config.metadata),
            extra: config.extra,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Feedback {
    /// Integer or float, logged as given
    #[schema(value_type = f64)]
    pub score: serde_json::Number,
    #[serde(default)]
    pub text: Option<String>,
    pub run_id: String,
    #[serde(default = "feedback_log_type")]
    pub log_type: String,
    #[serde(default = "feedback_service_name")]
    pub service_name: String,
}

pub const SERVICE_NAME: &str = "ibis-crew-ai";

fn feedback_log_type() -> String {
    "feedback".to_string()
}

fn feedback_service_name() -> String {
    SERVICE_NAME.to_string()
}

impl Feedback {
    /// Record as written to the log: free text defaults to "" and the type tags are fixed
    pub fn into_record(self) -> Value {
        serde_json::json!({
            "score": self.score,
            "text": self.text.unwrap_or_default(),
            "run_id": self.run_id,
            "log_type": feedback_log_type(),
            "service_name": SERVICE_NAME,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

impl From<MessageContent> for Content {
    fn from(content: MessageContent) -> Self {
        match content {
            MessageContent::Text(text) => Content::Text(text),
            MessageContent::Parts(parts) => Content::Parts(parts.into_iter().map(ContentPart::from).collect()),
        }
    }
}

impl From<ContentBlock> for ContentPart {
    fn from(block: ContentBlock) -> Self {
        match block {
            ContentBlock::Text { text } => ContentPart::Text { text },
            ContentBlock::ImageUrl { image_url } => {
                let url = match image_url {
                    ImageUrlRef::Url(url) | ImageUrlRef::Object { url } => url,
                };
                ContentPart::ImageUrl {
                    image_url: ibis_llm::types::ImageUrl { url },
                }
            }
            ContentBlock::Media { file_uri, mime_type } => ContentPart::Media { file_uri, mime_type },
        }
    }
}

impl From<ChatMessage> for Message {
    fn from(message: ChatMessage) -> Self {
        match message {
            ChatMessage::Human { content, .. } => Message::human(Content::from(content)),
            ChatMessage::Ai { content, tool_calls, .. } => {
                let content = Content::from(content);
                let tool_calls: Vec<ToolCall> = tool_calls
                    .into_iter()
                    .enumerate()
                    .map(|(i, call)| {
                        let id = call.id.unwrap_or_else(|| format!("call_{}", i));
                        ToolCall::new(id, call.name, call.args.to_string())
                    })
                    .collect();
                Message::AI {
                    content: (!content.is_empty()).then_some(content),
                    tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                    name: None,
                }
            }
            ChatMessage::Tool { content, tool_call_id, .. } => {
                Message::tool_result(tool_call_id, Content::from(content))
            }
        }
    }
}
