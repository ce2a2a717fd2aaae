pub mod auth;
pub mod types;
pub mod traits;
pub mod streaming;
pub mod config;
pub mod vertex;
pub mod mock;

pub use traits::{ChatClient, ChatRequest, ChatResponse, ChatOptions, TokenUsage};

pub use streaming::StreamEvent;
pub use auth::{AccessTokenProvider, StaticToken};
pub use config::VertexConfig;
pub use vertex::VertexClient;
pub use mock::{ScriptedChatClient, ScriptedTurn};
pub use types::{Message, Content, ContentPart, Tool, ToolCall, ToolChoice};
