use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use ibis_llm::{ChatClient, ChatOptions, ChatRequest, Message, VertexClient};
use tracing::warn;

use crate::models::{MessageType, StoredMessage};
use crate::templates::TITLE_PROMPT;

pub const DEFAULT_TITLE_MODEL: &str = "gemini-2.0-flash-001";

/// Produces a short title for a conversation
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    async fn generate(&self, messages: &[StoredMessage]) -> Result<String>;
}

/// Asks a chat model, using the few-shot title prompt
pub struct ModelTitleGenerator {
    client: Arc<dyn ChatClient>,
    model: String,
}

impl ModelTitleGenerator {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self {
            client,
            model: DEFAULT_TITLE_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl TitleGenerator for ModelTitleGenerator {
    async fn generate(&self, messages: &[StoredMessage]) -> Result<String> {
        let mut prompt = vec![Message::system(TITLE_PROMPT)];
        prompt.extend(messages.iter().filter_map(|msg| {
            let text = msg.text()?;
            match msg.message_type {
                MessageType::Human => Some(Message::human(text)),
                MessageType::Ai => Some(Message::ai(text)),
                _ => None,
            }
        }));

        let request = ChatRequest::new(self.model.clone(), prompt)
            .with_options(ChatOptions::new().temperature(0.0));
        let response = self.client.chat(request).await?;

        Ok(response.content.unwrap_or_default())
    }
}

/// Fixed title used when no model is reachable
#[derive(Debug, Default, Clone, Copy)]
pub struct StubTitleGenerator;

#[async_trait]
impl TitleGenerator for StubTitleGenerator {
    async fn generate(&self, _messages: &[StoredMessage]) -> Result<String> {
        Ok("conversation".to_string())
    }
}

/// Model-backed generator when Vertex credentials are present, otherwise the stub
pub fn title_generator_from_env() -> Arc<dyn TitleGenerator> {
    let client = VertexClient::from_env();
    match client {
        Ok(client) => Arc::new(ModelTitleGenerator::new(Arc::new(client))),
        Err(e) => {
            warn!("Failed to initialize Vertex AI ({}). Using stub title generator instead.", e);
            Arc::new(StubTitleGenerator)
        }
    }
}
