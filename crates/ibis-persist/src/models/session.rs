use serde::{Deserialize, Serialize};

use super::StoredMessage;

/// Placeholder title for a session that has not been titled yet
pub const EMPTY_CHAT_NAME: &str = "Empty chat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub title: String,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
    /// ISO-8601 local time of the last upsert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl ChatSession {
    pub fn empty() -> Self {
        Self {
            title: EMPTY_CHAT_NAME.to_string(),
            messages: Vec::new(),
            update_time: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::empty()
    }
}
