use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A conversation turn as written to a chat file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: StoredContent,
    /// Fields we carry through untouched (ids, tool calls, names)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Human,
    Ai,
    Tool,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredContent {
    Text(String),
    Parts(Vec<StoredPart>),
}

/// One typed part of a multimodal message (text, image_url, media)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl StoredMessage {
    pub fn new(message_type: MessageType, content: impl Into<StoredContent>) -> Self {
        Self {
            message_type,
            content: content.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn human(text: impl Into<String>) -> Self {
        Self::new(MessageType::Human, text.into())
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(MessageType::Ai, text.into())
    }

    /// Text is blank when only whitespace remains; parts when every part is blank text
    pub fn is_blank(&self) -> bool {
        match &self.content {
            StoredContent::Text(s) => s.trim().is_empty(),
            StoredContent::Parts(parts) => parts
                .iter()
                .all(|p| p.part_type == "text" && p.text.as_deref().map_or(true, |t| t.trim().is_empty())),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            StoredContent::Text(s) => Some(s),
            StoredContent::Parts(_) => None,
        }
    }
}

impl From<String> for StoredContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for StoredContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<StoredPart>> for StoredContent {
    fn from(parts: Vec<StoredPart>) -> Self {
        Self::Parts(parts)
    }
}

impl StoredPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            part_type: "text".to_string(),
            text: Some(text.into()),
            extra: BTreeMap::new(),
        }
    }
}
