//! Per-user, per-session chat files on local disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::chat::write_session_file;
use crate::error::{PersistError, Result};
use crate::models::{ChatSession, MessageType, StoredMessage};
use crate::templates::TITLE_REQUEST;
use crate::title::TitleGenerator;

pub const DEFAULT_BASE_DIR: &str = ".chat_history";
pub const DEFAULT_SESSION_ID: &str = "default";

/// Stores sessions at `{base_dir}/{user_id}/{session_id}.yaml`
#[derive(Debug, Clone)]
pub struct LocalChatHistory {
    user_id: String,
    session_id: String,
    user_dir: PathBuf,
    session_file: PathBuf,
}

impl LocalChatHistory {
    /// Creates the user directory if needed
    pub fn new(base_dir: impl AsRef<Path>, user_id: impl Into<String>, session_id: impl Into<String>) -> Result<Self> {
        let user_id = user_id.into();
        let session_id = session_id.into();
        let user_dir = base_dir.as_ref().join(&user_id);
        fs::create_dir_all(&user_dir)?;

        let session_file = session_path(&user_dir, &session_id);
        Ok(Self {
            user_id,
            session_id,
            user_dir,
            session_file,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn session_file(&self) -> &Path {
        &self.session_file
    }

    /// Point subsequent writes at another session
    pub fn get_session(&mut self, session_id: impl Into<String>) {
        self.session_id = session_id.into();
        self.session_file = session_path(&self.user_dir, &self.session_id);
    }

    /// Every session of the user keyed by file stem, oldest update first
    pub fn get_all_conversations(&self) -> Result<Vec<(String, ChatSession)>> {
        let mut conversations = Vec::new();

        for entry in fs::read_dir(&self.user_dir)? {
            let path = entry?.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(stem) = file_name.strip_suffix(".yaml") else {
                continue;
            };

            let session = read_session_file(&path, file_name)?;
            conversations.push((stem.to_string(), session));
        }

        conversations.sort_by(|(_, a), (_, b)| {
            a.update_time
                .as_deref()
                .unwrap_or("")
                .cmp(b.update_time.as_deref().unwrap_or(""))
        });
        debug!(user_id = %self.user_id, count = conversations.len(), "Loaded conversations");
        Ok(conversations)
    }

    /// Stamp `update_time` and write the current session file
    pub fn upsert_session(&self, session: &mut ChatSession) -> Result<()> {
        session.update_time = Some(now_iso());
        write_session_file(&self.session_file, session)
    }

    /// Generate and store a title for a non-empty session
    pub async fn set_title(&self, session: &mut ChatSession, generator: &dyn TitleGenerator) -> Result<()> {
        if session.messages.is_empty() {
            return Ok(());
        }

        let messages: Vec<StoredMessage> = session
            .messages
            .iter()
            .cloned()
            .chain(std::iter::once(StoredMessage::human(TITLE_REQUEST)))
            .filter(|msg| matches!(msg.message_type, MessageType::Human | MessageType::Ai) && msg.text().is_some())
            .collect();

        let title = generator
            .generate(&messages)
            .await
            .map_err(|e| PersistError::Internal(format!("title generation failed: {}", e)))?;

        session.title = title.trim().to_string();
        self.upsert_session(session)
    }

    /// Remove the current session file if present
    pub fn clear(&self) -> Result<()> {
        if self.session_file.exists() {
            fs::remove_file(&self.session_file)?;
        }
        Ok(())
    }
}

fn session_path(user_dir: &Path, session_id: &str) -> PathBuf {
    user_dir.join(format!("{}.yaml", session_id))
}

fn now_iso() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

fn read_session_file(path: &Path, file_name: &str) -> Result<ChatSession> {
    let raw: serde_yaml::Value = serde_yaml::from_str(&fs::read_to_string(path)?)?;

    let mut entry = match raw {
        serde_yaml::Value::Sequence(mut items) if items.len() == 1 => items.remove(0),
        _ => {
            return Err(PersistError::InvalidFormat {
                path: path.to_path_buf(),
                message: "file must contain a list with exactly one conversation \
                          (- title, messages: [{type, content}])"
                    .to_string(),
            })
        }
    };

    let Some(map) = entry.as_mapping_mut() else {
        return Err(PersistError::InvalidFormat {
            path: path.to_path_buf(),
            message: "conversation must be a mapping".to_string(),
        });
    };
    let title_key = serde_yaml::Value::String("title".to_string());
    if !map.contains_key(&title_key) {
        map.insert(title_key, serde_yaml::Value::String(file_name.to_string()));
    }

    Ok(serde_yaml::from_value(entry)?)
}
