//! Chat management: new, delete, switch, recent/other split.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::chat::save_chat;
use crate::error::{PersistError, Result};
use crate::history::LocalChatHistory;
use crate::models::ChatSession;

pub const NUM_CHAT_IN_RECENT: usize = 3;

/// Sessions of one user in insertion order, plus the active one
pub struct ChatSessions {
    history: LocalChatHistory,
    chats: Vec<(String, ChatSession)>,
    current_id: String,
    run_id: Option<String>,
}

impl ChatSessions {
    /// Load stored conversations and open a fresh empty chat
    pub fn load(mut history: LocalChatHistory) -> Result<Self> {
        let mut chats = history.get_all_conversations()?;
        let current_id = Uuid::new_v4().to_string();
        history.get_session(current_id.clone());
        chats.push((current_id.clone(), ChatSession::empty()));

        Ok(Self {
            history,
            chats,
            current_id,
            run_id: None,
        })
    }

    pub fn history(&self) -> &LocalChatHistory {
        &self.history
    }

    pub fn current_id(&self) -> &str {
        &self.current_id
    }

    pub fn current(&self) -> Option<&ChatSession> {
        self.get(&self.current_id)
    }

    pub fn current_mut(&mut self) -> Option<&mut ChatSession> {
        let id = self.current_id.clone();
        self.chats.iter_mut().find(|(k, _)| *k == id).map(|(_, s)| s)
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.chats.iter().find(|(k, _)| k == id).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn set_run_id(&mut self, run_id: impl Into<String>) {
        self.run_id = Some(run_id.into());
    }

    /// Start a new chat unless the current one is still empty.
    ///
    /// Returns whether a chat was created.
    pub fn new_chat(&mut self) -> bool {
        if self.current().map_or(true, ChatSession::is_empty) {
            return false;
        }
        self.run_id = None;
        self.open_empty_chat();
        true
    }

    /// Delete the current chat and its file, then move to the oldest remaining one
    pub fn delete_chat(&mut self) -> Result<()> {
        self.run_id = None;
        self.history.clear()?;
        self.chats.retain(|(k, _)| *k != self.current_id);

        match self.chats.first().map(|(k, _)| k.clone()) {
            Some(id) => {
                self.current_id = id.clone();
                self.history.get_session(id);
            }
            None => self.open_empty_chat(),
        }
        Ok(())
    }

    pub fn switch_chat(&mut self, chat_id: &str) -> Result<()> {
        if self.get(chat_id).is_none() {
            return Err(PersistError::SessionNotFound(chat_id.to_string()));
        }
        self.run_id = None;
        self.current_id = chat_id.to_string();
        self.history.get_session(chat_id);
        Ok(())
    }

    /// Newest chats first, at most `NUM_CHAT_IN_RECENT`
    pub fn recent_chats(&self) -> Vec<(&str, &ChatSession)> {
        self.newest_first().take(NUM_CHAT_IN_RECENT).collect()
    }

    pub fn other_chats(&self) -> Vec<(&str, &ChatSession)> {
        self.newest_first().skip(NUM_CHAT_IN_RECENT).collect()
    }

    /// Persist the current chat through the history store
    pub fn upsert_current(&mut self) -> Result<()> {
        let id = &self.current_id;
        let (_, session) = self
            .chats
            .iter_mut()
            .find(|(k, _)| k == id)
            .ok_or_else(|| PersistError::SessionNotFound(id.clone()))?;
        self.history.upsert_session(session)
    }

    /// Export the current chat under `dir`
    pub fn save_current(&mut self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let id = self.current_id.clone();
        let session = self
            .current_mut()
            .ok_or_else(|| PersistError::SessionNotFound(id.clone()))?;
        save_chat(dir, &id, session)
    }

    fn newest_first(&self) -> impl Iterator<Item = (&str, &ChatSession)> {
        self.chats.iter().rev().map(|(k, s)| (k.as_str(), s))
    }

    fn open_empty_chat(&mut self) {
        let id = Uuid::new_v4().to_string();
        self.history.get_session(id.clone());
        self.chats.push((id.clone(), ChatSession::empty()));
        self.current_id = id;
    }
}
