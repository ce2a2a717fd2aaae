//! Local chat persistence: session files, sanitization, titles, and chat management.

pub mod chat;
pub mod error;
pub mod history;
pub mod models;
pub mod sessions;
pub mod templates;
pub mod title;

pub use chat::{clean_text, sanitize_messages, save_chat, SAVED_CHAT_DIR};
pub use error::{PersistError, Result};
pub use history::{LocalChatHistory, DEFAULT_BASE_DIR};
pub use models::{ChatSession, MessageType, StoredContent, StoredMessage, StoredPart, EMPTY_CHAT_NAME};
pub use sessions::{ChatSessions, NUM_CHAT_IN_RECENT};
pub use templates::{TITLE_PROMPT, TITLE_REQUEST};
pub use title::{title_generator_from_env, ModelTitleGenerator, StubTitleGenerator, TitleGenerator};
