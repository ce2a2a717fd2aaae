mod message;
mod session;

pub use message::{MessageType, StoredContent, StoredMessage, StoredPart};
pub use session::{ChatSession, EMPTY_CHAT_NAME};
