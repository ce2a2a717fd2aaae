//! Saving and sanitizing chat sessions.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{PersistError, Result};
use crate::models::{ChatSession, StoredContent, StoredMessage};

pub const SAVED_CHAT_DIR: &str = ".saved_chats";

/// Strip a single leading and a single trailing newline
pub fn clean_text(text: &str) -> String {
    let text = text.strip_prefix('\n').unwrap_or(text);
    text.strip_suffix('\n').unwrap_or(text).to_string()
}

/// Clean every text content and text part in place
pub fn sanitize_messages(messages: &mut [StoredMessage]) {
    for message in messages.iter_mut() {
        match &mut message.content {
            StoredContent::Text(text) => *text = clean_text(text),
            StoredContent::Parts(parts) => {
                for part in parts.iter_mut().filter(|p| p.part_type == "text") {
                    if let Some(text) = part.text.as_mut() {
                        *text = clean_text(text);
                    }
                }
            }
        }
    }
}

/// Write `{dir}/{session_id}.yaml` when the session has messages.
///
/// Returns the written path, or `None` for an empty session.
pub fn save_chat(dir: impl AsRef<Path>, session_id: &str, session: &mut ChatSession) -> Result<Option<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    if session.messages.is_empty() {
        return Ok(None);
    }

    sanitize_messages(&mut session.messages);
    let path = dir.join(format!("{}.yaml", session_id));
    write_session_file(&path, session)?;

    info!("Chat saved to path: {}", path.display());
    Ok(Some(path))
}

/// Chat files hold a single-element list; a message with blank content is rejected
pub(crate) fn write_session_file(path: &Path, session: &ChatSession) -> Result<()> {
    if let Some(index) = session.messages.iter().position(StoredMessage::is_blank) {
        return Err(PersistError::InvalidFormat {
            path: path.to_path_buf(),
            message: format!(
                "message {} ({:?}) has empty content",
                index, session.messages[index].message_type
            ),
        });
    }

    let yaml = serde_yaml::to_string(&[session])?;
    fs::write(path, yaml)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageType, StoredPart};

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("\nhello\n"), "hello");
        assert_eq!(clean_text("\n\nhello\n\n"), "\nhello\n");
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("no newlines"), "no newlines");
    }

    #[test]
    fn test_blank_message_detection() {
        assert!(StoredMessage::human("\n").is_blank());
        assert!(StoredMessage::ai("").is_blank());
        assert!(StoredMessage::new(MessageType::Human, vec![StoredPart::text(" \n ")]).is_blank());
        assert!(!StoredMessage::human("\nhi\n").is_blank());

        let mut image = StoredPart::text("");
        image.part_type = "image_url".to_string();
        image.text = None;
        assert!(!StoredMessage::new(MessageType::Human, vec![image]).is_blank());
    }

    #[test]
    fn test_sanitize_cleans_text_parts_only() {
        let mut image = StoredPart::text("\nkeep\n");
        image.part_type = "image_url".to_string();

        let mut messages = vec![
            StoredMessage::human("\nquestion\n"),
            StoredMessage::new(MessageType::Human, vec![StoredPart::text("\npart\n"), image]),
        ];
        sanitize_messages(&mut messages);

        assert_eq!(messages[0].text(), Some("question"));
        match &messages[1].content {
            StoredContent::Parts(parts) => {
                assert_eq!(parts[0].text.as_deref(), Some("part"));
                assert_eq!(parts[1].text.as_deref(), Some("\nkeep\n"));
            }
            other => panic!("Expected parts, got {:?}", other),
        }
    }
}
