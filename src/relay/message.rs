//! Conversation turns and incoming transport messages.
//!
//! `Turn` and `ContentPart` serialize directly into the chat-completion wire
//! format, so a stored history can be posted as-is:
//!
//! ```json
//! {"role": "user", "content": [{"type": "text", "text": "hi\n"}]}
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Resolution hint for image parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Low,
    High,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// A `data:` URI carrying the base64 image bytes.
    pub url: String,
    pub detail: ImageDetail,
}

/// A typed fragment of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    #[serde(rename = "image_url")]
    Image {
        image_url: ImageUrl,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Image { .. } => None,
        }
    }
}

/// One role-tagged entry of a conversation. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl Turn {
    pub fn user(content: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentPart::text(text)],
        }
    }
}

/// What kind of attachment a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    /// Push-to-talk voice note.
    Voice,
    /// Documents, videos, stickers, audio files. Never fetched.
    Other,
}

/// Transport-side handle to an attachment, resolved lazily by
/// [`Transport::download_media`](super::transport::Transport::download_media).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub file_id: String,
    pub mime_type: Option<String>,
}

/// Downloaded attachment bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Read-only view of a message delivered by the transport.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub chat_id: i64,
    /// Conversation key. One history per sender.
    pub sender_id: String,
    pub username: String,
    /// Message text, or the media caption. Empty when neither exists.
    pub body: String,
    pub media: Option<MediaRef>,
}

impl IncomingMessage {
    pub fn has_media(&self) -> bool {
        self.media.is_some()
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        self.media.as_ref().map(|m| m.kind)
    }

    /// Short body preview for logs.
    pub fn preview(&self) -> String {
        self.body.chars().take(50).collect()
    }
}
