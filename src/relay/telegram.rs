//! Telegram transport using teloxide.

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, MessageId, ReplyParameters};
use tracing::{info, warn};

use crate::relay::message::{IncomingMessage, Media, MediaKind, MediaRef};
use crate::relay::transport::Transport;

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn download_media(&self, msg: &IncomingMessage) -> Result<Option<Media>, String> {
        let Some(ref media) = msg.media else {
            return Ok(None);
        };

        let file = self
            .bot
            .get_file(FileId(media.file_id.clone()))
            .await
            .map_err(|e| format!("Failed to get file info: {e}"))?;

        let mut data = Vec::new();
        self.bot
            .download_file(&file.path, &mut data)
            .await
            .map_err(|e| format!("Failed to download file: {e}"))?;

        let mime_type = media
            .mime_type
            .clone()
            .unwrap_or_else(|| guess_mime_type(&file.path, media.kind).to_string());

        info!("📥 Downloaded media ({} bytes, {})", data.len(), mime_type);
        Ok(Some(Media { mime_type, data }))
    }

    async fn reply(&self, msg: &IncomingMessage, text: &str) -> Result<(), String> {
        self.bot
            .send_message(ChatId(msg.chat_id), text)
            .reply_parameters(ReplyParameters::new(MessageId(msg.message_id as i32)))
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to send: {e}");
                warn!("{}", msg);
                msg
            })
    }
}

/// Convert a Telegram message into the relay's view of it.
///
/// Returns `None` for updates with neither text, caption nor attachment
/// (joins, pins and other service messages).
pub fn to_incoming(msg: &Message) -> Option<IncomingMessage> {
    let body = msg.text().or_else(|| msg.caption()).unwrap_or("").to_string();
    let media = media_ref(msg);

    if body.is_empty() && media.is_none() {
        return None;
    }

    let username = msg
        .from
        .as_ref()
        .map(|u| u.username.clone().unwrap_or_else(|| u.first_name.clone()))
        .unwrap_or_else(|| "unknown".to_string());

    Some(IncomingMessage {
        message_id: msg.id.0 as i64,
        chat_id: msg.chat.id.0,
        sender_id: msg.chat.id.0.to_string(),
        username,
        body,
        media,
    })
}

fn media_ref(msg: &Message) -> Option<MediaRef> {
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        // Sizes are ordered smallest first.
        return Some(MediaRef {
            kind: MediaKind::Image,
            file_id: photo.file.id.0.clone(),
            mime_type: None,
        });
    }

    if let Some(voice) = msg.voice() {
        return Some(MediaRef {
            kind: MediaKind::Voice,
            file_id: voice.file.id.0.clone(),
            mime_type: voice.mime_type.as_ref().map(|m| m.to_string()),
        });
    }

    let other = msg
        .document()
        .map(|d| &d.file)
        .or_else(|| msg.audio().map(|a| &a.file))
        .or_else(|| msg.video().map(|v| &v.file))
        .or_else(|| msg.video_note().map(|v| &v.file))
        .or_else(|| msg.animation().map(|a| &a.file))
        .or_else(|| msg.sticker().map(|s| &s.file));

    other.map(|file| MediaRef {
        kind: MediaKind::Other,
        file_id: file.id.0.clone(),
        mime_type: None,
    })
}

/// Media type from the Telegram file path, for files that don't declare one.
fn guess_mime_type(file_path: &str, kind: MediaKind) -> &'static str {
    let lower = file_path.to_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".oga") || lower.ends_with(".ogg") {
        "audio/ogg"
    } else if lower.ends_with(".mp3") {
        "audio/mpeg"
    } else {
        match kind {
            MediaKind::Voice => "audio/ogg",
            // Default for Telegram photos
            MediaKind::Image | MediaKind::Other => "image/jpeg",
        }
    }
}
