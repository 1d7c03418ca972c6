//! Media classification: decides what a message is and fetches what it carries.
//!
//! Nothing in here fails outward. Missing media, broken downloads and failed
//! transcriptions all degrade to a plain notice the model can read.

use tracing::{info, warn};

use crate::relay::message::{IncomingMessage, Media, MediaKind};
use crate::relay::transport::Transport;
use crate::relay::whisper::Transcriber;

pub const IMAGE_UNAVAILABLE: &str = "Sorry, I couldn't retrieve the image.";
pub const AUDIO_UNAVAILABLE: &str = "Sorry, I couldn't retrieve the audio.";
pub const TRANSCRIPTION_FAILED: &str = "Sorry, I couldn't transcribe the audio.";
pub const PROCESSING_FAILED: &str = "An error occurred while processing your message.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Plain,
    Image,
    Voice,
}

impl MessageKind {
    pub fn of(msg: &IncomingMessage) -> Self {
        match msg.media_kind() {
            Some(MediaKind::Image) => Self::Image,
            Some(MediaKind::Voice) => Self::Voice,
            Some(MediaKind::Other) | None => Self::Plain,
        }
    }
}

/// What ends up in the user's turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Plain(String),
    /// A fixed notice standing in for media that could not be used.
    Notice(&'static str),
    Image { media: Media, caption: String },
    Voice { transcription: String },
}

/// Classify `msg` and resolve its payload, downloading and transcribing as
/// needed.
pub async fn resolve(
    msg: &IncomingMessage,
    transport: &dyn Transport,
    transcriber: &dyn Transcriber,
) -> Payload {
    match try_resolve(msg, transport, transcriber).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Error processing media from {}: {e}", msg.sender_id);
            Payload::Notice(PROCESSING_FAILED)
        }
    }
}

async fn try_resolve(
    msg: &IncomingMessage,
    transport: &dyn Transport,
    transcriber: &dyn Transcriber,
) -> Result<Payload, String> {
    match MessageKind::of(msg) {
        MessageKind::Plain => Ok(Payload::Plain(msg.body.clone())),
        MessageKind::Image => {
            let Some(media) = fetch(msg, transport).await? else {
                return Ok(Payload::Notice(IMAGE_UNAVAILABLE));
            };
            info!("📷 Image from {} ({} bytes)", msg.sender_id, media.data.len());
            Ok(Payload::Image {
                media,
                caption: msg.body.clone(),
            })
        }
        MessageKind::Voice => {
            let Some(media) = fetch(msg, transport).await? else {
                return Ok(Payload::Notice(AUDIO_UNAVAILABLE));
            };
            info!("🎙️ Voice note from {} ({} bytes)", msg.sender_id, media.data.len());
            match transcriber.transcribe(&media).await {
                Some(transcription) => Ok(Payload::Voice { transcription }),
                None => Ok(Payload::Notice(TRANSCRIPTION_FAILED)),
            }
        }
    }
}

/// Download the attachment. A failed download counts as no attachment.
/// An empty download is the only processing error.
async fn fetch(msg: &IncomingMessage, transport: &dyn Transport) -> Result<Option<Media>, String> {
    let media = match transport.download_media(msg).await {
        Ok(media) => media,
        Err(e) => {
            warn!("Failed to download media from {}: {e}", msg.sender_id);
            None
        }
    };

    match media {
        Some(m) if m.data.is_empty() => Err("downloaded media is empty".to_string()),
        other => Ok(other),
    }
}
