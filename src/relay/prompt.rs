//! Builds user turns from classified messages.

use base64::Engine;

use crate::relay::classify::Payload;
use crate::relay::message::{ContentPart, ImageDetail, ImageUrl, Media, Turn};

/// Build the user turn for a resolved payload.
pub fn build(payload: &Payload) -> Turn {
    match payload {
        Payload::Plain(text) => plain(text),
        Payload::Notice(text) => notice(text),
        Payload::Image { media, caption } => image(media, caption),
        Payload::Voice { transcription } => voice(transcription),
    }
}

/// A single text part holding the message body.
pub fn plain(text: &str) -> Turn {
    Turn::user(vec![ContentPart::text(format!("{text}\n"))])
}

/// A single text part holding the notice exactly, with no trailing newline.
pub fn notice(text: &str) -> Turn {
    Turn::user(vec![ContentPart::text(text)])
}

/// The image first, then its caption (possibly empty).
pub fn image(media: &Media, caption: &str) -> Turn {
    Turn::user(vec![
        ContentPart::Image {
            image_url: ImageUrl {
                url: data_uri(media),
                detail: ImageDetail::High,
            },
        },
        ContentPart::text(format!("{caption}\n")),
    ])
}

/// The transcription only. The voice note's own caption is not reused.
pub fn voice(transcription: &str) -> Turn {
    Turn::user(vec![ContentPart::text(transcription)])
}

fn data_uri(media: &Media) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(&media.data);
    format!("data:{};base64,{}", media.mime_type, encoded)
}
