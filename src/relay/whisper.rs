//! Speech-to-text transcription through the OpenAI Whisper API.
//!
//! Voice notes are staged in a temporary file of their own, uploaded as a
//! multipart form, and the file is removed once the call returns.

use std::io::Write;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::relay::message::Media;

/// Default Whisper model.
pub const DEFAULT_MODEL: &str = "whisper-1";

/// Anything that turns audio into text.
///
/// Failures of any sort come back as `None`.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Media) -> Option<String>;
}

/// Whisper API client.
pub struct WhisperClient {
    api_key: String,
    api_base: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperClient {
    pub fn new(api_key: String, api_base: String, model: String) -> Self {
        Self {
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            http: reqwest::Client::new(),
        }
    }

    async fn request(&self, audio: &Media) -> Result<String, String> {
        let staged = stage(audio)?;
        let file_name = staged
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("voice.ogg")
            .to_string();

        let bytes = tokio::fs::read(staged.path())
            .await
            .map_err(|e| format!("Failed to read staged audio: {e}"))?;

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&audio.mime_type)
            .map_err(|e| format!("Invalid audio mime type: {e}"))?;

        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let response = self
            .http
            .post(format!("{}/audio/transcriptions", self.api_base))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("HTTP error: {e}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {e}"))?;

        debug!("Whisper response status: {status}");

        if !status.is_success() {
            return Err(format!("API error {status}: {body}"));
        }

        let parsed: TranscriptionResponse =
            serde_json::from_str(&body).map_err(|e| format!("Failed to parse response: {e}"))?;

        Ok(parsed.text)
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio: &Media) -> Option<String> {
        debug!("Transcribing {} bytes of {}", audio.data.len(), audio.mime_type);

        match self.request(audio).await {
            Ok(text) => {
                info!("🎙️ Transcribed: \"{}\"", truncate(&text, 100));
                Some(text)
            }
            Err(e) => {
                warn!("Transcription failed: {e}");
                None
            }
        }
    }
}

/// Write the audio to a uniquely named temp file.
///
/// The file lives as long as the returned handle.
fn stage(audio: &Media) -> Result<NamedTempFile, String> {
    let suffix = format!(".{}", extension(&audio.mime_type));
    let mut file = tempfile::Builder::new()
        .prefix("alfred-voice-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| format!("Failed to create temp file: {e}"))?;

    file.write_all(&audio.data)
        .and_then(|()| file.flush())
        .map_err(|e| format!("Failed to write temp file: {e}"))?;

    Ok(file)
}

/// File extension Whisper uses to sniff the container format.
fn extension(mime_type: &str) -> &'static str {
    let essence = mime_type.split(';').next().unwrap_or("").trim();
    match essence {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/webm" => "webm",
        "audio/flac" => "flac",
        _ => "ogg",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice_note() -> Media {
        Media {
            mime_type: "audio/ogg".to_string(),
            data: b"OggS fake opus".to_vec(),
        }
    }

    fn client(base: &str) -> WhisperClient {
        WhisperClient::new("test-key".to_string(), base.to_string(), DEFAULT_MODEL.to_string())
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hello...");
        assert_eq!(truncate("ééé", 2), "éé...");
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("audio/ogg"), "ogg");
        assert_eq!(extension("audio/ogg; codecs=opus"), "ogg");
        assert_eq!(extension("audio/mpeg"), "mp3");
        assert_eq!(extension("audio/wav"), "wav");
        assert_eq!(extension("application/octet-stream"), "ogg");
    }

    #[test]
    fn test_staged_file_is_unique_and_removed_on_drop() {
        let first = stage(&voice_note()).unwrap();
        let second = stage(&voice_note()).unwrap();
        assert_ne!(first.path(), second.path());

        let path = first.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), voice_note().data);
        assert!(path.to_string_lossy().ends_with(".ogg"));

        drop(first);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_transcribe_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/audio/transcriptions")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::Regex("whisper-1".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text": "hello alfred"}"#)
            .create_async()
            .await;

        let text = client(&server.url()).transcribe(&voice_note()).await;

        assert_eq!(text.as_deref(), Some("hello alfred"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transcribe_api_error_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/audio/transcriptions")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        assert_eq!(client(&server.url()).transcribe(&voice_note()).await, None);
    }

    #[tokio::test]
    async fn test_transcribe_malformed_body_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/audio/transcriptions")
            .with_status(200)
            .with_body(r#"{"nope": true}"#)
            .create_async()
            .await;

        assert_eq!(client(&server.url()).transcribe(&voice_note()).await, None);
    }

    #[tokio::test]
    async fn test_transcribe_unreachable_is_none() {
        assert_eq!(client("http://127.0.0.1:1").transcribe(&voice_note()).await, None);
    }
}
