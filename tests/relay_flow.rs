//! End-to-end tests: relay wired to the real Whisper and completion clients,
//! talking to a mock OpenAI server, with an in-memory transport.

use std::sync::{Arc, Mutex};

use alfred::relay::classify::TRANSCRIPTION_FAILED;
use alfred::relay::history::DEFAULT_PERSONA;
use alfred::relay::message::{Media, MediaKind, MediaRef};
use alfred::relay::openai;
use alfred::relay::transport::Transport;
use alfred::relay::{ConversationStore, IncomingMessage, Outcome, Relay, TriggerPolicy, WhisperClient};
use async_trait::async_trait;
use mockito::Matcher;
use serde_json::json;

#[derive(Default)]
struct MemoryTransport {
    replies: Mutex<Vec<String>>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn download_media(&self, msg: &IncomingMessage) -> Result<Option<Media>, String> {
        Ok(msg.media.as_ref().map(|_| Media {
            mime_type: "audio/ogg".to_string(),
            data: b"OggS voice".to_vec(),
        }))
    }

    async fn reply(&self, _msg: &IncomingMessage, text: &str) -> Result<(), String> {
        self.replies.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn relay(base: &str, transport: Arc<MemoryTransport>) -> Relay {
    Relay::new(
        ConversationStore::default(),
        TriggerPolicy::default(),
        transport,
        Arc::new(WhisperClient::new(
            "test-key".to_string(),
            base.to_string(),
            "whisper-1".to_string(),
        )),
        Arc::new(openai::Client::new(
            "test-key".to_string(),
            base.to_string(),
            "gpt-4o".to_string(),
        )),
    )
}

fn message(id: i64, body: &str, voice: bool) -> IncomingMessage {
    IncomingMessage {
        message_id: id,
        chat_id: 555,
        sender_id: "555".to_string(),
        username: "dana".to_string(),
        body: body.to_string(),
        media: voice.then(|| MediaRef {
            kind: MediaKind::Voice,
            file_id: "voice-1".to_string(),
            mime_type: Some("audio/ogg".to_string()),
        }),
    }
}

fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

#[tokio::test]
async fn test_text_conversation_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": [{"type": "text", "text": DEFAULT_PERSONA}]},
                {"role": "user", "content": [{"type": "text", "text": "hi\n"}]},
                {"role": "user", "content": [{"type": "text", "text": "alfred, how are you\n"}]}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion("Doing great! 🎩"))
        .expect(1)
        .create_async()
        .await;

    let transport = Arc::new(MemoryTransport::default());
    let relay = relay(&server.url(), transport.clone());

    assert_eq!(relay.handle(&message(1, "hi", false)).await, Outcome::Stored);
    assert_eq!(
        relay.handle(&message(2, "alfred, how are you", false)).await,
        Outcome::Replied("Doing great! 🎩".to_string())
    );

    mock.assert_async().await;
    assert_eq!(*transport.replies.lock().unwrap(), vec!["Doing great! 🎩"]);
}

#[tokio::test]
async fn test_voice_note_is_transcribed_then_answered() {
    let mut server = mockito::Server::new_async().await;
    let whisper = server
        .mock("POST", "/audio/transcriptions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"text": "remind me to buy milk"}"#)
        .expect(1)
        .create_async()
        .await;
    let chat = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({
            "messages": [
                {"role": "system"},
                {"role": "user", "content": [{"type": "text", "text": "remind me to buy milk"}]}
            ]
        })))
        .with_status(200)
        .with_body(completion("Noted 🥛"))
        .create_async()
        .await;

    let transport = Arc::new(MemoryTransport::default());
    let relay = relay(&server.url(), transport.clone());

    let outcome = relay.handle(&message(1, "", true)).await;

    assert_eq!(outcome, Outcome::Replied("Noted 🥛".to_string()));
    whisper.assert_async().await;
    chat.assert_async().await;
}

#[tokio::test]
async fn test_transcription_outage_still_answers_with_notice() {
    let mut server = mockito::Server::new_async().await;
    let _whisper = server
        .mock("POST", "/audio/transcriptions")
        .with_status(503)
        .create_async()
        .await;
    let chat = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({
            "messages": [
                {"role": "system"},
                {"role": "user", "content": [{"type": "text", "text": TRANSCRIPTION_FAILED}]}
            ]
        })))
        .with_status(200)
        .with_body(completion("Sorry, I didn't catch that."))
        .create_async()
        .await;

    let transport = Arc::new(MemoryTransport::default());
    let relay = relay(&server.url(), transport.clone());

    let outcome = relay.handle(&message(1, "", true)).await;

    assert!(matches!(outcome, Outcome::Replied(_)));
    chat.assert_async().await;
}

#[tokio::test]
async fn test_completion_outage_drops_reply() {
    let mut server = mockito::Server::new_async().await;
    let _chat = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let transport = Arc::new(MemoryTransport::default());
    let relay = relay(&server.url(), transport.clone());

    assert_eq!(relay.handle(&message(1, "alfred?", false)).await, Outcome::Dropped);
    assert!(transport.replies.lock().unwrap().is_empty());

    let history = relay.store().get_or_create("555").await;
    assert_eq!(history.lock().await.turns().len(), 2);
}
