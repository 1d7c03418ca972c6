//! Relay engine - records every message and answers the addressed ones.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::relay::classify::{self, MessageKind};
use crate::relay::history::ConversationStore;
use crate::relay::message::IncomingMessage;
use crate::relay::openai::Completer;
use crate::relay::prompt;
use crate::relay::transport::Transport;
use crate::relay::trigger::TriggerPolicy;
use crate::relay::whisper::Transcriber;

/// What happened to a handled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Recorded in history, no reply requested.
    Stored,
    /// Completed and handed to the transport.
    Replied(String),
    /// Completion failed. The user's turn stays recorded, nothing is sent.
    Dropped,
}

pub struct Relay {
    store: ConversationStore,
    trigger: TriggerPolicy,
    transport: Arc<dyn Transport>,
    transcriber: Arc<dyn Transcriber>,
    completer: Arc<dyn Completer>,
}

impl Relay {
    pub fn new(
        store: ConversationStore,
        trigger: TriggerPolicy,
        transport: Arc<dyn Transport>,
        transcriber: Arc<dyn Transcriber>,
        completer: Arc<dyn Completer>,
    ) -> Self {
        Self {
            store,
            trigger,
            transport,
            transcriber,
            completer,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Handle one incoming message.
    ///
    /// The sender's history stays locked from classification until the reply
    /// is sent, so messages from one user are handled strictly one at a time
    /// while other users proceed in parallel.
    pub async fn handle(&self, msg: &IncomingMessage) -> Outcome {
        info!(
            "📨 {} ({}): \"{}\"",
            msg.username,
            msg.sender_id,
            msg.preview()
        );

        let history = self.store.get_or_create(&msg.sender_id).await;
        let mut history = history.lock().await;

        let kind = MessageKind::of(msg);
        let payload =
            classify::resolve(msg, self.transport.as_ref(), self.transcriber.as_ref()).await;
        history.push(prompt::build(&payload));

        if !self.trigger.should_reply(kind, &msg.body) {
            debug!("💤 Not addressed, stored ({} turns)", history.turns().len());
            return Outcome::Stored;
        }

        info!("🤖 Completing {} turn(s) for {}", history.turns().len(), msg.sender_id);
        let reply = match self.completer.complete(history.turns()).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Completion failed for {}: {e}", msg.sender_id);
                return Outcome::Dropped;
            }
        };

        let preview: String = reply.chars().take(50).collect();
        info!("📤 Replying to {}: \"{}\"", msg.sender_id, preview);
        if let Err(e) = self.transport.reply(msg, &reply).await {
            warn!("Failed to deliver reply to {}: {e}", msg.sender_id);
        }

        Outcome::Replied(reply)
    }
}
