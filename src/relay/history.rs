//! Per-user conversation histories.
//!
//! Each history sits behind its own lock. Whoever holds it owns that user's
//! conversation until the guard drops, so a handler can append, complete and
//! reply without another message from the same user slipping in between.
//! Histories live for the lifetime of the process and are never trimmed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::relay::message::Turn;

/// Persona seeded as the first turn of every conversation.
pub const DEFAULT_PERSONA: &str = "You will act as Alfred from now on, he is a friendly short-answer assistant, he uses emojis and writes easy-to-read text. He also responds to friendly questions such as hi how are you etc.\n";

/// Ordered, append-only turns of one conversation.
#[derive(Debug, Clone)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    fn seeded(persona: Turn) -> Self {
        Self {
            turns: vec![persona],
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }
}

pub type SharedHistory = Arc<Mutex<History>>;

/// Maps user identifiers to their histories.
pub struct ConversationStore {
    persona: Turn,
    histories: Mutex<HashMap<String, SharedHistory>>,
}

impl ConversationStore {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: Turn::system(persona),
            histories: Mutex::new(HashMap::new()),
        }
    }

    /// The history for `user_id`, created with the persona turn on first
    /// contact. Repeated calls hand out the same history.
    pub async fn get_or_create(&self, user_id: &str) -> SharedHistory {
        let mut histories = self.histories.lock().await;
        if let Some(history) = histories.get(user_id) {
            return history.clone();
        }

        info!("🆕 New conversation with {}", user_id);
        let history = Arc::new(Mutex::new(History::seeded(self.persona.clone())));
        histories.insert(user_id.to_string(), history.clone());
        history
    }

    /// Append `turn` to the end of `user_id`'s history.
    pub async fn append(&self, user_id: &str, turn: Turn) {
        let history = self.get_or_create(user_id).await;
        history.lock().await.push(turn);
    }

    #[cfg(test)]
    async fn user_count(&self) -> usize {
        self.histories.lock().await.len()
    }

    pub fn persona(&self) -> &Turn {
        &self.persona
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}
