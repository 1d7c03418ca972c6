//! Decides when a recorded message gets an answer.

use crate::relay::classify::MessageKind;

/// The assistant's name and the spellings people actually type.
pub const DEFAULT_WAKE_WORDS: &[&str] = &["alfred", "álfred", "alfrede", "álfrede"];

/// Voice notes always get a reply; text only when it names the assistant.
#[derive(Debug, Clone)]
pub struct TriggerPolicy {
    wake_words: Vec<String>,
}

impl TriggerPolicy {
    pub fn new<I, S>(wake_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            wake_words: wake_words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn should_reply(&self, kind: MessageKind, body: &str) -> bool {
        if kind == MessageKind::Voice {
            return true;
        }
        let body = body.to_lowercase();
        self.wake_words.iter().any(|w| body.contains(w.as_str()))
    }
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_WAKE_WORDS)
    }
}
