//! Relay module - records Telegram messages per chat and answers through OpenAI.

pub mod classify;
pub mod engine;
pub mod history;
pub mod message;
pub mod openai;
pub mod prompt;
pub mod telegram;
pub mod transport;
pub mod trigger;
pub mod whisper;


pub use engine::{Outcome, Relay};
pub use history::ConversationStore;
pub use message::IncomingMessage;
pub use telegram::TelegramClient;
pub use trigger::TriggerPolicy;
pub use whisper::WhisperClient;
