//! Alfred - a Telegram bot that keeps a conversation per chat and answers,
//! through OpenAI, the messages that call it by name and every voice note.

pub mod config;
pub mod relay;
