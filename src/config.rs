use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use teloxide::types::ChatId;

use crate::relay::history::DEFAULT_PERSONA;
use crate::relay::trigger::DEFAULT_WAKE_WORDS;
use crate::relay::{openai, whisper};

/// Environment variable holding the OpenAI API key. Takes precedence over the file.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable holding the Telegram bot token. Takes precedence over the file.
pub const TELEGRAM_BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    telegram_bot_token: String,
    /// Prefer the OPENAI_API_KEY environment variable over this field.
    #[serde(default)]
    openai_api_key: String,
    /// Base URL for both OpenAI endpoints.
    api_base: Option<String>,
    completion_model: Option<String>,
    transcription_model: Option<String>,
    /// Words that make the bot answer a text message.
    wake_words: Option<Vec<String>>,
    /// Replaces the default persona turn.
    persona: Option<String>,
    /// Chats the bot talks to. Empty means everyone.
    #[serde(default)]
    allowed_chats: Vec<i64>,
    /// Directory for logs. Defaults to current directory.
    data_dir: Option<String>,
}

pub struct Config {
    pub telegram_bot_token: String,
    pub openai_api_key: String,
    pub api_base: String,
    pub completion_model: String,
    pub transcription_model: String,
    pub wake_words: Vec<String>,
    pub persona: String,
    pub allowed_chats: HashSet<ChatId>,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_bot_token", &"[REDACTED]")
            .field("openai_api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("completion_model", &self.completion_model)
            .field("transcription_model", &self.transcription_model)
            .field("wake_words", &self.wake_words)
            .field("allowed_chats", &self.allowed_chats)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl Config {
    /// Load from a JSON file, with secrets overridable from the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], but a missing file falls back to the
    /// environment alone.
    pub fn load_or_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Self::resolve(ConfigFile::default(), |key| std::env::var(key).ok())
        }
    }

    fn load_with_env<P, E>(path: P, env: E) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        E: Fn(&str) -> Option<String>,
    {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;
        Self::resolve(file, env)
    }

    fn resolve<E>(file: ConfigFile, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let telegram_bot_token = non_empty(TELEGRAM_BOT_TOKEN_ENV).unwrap_or(file.telegram_bot_token);
        let openai_api_key = non_empty(OPENAI_API_KEY_ENV).unwrap_or(file.openai_api_key);

        // Validate required fields
        if telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation(format!(
                "telegram_bot_token is required (or set {TELEGRAM_BOT_TOKEN_ENV})"
            )));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if openai_api_key.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "openai_api_key is required (set {OPENAI_API_KEY_ENV})"
            )));
        }

        let wake_words = match file.wake_words {
            Some(words) => {
                let words: Vec<String> = words
                    .into_iter()
                    .map(|w| w.trim().to_string())
                    .filter(|w| !w.is_empty())
                    .collect();
                if words.is_empty() {
                    return Err(ConfigError::Validation("wake_words must not be empty".into()));
                }
                words
            }
            None => DEFAULT_WAKE_WORDS.iter().map(|w| w.to_string()).collect(),
        };

        let api_base = file
            .api_base
            .unwrap_or_else(|| openai::DEFAULT_API_BASE.to_string());
        if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "api_base must be an http(s) URL, got '{api_base}'"
            )));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token,
            openai_api_key,
            api_base,
            completion_model: file
                .completion_model
                .unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
            transcription_model: file
                .transcription_model
                .unwrap_or_else(|| whisper::DEFAULT_MODEL.to_string()),
            wake_words,
            persona: file.persona.unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
            allowed_chats: file.allowed_chats.into_iter().map(ChatId).collect(),
            data_dir,
        })
    }

    pub fn is_allowed(&self, chat_id: ChatId) -> bool {
        self.allowed_chats.is_empty() || self.allowed_chats.contains(&chat_id)
    }
}
