//! The messaging side of the relay.

use async_trait::async_trait;

use crate::relay::message::{IncomingMessage, Media};

/// A messaging client that can fetch attachments and answer messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the attachment referenced by `msg`.
    ///
    /// `Ok(None)` means the transport has nothing to give (no attachment, or
    /// the file vanished). `Err` means the fetch itself failed.
    async fn download_media(&self, msg: &IncomingMessage) -> Result<Option<Media>, String>;

    /// Send `text` back to the chat `msg` came from, as a reply to it.
    async fn reply(&self, msg: &IncomingMessage, text: &str) -> Result<(), String>;
}
