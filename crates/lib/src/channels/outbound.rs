//! Handle to a running channel connector (stop, send message).

use async_trait::async_trait;

/// Outbound side of a channel: lets the relay deliver replies and stop the
/// connector on shutdown.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "telegram").
    fn id(&self) -> &str;
    /// Stop the channel connector.
    fn stop(&self);
    /// Send a text message to a conversation (e.g. Telegram chat_id).
    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), String>;
}
