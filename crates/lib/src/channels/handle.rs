//! Channel handle: the send side of a channel connector, as seen by the bot runtime.

use crate::channels::OutboundMessage;
use async_trait::async_trait;

/// Handle to a running channel (stop, send message).
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "telegram").
    fn id(&self) -> &str;
    /// Stop the channel connector.
    fn stop(&self);
    /// Send a message to a conversation (e.g. Telegram chat_id).
    async fn send_message(&self, conversation_id: &str, message: &OutboundMessage) -> Result<(), String>;
}
