//! Event handling and the send boundary.

use crate::channels::{ChannelHandle, InboundEvent, InboundKind, OutboundMessage};
use crate::commands::BotCommand;
use crate::config::BotSettings;
use crate::dispatch;
use std::sync::Arc;

/// Context threaded into every handler: resolved settings, no ambient state.
#[derive(Debug, Clone)]
pub struct BotContext {
    pub settings: Arc<BotSettings>,
}

impl BotContext {
    pub fn new(settings: BotSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    /// Reply for an event. Text that is not a known command gets no reply; app data always does.
    pub fn reply_for(&self, event: &InboundEvent) -> Option<OutboundMessage> {
        match &event.kind {
            InboundKind::Text(text) => {
                BotCommand::parse(text).map(|cmd| cmd.reply(&self.settings.webapp_url))
            }
            InboundKind::AppData(data) => Some(dispatch::render(data)),
        }
    }
}

/// Send a message; if a message with markup is rejected, retry once as plain text.
/// Returns whether the message (or its plain rendition) was delivered.
pub async fn deliver(channel: &dyn ChannelHandle, conversation_id: &str, message: &OutboundMessage) -> bool {
    let err = match channel.send_message(conversation_id, message).await {
        Ok(()) => return true,
        Err(e) => e,
    };
    let Some(plain) = message.without_markup() else {
        log::warn!("{}: send to {} failed: {}", channel.id(), conversation_id, err);
        return false;
    };
    log::warn!(
        "{}: send to {} rejected ({}), retrying without markup",
        channel.id(),
        conversation_id,
        err
    );
    match channel.send_message(conversation_id, &plain).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("{}: plain-text retry to {} failed: {}", channel.id(), conversation_id, e);
            false
        }
    }
}

/// Process one inbound event: build the reply and deliver it to the event's conversation.
pub async fn handle_event(ctx: &BotContext, channel: &dyn ChannelHandle, event: InboundEvent) {
    let Some(reply) = ctx.reply_for(&event) else {
        log::debug!("{}: ignoring non-command text from {}", event.channel_id, event.conversation_id);
        return;
    };
    if deliver(channel, &event.conversation_id, &reply).await {
        log::debug!("{}: replied to {}", event.channel_id, event.conversation_id);
    }
}
