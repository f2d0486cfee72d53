//! Inbound event from a channel: delivered to the bot runtime for a reply.

/// An update from a conversation that may need a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub channel_id: String,
    pub conversation_id: String,
    pub kind: InboundKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    /// User-typed text (commands).
    Text(String),
    /// `web_app_data.data` sent by the web app: a JSON string.
    AppData(String),
}
