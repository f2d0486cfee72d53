//! Outbound message: text plus optional parse mode and reply keyboard, as sent via sendMessage.

use serde::Serialize;

/// Telegram rich-text mode for `sendMessage.parse_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    MarkdownV2,
}

/// A message ready for delivery to a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    /// Markup-free rendition of `text`, used when the transport rejects the markup.
    pub plain_text: Option<String>,
    pub reply_markup: Option<ReplyKeyboard>,
}

impl OutboundMessage {
    /// Plain text message without markup or keyboard.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: None,
            plain_text: None,
            reply_markup: None,
        }
    }

    /// MarkdownV2 message with a plain-text rendition for retry.
    pub fn markdown_v2(text: impl Into<String>, plain_text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: Some(ParseMode::MarkdownV2),
            plain_text: Some(plain_text.into()),
            reply_markup: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: ReplyKeyboard) -> Self {
        self.reply_markup = Some(keyboard);
        self
    }

    /// The same message stripped of markup, or None when it carries no parse mode.
    pub fn without_markup(&self) -> Option<OutboundMessage> {
        if self.parse_mode.is_none() {
            return None;
        }
        Some(OutboundMessage {
            text: self.plain_text.clone().unwrap_or_else(|| self.text.clone()),
            parse_mode: None,
            plain_text: None,
            reply_markup: self.reply_markup.clone(),
        })
    }
}

/// Bot API `ReplyKeyboardMarkup` with web app buttons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboard {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    pub one_time_keyboard: bool,
}

/// Keyboard button that opens a web app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
    pub web_app: WebAppInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebAppInfo {
    pub url: String,
}
