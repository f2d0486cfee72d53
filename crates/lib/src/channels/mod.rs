//! Communication channels (Telegram).
//!
//! Inbound updates become [`InboundEvent`]s for the bot runtime; replies go out through a
//! [`ChannelHandle`].

mod handle;
mod inbound;
mod outbound;
mod telegram;

pub use handle::ChannelHandle;
pub use inbound::{InboundEvent, InboundKind};
pub use outbound::{KeyboardButton, OutboundMessage, ParseMode, ReplyKeyboard, WebAppInfo};
pub use telegram::{TelegramChannel, TelegramError, TelegramUpdate, TELEGRAM_CHANNEL_ID};
