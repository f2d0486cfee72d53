//! Bot runtime: routes inbound events to commands or the dispatcher and delivers replies.
//!
//! One HTTP port serves the health check and, in webhook mode, the Telegram webhook.

mod handler;
mod server;

pub use handler::{deliver, handle_event, BotContext};
pub use server::{run_bot, DeliveryMode};
