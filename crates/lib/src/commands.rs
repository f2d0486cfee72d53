//! Bot commands and their fixed replies.

use crate::channels::OutboundMessage;
use crate::menu;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Welcome text and the main menu keyboard.
    Start,
    /// Prepared custom transaction and a button that opens it.
    Custom,
    Help,
}

const HELP_TEXT: &str = "🤖 Web3 Mini App bot

📋 Commands:
• /start - start the bot and show the main menu
• /custom - send a custom transaction
• /help - show this help

🔧 Features:
• 💰 Send transaction - execute an Ethereum transaction
• 🔐 Sign message - create a digital signature
• 🧪 Transaction tester - generate test data

💡 How to use:
1. Tap a keyboard button below
2. Connect your wallet (MetaMask etc.)
3. Review and execute the transaction
4. The result is sent back to this chat automatically";

impl BotCommand {
    /// Parse a command from message text. Accepts `/cmd`, `/cmd@botname`, and trailing arguments.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name {
            "start" => Some(Self::Start),
            "custom" => Some(Self::Custom),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    /// Fixed reply for this command; menu URLs are built from `webapp_url`.
    pub fn reply(&self, webapp_url: &str) -> OutboundMessage {
        match self {
            Self::Start => OutboundMessage::plain(
                "🤖 Welcome to the Web3 Mini App bot!\n\nTap a button below to get started:",
            )
            .with_keyboard(menu::keyboard(&menu::build_menu(webapp_url), false)),
            Self::Custom => {
                let (tx, entries) = menu::build_custom_menu(webapp_url);
                OutboundMessage::plain(format!(
                    "🔗 Custom transaction ready!\n\n📝 Recipient: {}\n💰 Amount: {} ETH\n📄 Description: {}\n\nTap the button below to execute the transaction:",
                    tx.to, tx.value, tx.description
                ))
                .with_keyboard(menu::keyboard(&entries, false))
            }
            Self::Help => OutboundMessage::plain(HELP_TEXT),
        }
    }
}
