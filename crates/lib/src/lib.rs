//! Mini App relay bot library: menu builder, web app payload dispatcher, Telegram channel,
//! and the bot runtime used by the CLI.

pub mod bot;
pub mod channels;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod init;
pub mod markup;
pub mod menu;
