//! Messaging transport: Telegram delivery and the chat command surface.

pub mod commands;
pub mod telegram;

pub use commands::{ChatOrigin, Command, CommandRouter};
pub use telegram::{TelegramSink, build_bot, start_polling};
