//! 具体渠道实现

pub mod console;
pub mod discord;

pub use console::ConsoleChannel;
pub use discord::{DiscordChannel, DiscordConfig};
