pub mod commands;
pub mod notifier;

pub use commands::{run_bot, BotDeps, Command};
pub use notifier::TelegramNotifier;
