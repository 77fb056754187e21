use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::warn;

use common::{Error, Notifier, Result};

/// Sends alert messages to every configured chat.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_ids: Vec<ChatId>,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_ids: &[i64]) -> Self {
        Self {
            bot,
            chat_ids: chat_ids.iter().copied().map(ChatId).collect(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    /// Tries every chat; fails if any delivery failed.
    async fn send(&self, message: &str) -> Result<()> {
        let mut failed = Vec::new();
        for &chat_id in &self.chat_ids {
            if let Err(e) = self.bot.send_message(chat_id, message).await {
                warn!(chat_id = ?chat_id, error = %e, "Failed to send Telegram alert");
                failed.push(format!("{}: {e}", chat_id.0));
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::Notification(failed.join("; ")))
        }
    }
}
