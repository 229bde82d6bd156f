//! Outbound replies
//!
//! The dispatcher only decides *what* to send; an [`Outbox`] sends it. The
//! production implementation talks to the Bot API through teloxide.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::InputFile;

use crate::core::error::AppResult;
use crate::core::metrics;
use crate::telegram::bot::main_menu_keyboard;
use crate::telegram::types::Reply;

#[async_trait]
pub trait Outbox: Send + Sync {
    /// Sends one reply to `chat_id`.
    async fn send(&self, chat_id: i64, reply: Reply) -> AppResult<()>;
}

/// Sends replies through the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramOutbox {
    bot: Bot,
}

impl TelegramOutbox {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Outbox for TelegramOutbox {
    async fn send(&self, chat_id: i64, reply: Reply) -> AppResult<()> {
        let chat_id = ChatId(chat_id);
        match reply {
            Reply::Text(text) => {
                self.bot.send_message(chat_id, text).await?;
            }
            Reply::WithMenu(text) => {
                self.bot
                    .send_message(chat_id, text)
                    .reply_markup(main_menu_keyboard())
                    .await?;
            }
            Reply::Document {
                file_name,
                content,
                caption,
            } => {
                let document = InputFile::memory(content).file_name(file_name);
                match caption {
                    Some(caption) => {
                        self.bot.send_document(chat_id, document).caption(caption).await?;
                    }
                    None => {
                        self.bot.send_document(chat_id, document).await?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Sends a reply and logs a failure instead of returning it.
pub async fn deliver(outbox: &dyn Outbox, chat_id: i64, reply: Reply) {
    if let Err(e) = outbox.send(chat_id, reply).await {
        metrics::SEND_FAILURES_TOTAL.inc();
        log::error!("Failed to send reply to chat {}: {}", chat_id, e);
    }
}
