//! Telegram bot integration: command surface, conversation state and delivery

pub mod bot;
pub mod commands;
pub mod dispatcher;
pub mod handlers;
pub mod outbox;
pub mod session;
pub mod types;

pub use bot::{create_bot, main_menu_keyboard, register_webhook, setup_bot_commands, Command, MenuButton};
pub use dispatcher::CommandDispatcher;
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use outbox::{deliver, Outbox, TelegramOutbox};
pub use types::{IncomingMessage, Reply, WebhookUpdate};
