//! Bot initialization and the command surface
//!
//! This module contains:
//! - Command and keyboard button definitions
//! - Bot instance creation
//! - One-time startup registration (commands menu, webhook)

use reqwest::ClientBuilder;
use std::str::FromStr;
use strum::{EnumIter, EnumMessage, EnumString, IntoEnumIterator, IntoStaticStr};
use teloxide::prelude::*;
use teloxide::types::{BotCommand, KeyboardButton, KeyboardMarkup};
use url::Url;

use crate::core::config::{self, Config};
use crate::core::error::AppResult;

/// Slash commands understood by the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr, EnumIter, EnumMessage)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Command {
    #[strum(message = "приветствие и клавиатура")]
    Start,
    #[strum(message = "список команд")]
    Help,
    #[strum(message = "добавить скважину: Месторождение|№|Статус|Комментарий")]
    Add,
    #[strum(message = "обновить скважину: №|Статус|Комментарий")]
    Update,
    #[strum(message = "экспорт всех скважин в CSV")]
    Export,
    #[strum(message = "показать все скважины")]
    Show,
    #[strum(message = "список месторождений")]
    Fields,
    #[strum(message = "список скважин")]
    Wells,
}

impl Command {
    /// Command name without the leading slash
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn description(self) -> &'static str {
        self.get_message().unwrap_or_default()
    }

    /// Parses the first word of a message such as `/add` or `/add@opi_bot`.
    pub fn parse_token(token: &str) -> Option<Self> {
        let name = token.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        Command::from_str(name).ok()
    }
}

/// Reply keyboard buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr, EnumIter)]
pub enum MenuButton {
    #[strum(serialize = "📍 Месторождения")]
    Fields,
    #[strum(serialize = "🛢 Скважины")]
    Wells,
    #[strum(serialize = "➕ Добавить")]
    Add,
    #[strum(serialize = "✏️ Обновить")]
    Update,
}

impl MenuButton {
    pub fn label(self) -> &'static str {
        self.into()
    }

    pub fn from_label(text: &str) -> Option<Self> {
        MenuButton::from_str(text.trim()).ok()
    }
}

/// Main reply keyboard shown by /start
pub fn main_menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(MenuButton::Fields.label()),
            KeyboardButton::new(MenuButton::Wells.label()),
        ],
        vec![
            KeyboardButton::new(MenuButton::Add.label()),
            KeyboardButton::new(MenuButton::Update.label()),
        ],
        vec![KeyboardButton::new("/export"), KeyboardButton::new("/help")],
    ])
    .resize_keyboard()
}

/// Creates a Bot instance with custom or default API URL
///
/// # Errors
/// Fails when the HTTP client cannot be built.
pub fn create_bot(config: &Config) -> AppResult<Bot> {
    let client = ClientBuilder::new()
        .timeout(config::network::timeout())
        .build()
        .map_err(|e| crate::core::error::AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

    let bot = Bot::with_client(config.token(), client);
    let bot = match &config.bot_api_url {
        Some(url) => {
            log::info!("Using custom Bot API URL: {}", url);
            bot.set_api_url(url.clone())
        }
        None => bot,
    };

    Ok(bot)
}

/// Publishes the command list in the Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    let commands: Vec<BotCommand> = Command::iter()
        .map(|cmd| BotCommand::new(cmd.name(), cmd.description()))
        .collect();
    bot.set_my_commands(commands).await?;
    Ok(())
}

/// Replaces whatever webhook was registered with `url`.
///
/// Runs once during startup, before the HTTP server accepts updates.
pub async fn register_webhook(bot: &Bot, url: Url) -> Result<(), teloxide::RequestError> {
    bot.delete_webhook().await?;
    bot.set_webhook(url.clone()).await?;
    log::info!("Webhook set: {}", url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token() {
        assert_eq!(Command::parse_token("/add"), Some(Command::Add));
        assert_eq!(Command::parse_token("/Update"), Some(Command::Update));
        assert_eq!(Command::parse_token("/export@opi_bot"), Some(Command::Export));
        assert_eq!(Command::parse_token("/unknown"), None);
        assert_eq!(Command::parse_token("add"), None);
    }

    #[test]
    fn test_every_command_has_description() {
        for cmd in Command::iter() {
            assert!(!cmd.description().is_empty(), "{:?} has no description", cmd);
        }
    }

    #[test]
    fn test_menu_button_labels_round_trip() {
        for button in MenuButton::iter() {
            assert_eq!(MenuButton::from_label(button.label()), Some(button));
        }
        assert_eq!(MenuButton::from_label("Добавить"), None);
    }
}
