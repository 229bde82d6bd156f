//! Update and reply types shared by the webhook endpoint, the polling
//! handler and the dispatcher.

use serde::Deserialize;
use teloxide::types::Message;

/// A Telegram Update object (subset of fields we need).
///
/// Anything other than a `message` (edited messages, callbacks, member
/// updates...) deserializes with `message: None` and is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<WebhookMessage>,
}

/// A Telegram Message object (subset).
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMessage {
    pub chat: WebhookChat,
    #[serde(default)]
    pub from: Option<WebhookUser>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A Telegram Chat object (subset).
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChat {
    pub id: i64,
}

/// A Telegram User object (subset).
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
}

/// One inbound chat message, independent of how it was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    /// Sender; `None` for channel posts and anonymous admins
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    /// `None` for stickers, photos and other non-text messages
    pub text: Option<String>,
}

impl IncomingMessage {
    /// Plain text message from a user, mostly for tests.
    pub fn text(chat_id: i64, user_id: i64, text: &str) -> Self {
        Self {
            chat_id,
            user_id: Some(user_id),
            first_name: None,
            text: Some(text.to_string()),
        }
    }
}

impl From<WebhookMessage> for IncomingMessage {
    fn from(msg: WebhookMessage) -> Self {
        Self {
            chat_id: msg.chat.id,
            user_id: msg.from.as_ref().map(|u| u.id),
            first_name: msg.from.and_then(|u| u.first_name),
            text: msg.text,
        }
    }
}

impl From<&Message> for IncomingMessage {
    fn from(msg: &Message) -> Self {
        Self {
            chat_id: msg.chat.id.0,
            user_id: msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()),
            first_name: msg.from.as_ref().map(|u| u.first_name.clone()),
            text: msg.text().map(|t| t.to_string()),
        }
    }
}

/// What the bot sends back to the originating chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Plain text message
    Text(String),
    /// Text message carrying the main reply keyboard
    WithMenu(String),
    /// File attachment
    Document {
        file_name: String,
        content: Vec<u8>,
        caption: Option<String>,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    /// Text of a message reply, `None` for documents.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text(text) | Reply::WithMenu(text) => Some(text),
            Reply::Document { .. } => None,
        }
    }
}
