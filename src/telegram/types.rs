//! Bot API wire types and error definitions.
//!
//! Only the fields the relay reads are modelled; everything else is ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An incoming update pushed to the webhook.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<Message>,
}

impl Update {
    /// The message carried by this update, if any. Edits are not commands.
    pub fn command_message(&self) -> Option<&Message> {
        self.message.as_ref()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Message {
    /// Channel-native identity of whoever sent the message.
    ///
    /// Channel posts carry no `from`; the chat id stands in.
    pub fn sender_id(&self) -> i64 {
        self.from.as_ref().map(|u| u.id).unwrap_or(self.chat.id)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Body of a `sendMessage` call.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessage<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
}

/// Envelope every Bot API method answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(default)]
    pub error_code: Option<u16>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Errors that can occur while talking to the Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Transport-level failure.
    #[error("Telegram request failed: {0}")]
    Http(String),

    /// Request timed out.
    #[error("Telegram timeout after {0} seconds")]
    Timeout(u64),

    /// The Bot API rejected the call.
    #[error("Telegram API error {code}: {description}")]
    Api { code: u16, description: String },
}

impl TelegramError {
    /// The Bot API refused the text because its Markdown did not parse.
    pub fn is_markup_rejection(&self) -> bool {
        matches!(
            self,
            TelegramError::Api { code: 400, description } if description.contains("can't parse entities")
        )
    }
}
