//! Telegram messaging channel.
//!
//! # Data Flow
//! ```text
//! Telegram → POST /telegram/webhook (http/webhook.rs)
//!     → types.rs (Update decoding)
//!     → confirmation protocol
//!     → client.rs (sendMessage reply)
//! ```
//!
//! # Security Constraints
//! - Bot token ONLY from configuration/environment, never logged
//! - Webhook secret header checked before the body is acted on

pub mod client;
pub mod types;

pub use client::{Messenger, TelegramClient};
pub use types::{Chat, Message, TelegramError, Update, User};
