//! Bot API client.
//!
//! # Responsibilities
//! - Send text replies and notices to a chat
//! - Enforce an outbound timeout
//! - Surface Bot API rejections as errors instead of silently dropping them
//! - Resend as plain text when the Bot API cannot parse a reply's Markdown

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::TelegramConfig;
use crate::observability::metrics;
use crate::telegram::types::{ApiResponse, SendMessage, TelegramError};

/// Outbound half of the messaging channel.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver a Markdown text message to a chat.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError>;
}

/// Messenger backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    endpoint: String,
    timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TelegramError::Http(e.to_string()))?;

        let endpoint = format!(
            "{}/bot{}/sendMessage",
            config.api_base_url.trim_end_matches('/'),
            config.bot_token
        );

        Ok(Self {
            client,
            endpoint,
            timeout_secs: config.request_timeout_secs,
        })
    }
}

impl TelegramClient {
    async fn post(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<&'static str>,
    ) -> Result<(), TelegramError> {
        let body = SendMessage {
            chat_id,
            text,
            parse_mode,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                metrics::record_telegram_send("transport_error");
                if e.is_timeout() {
                    TelegramError::Timeout(self.timeout_secs)
                } else {
                    // reqwest includes the URL in its message; strip it, it carries the token.
                    TelegramError::Http(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        let api: ApiResponse = response.json().await.map_err(|e| {
            metrics::record_telegram_send("decode_error");
            TelegramError::Http(format!("undecodable response ({}): {}", status, e.without_url()))
        })?;

        if !api.ok {
            metrics::record_telegram_send("rejected");
            return Err(TelegramError::Api {
                code: api.error_code.unwrap_or(status.as_u16()),
                description: api.description.unwrap_or_default(),
            });
        }

        metrics::record_telegram_send("ok");
        tracing::debug!(chat_id, "Telegram message delivered");
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        match self.post(chat_id, text, Some("Markdown")).await {
            Err(e) if e.is_markup_rejection() => {
                tracing::warn!(chat_id, error = %e, "Markdown rejected, resending as plain text");
                self.post(chat_id, text, None).await
            }
            other => other,
        }
    }
}
