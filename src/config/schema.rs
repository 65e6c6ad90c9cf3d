//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the payout relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration for the webhook server.
    pub listener: ListenerConfig,

    /// Telegram bot settings.
    pub telegram: TelegramConfig,

    /// Datastore backend settings.
    pub datastore: DatastoreConfig,

    /// Two-step confirmation settings.
    pub confirmation: ConfirmationConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token. Prefer the `TELEGRAM_BOT_TOKEN` environment variable.
    pub bot_token: String,

    /// Bot API base URL.
    pub api_base_url: String,

    /// Secret expected in `X-Telegram-Bot-Api-Secret-Token`. Empty disables the check.
    pub webhook_secret: String,

    /// The single Telegram user id allowed to confirm payouts.
    pub operator_id: i64,

    /// Outbound request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base_url: "https://api.telegram.org".to_string(),
            webhook_secret: String::new(),
            operator_id: 0,
            request_timeout_secs: 10,
        }
    }
}

/// Which datastore implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatastoreBackend {
    /// Managed backend's REST interface.
    Rest,
    /// Process-local tables; data is lost on restart.
    Memory,
}

/// Datastore configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatastoreConfig {
    pub backend: DatastoreBackend,

    /// Project URL; tables live under `/rest/v1/`.
    pub rest_url: String,

    /// Service role key. Prefer the `DATASTORE_SERVICE_KEY` environment variable.
    pub service_key: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            backend: DatastoreBackend::Rest,
            rest_url: "http://localhost:54321".to_string(),
            service_key: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Two-step confirmation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// How long a `/confirm_payout` stays valid for its `YES`, in seconds.
    pub window_secs: u64,
}

impl ConfirmationConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self { window_secs: 600 }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for auxiliary routes (`/healthz`) in seconds. The webhook is
    /// bounded by the datastore and Bot API client timeouts instead.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum webhook body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 256 * 1024,
        }
    }
}
