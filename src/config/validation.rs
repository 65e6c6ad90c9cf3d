//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Require the secrets the selected backends need
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{DatastoreBackend, RelayConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration for semantic problems.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.telegram.operator_id == 0 {
        errors.push(ValidationError::new("telegram.operator_id", "must be set"));
    }
    if config.telegram.bot_token.is_empty() {
        errors.push(ValidationError::new(
            "telegram.bot_token",
            "must be set (or TELEGRAM_BOT_TOKEN)",
        ));
    }
    if config.telegram.webhook_secret.is_empty() {
        errors.push(ValidationError::new(
            "telegram.webhook_secret",
            "must be set (or TELEGRAM_WEBHOOK_SECRET); the webhook trusts sender ids only behind it",
        ));
    } else if !is_valid_secret_token(&config.telegram.webhook_secret) {
        errors.push(ValidationError::new(
            "telegram.webhook_secret",
            "must be 1-256 characters of A-Z, a-z, 0-9, '_' or '-'",
        ));
    }
    if url::Url::parse(&config.telegram.api_base_url).is_err() {
        errors.push(ValidationError::new("telegram.api_base_url", "is not a URL"));
    }
    if config.telegram.request_timeout_secs == 0 {
        errors.push(ValidationError::new("telegram.request_timeout_secs", "must be > 0"));
    }

    if config.datastore.backend == DatastoreBackend::Rest {
        if url::Url::parse(&config.datastore.rest_url).is_err() {
            errors.push(ValidationError::new("datastore.rest_url", "is not a URL"));
        }
        if config.datastore.service_key.is_empty() {
            errors.push(ValidationError::new(
                "datastore.service_key",
                "must be set (or DATASTORE_SERVICE_KEY)",
            ));
        }
    }
    if config.datastore.timeout_secs == 0 {
        errors.push(ValidationError::new("datastore.timeout_secs", "must be > 0"));
    }

    if config.confirmation.window_secs == 0 {
        errors.push(ValidationError::new("confirmation.window_secs", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new("admin.bind_address", "is not a socket address"));
        }
        if config.admin.api_key.is_empty() || config.admin.api_key == "CHANGE_ME_IN_PRODUCTION" {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be changed when the admin API is enabled",
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Character set the Bot API accepts for `setWebhook`'s `secret_token`.
fn is_valid_secret_token(secret: &str) -> bool {
    secret.len() <= 256
        && secret
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
