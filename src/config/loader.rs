//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Environment variables that override secrets and identity from the file.
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_WEBHOOK_SECRET: &str = "TELEGRAM_WEBHOOK_SECRET";
pub const ENV_OPERATOR_ID: &str = "PAYOUT_RELAY_OPERATOR_ID";
pub const ENV_SERVICE_KEY: &str = "DATASTORE_SERVICE_KEY";
pub const ENV_ADMIN_KEY: &str = "PAYOUT_RELAY_ADMIN_KEY";

/// Load and validate configuration from a TOML file, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: RelayConfig = toml::from_str(&content)?;

    let mut errors = apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    if let Err(semantic) = validate_config(&config) {
        errors.extend(semantic);
    }

    if errors.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Validation(errors))
    }
}

/// Overlay secrets from the environment.
///
/// `lookup` is `std::env::var` in production; tests pass a map. Values that
/// cannot be applied are returned as validation errors; this runs before
/// logging is up, so nothing here may rely on a subscriber.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F) -> Vec<ValidationError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    if let Some(token) = lookup(ENV_BOT_TOKEN) {
        config.telegram.bot_token = token;
    }
    if let Some(secret) = lookup(ENV_WEBHOOK_SECRET) {
        config.telegram.webhook_secret = secret;
    }
    if let Some(raw) = lookup(ENV_OPERATOR_ID) {
        match raw.trim().parse() {
            Ok(id) => config.telegram.operator_id = id,
            Err(_) => errors.push(ValidationError::new(
                ENV_OPERATOR_ID,
                format!("'{}' is not a numeric Telegram user id", raw),
            )),
        }
    }
    if let Some(key) = lookup(ENV_SERVICE_KEY) {
        config.datastore.service_key = key;
    }
    if let Some(key) = lookup(ENV_ADMIN_KEY) {
        config.admin.api_key = key;
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BOT_TOKEN, "999:token"),
            (ENV_OPERATOR_ID, "777"),
            (ENV_SERVICE_KEY, "svc"),
        ]
        .into_iter()
        .collect();

        let mut config = RelayConfig::default();
        let errors = apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert!(errors.is_empty());
        assert_eq!(config.telegram.bot_token, "999:token");
        assert_eq!(config.telegram.operator_id, 777);
        assert_eq!(config.datastore.service_key, "svc");
        assert!(config.telegram.webhook_secret.is_empty());
    }

    #[test]
    fn test_bad_operator_id_is_reported() {
        let mut config = RelayConfig::default();
        config.telegram.operator_id = 5;
        let errors = apply_env_overrides(&mut config, |k| {
            (k == ENV_OPERATOR_ID).then(|| "abc".to_string())
        });
        assert_eq!(config.telegram.operator_id, 5);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, ENV_OPERATOR_ID);
        assert!(errors[0].message.contains("'abc'"));
    }

    #[test]
    fn test_load_reports_validation_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[confirmation]\nwindow_secs = 0").unwrap();

        match load_config(file.path()) {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.field == "confirmation.window_secs"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[confirmation\nwindow_secs = ").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }
}
