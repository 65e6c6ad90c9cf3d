//! Startup orchestration.
//!
//! Builds the datastore, pending store, messenger and protocol from a validated
//! configuration, and applies live config reloads.

use std::sync::Arc;
use thiserror::Error;

use crate::config::{DatastoreBackend, RelayConfig};
use crate::confirmation::{InMemoryPendingStore, PayoutConfirmation, ProtocolSettings};
use crate::http::AppState;
use crate::store::{InMemoryPayoutStore, PayoutStore, RestPayoutStore, StoreError};
use crate::telegram::{TelegramClient, TelegramError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("datastore setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("telegram setup failed: {0}")]
    Telegram(#[from] TelegramError),
}

pub fn protocol_settings(config: &RelayConfig) -> ProtocolSettings {
    ProtocolSettings {
        operator_id: config.telegram.operator_id,
        window: config.confirmation.window(),
    }
}

/// Wire every subsystem together.
pub fn build_state(config: RelayConfig) -> Result<AppState, StartupError> {
    let payouts: Arc<dyn PayoutStore> = match config.datastore.backend {
        DatastoreBackend::Rest => Arc::new(RestPayoutStore::new(&config.datastore)?),
        DatastoreBackend::Memory => {
            tracing::warn!("Using in-memory datastore; payouts are not persisted");
            Arc::new(InMemoryPayoutStore::new())
        }
    };

    let protocol = Arc::new(PayoutConfirmation::new(
        protocol_settings(&config),
        payouts,
        Arc::new(InMemoryPendingStore::new()),
    ));
    let messenger = Arc::new(TelegramClient::new(&config.telegram)?);

    tracing::info!(
        operator_id = config.telegram.operator_id,
        window_secs = config.confirmation.window_secs,
        backend = ?config.datastore.backend,
        "Relay state initialized"
    );

    Ok(AppState::new(config, protocol, messenger))
}

/// Apply a reloaded configuration to running state.
///
/// Listener addresses, datastore and bot token are fixed at startup; a change
/// to them is logged and otherwise ignored until restart.
pub fn apply_config_update(state: &AppState, new_config: Arc<RelayConfig>) {
    let current = state.inner.config.load_full();

    if current.listener.bind_address != new_config.listener.bind_address
        || current.datastore.rest_url != new_config.datastore.rest_url
        || current.datastore.backend != new_config.datastore.backend
        || current.telegram.bot_token != new_config.telegram.bot_token
    {
        tracing::warn!("Config change to listener, datastore or bot token requires a restart");
    }

    let settings = protocol_settings(&new_config);
    if *state.inner.protocol.settings() != settings {
        state.inner.protocol.update_settings(settings);
    }

    state.inner.config.store(new_config);
}
