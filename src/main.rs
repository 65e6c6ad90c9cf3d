//! Payout relay (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 PAYOUT RELAY                 │
//!   Telegram update       │  ┌──────────┐    ┌──────────────────────┐    │
//!   ──────────────────────┼─▶│ webhook  │───▶│ confirmation protocol│    │
//!                         │  └──────────┘    └──────┬─────────┬─────┘    │
//!                         │                         │         │          │
//!                         │                  ┌──────▼───┐ ┌───▼──────┐   │
//!                         │                  │ pending  │ │  store   │───┼──▶ datastore
//!                         │                  │  store   │ │ (REST)   │   │    (payouts, wallet,
//!                         │                  └──────────┘ └──────────┘   │     admin_logs)
//!   reply                 │  ┌──────────┐                                │
//!   ◀─────────────────────┼──│ telegram │◀── one reply per command       │
//!                         │  │  client  │                                │
//!                         │  └──────────┘                                │
//!                         │  admin API · config reload · metrics · logs  │
//!                         └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use payout_relay::admin::setup_admin_router;
use payout_relay::config::{load_config, watcher::ConfigWatcher};
use payout_relay::http::HttpServer;
use payout_relay::lifecycle::{apply_config_update, build_state, signals, Shutdown};
use payout_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "payout-relay", version)]
#[command(about = "Telegram payout confirmation relay", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "PAYOUT_RELAY_CONFIG", default_value = "payout-relay.toml")]
    config: PathBuf,

    /// Reload operator, window and admin key when the config file changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    logging::init_tracing(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "payout-relay starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        window_secs = config.confirmation.window_secs,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let state = build_state(config.clone())?;
    let shutdown = Shutdown::new();

    // Keep the watcher alive for the life of the process.
    let _watcher = if args.watch {
        let (watcher, mut updates) = ConfigWatcher::new(&args.config);
        let handle = watcher.run()?;
        let reload_state = state.clone();
        tokio::spawn(async move {
            while let Some(new_config) = updates.recv().await {
                apply_config_update(&reload_state, new_config);
            }
        });
        Some(handle)
    } else {
        None
    };

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let router = setup_admin_router(state.clone());
        let mut stop = shutdown.subscribe();
        Some(tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        }))
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(state);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::shutdown_signal().await;
    shutdown.trigger();

    server_task.await??;
    if let Some(task) = admin_task {
        task.await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
