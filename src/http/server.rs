//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the webhook and liveness handlers
//! - Wire up middleware (tracing, timeouts, body limit, request ID)
//!
//! The webhook route carries no request timeout. Its datastore and Bot API
//! calls are bounded by their own client timeouts, and a 408 would make
//! Telegram redeliver an update that was already applied.
//! - Bind server to listener and stop on the shutdown broadcast

use arc_swap::ArcSwap;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RelayConfig;
use crate::confirmation::PayoutConfirmation;
use crate::http::request::request_id_layers;
use crate::http::webhook::telegram_webhook;
use crate::telegram::Messenger;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<InnerState>,
}

pub struct InnerState {
    /// Live configuration; swapped on reload.
    pub config: ArcSwap<RelayConfig>,
    pub protocol: Arc<PayoutConfirmation>,
    pub messenger: Arc<dyn Messenger>,
}

impl AppState {
    pub fn new(
        config: RelayConfig,
        protocol: Arc<PayoutConfirmation>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            inner: Arc::new(InnerState {
                config: ArcSwap::from_pointee(config),
                protocol,
                messenger,
            }),
        }
    }
}

/// HTTP server for the Telegram webhook.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around shared state.
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.inner.config.load_full();

        let liveness: Router<AppState> = Router::new()
            .route("/healthz", get(|| async { "ok" }))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .route("/telegram/webhook", post(telegram_webhook))
            .merge(liveness)
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(TraceLayer::new_for_http())
            .layer(request_id_layers())
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
