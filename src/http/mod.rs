//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID assigned and propagated)
//!     → webhook.rs (Telegram update → confirmation protocol → reply)
//! ```

pub mod request;
pub mod server;
pub mod webhook;

pub use request::{request_id, X_REQUEST_ID};
pub use server::{AppState, HttpServer, InnerState};
