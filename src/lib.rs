//! Telegram-mediated payout confirmation relay.
//!
//! An operator confirms withdrawals from chat with a two-step handshake
//! (`/confirm_payout {id}`, then `YES {id}`); the relay finalizes the payout in
//! the datastore, clears the user's wallet and writes an audit record.

pub mod admin;
pub mod config;
pub mod confirmation;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod store;
pub mod telegram;

pub use config::RelayConfig;
pub use confirmation::PayoutConfirmation;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
