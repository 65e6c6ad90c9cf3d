//! Payout confirmation protocol.
//!
//! # Data Flow
//! ```text
//! operator text
//!     → command.rs (grammar)
//!     → protocol.rs (authorize, step one / step two)
//!         → pending.rs (first-step entries, keyed by payout id)
//!         → store (payout lookup, conditional update, wallet, audit)
//!     → one reply text
//! ```
//!
//! # Design Decisions
//! - Expiry is evaluated lazily at lookup; no timers
//! - The pending store is a trait so a shared table can replace the in-memory map
//! - Nothing is retried automatically; every failure ends the command

pub mod clock;
pub mod command;
pub mod pending;
pub mod protocol;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{Command, USAGE};
pub use pending::{InMemoryPendingStore, PayoutSnapshot, PendingConfirmation, PendingStore};
pub use protocol::{PayoutConfirmation, PendingView, ProtocolSettings, ACTION_PAYOUT_CONFIRMATION};
pub use types::{ConfirmationError, Outcome};
