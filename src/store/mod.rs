//! Datastore subsystem.
//!
//! # Data Flow
//! ```text
//! confirmation protocol
//!     → PayoutStore trait
//!         → rest.rs   (managed Postgres behind a PostgREST-style API)
//!         → memory.rs (in-process tables, development and tests)
//! ```
//!
//! # Design Decisions
//! - The datastore is the single source of truth for "already finalized"
//! - Status transition is conditional on `status = pending`
//! - Status and wallet writes are separate calls; callers must handle the gap

pub mod memory;
pub mod rest;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::InMemoryPayoutStore;
pub use rest::RestPayoutStore;
pub use types::{
    AdminLogEntry, Payout, PayoutId, PayoutMethod, PayoutStatus, StoreError, StoreResult, UserId,
};

/// Access to the `payouts`, `payout_methods`, `wallet` and `admin_logs` tables.
#[async_trait]
pub trait PayoutStore: Send + Sync {
    /// Look up a payout by id.
    async fn fetch_payout(&self, id: &PayoutId) -> StoreResult<Option<Payout>>;

    /// Look up the payout method a payout is sent to.
    async fn fetch_payout_method(&self, id: &str) -> StoreResult<Option<PayoutMethod>>;

    /// Move a payout from `pending` to `success`.
    ///
    /// Returns `false` when no row was affected, i.e. the payout is missing or
    /// someone else already moved it out of `pending`.
    async fn mark_payout_success(&self, id: &PayoutId, at: DateTime<Utc>) -> StoreResult<bool>;

    /// Finalize the user's wallet after a payout (balance set to zero).
    ///
    /// `at` is recorded by backends that track it; the REST backend writes
    /// `balance` only.
    async fn zero_wallet(&self, user_id: &UserId, at: DateTime<Utc>) -> StoreResult<()>;

    /// Append an audit record.
    async fn insert_admin_log(&self, entry: AdminLogEntry) -> StoreResult<()>;

    /// Cheap connectivity check.
    async fn ping(&self) -> StoreResult<()>;
}
