//! Pending first-step confirmations.
//!
//! # Lifecycle
//! ```text
//! /confirm_payout accepted  → put (overwrites any entry for the same id)
//! YES accepted in window    → remove
//! YES after window          → remove (lazily, at lookup)
//! ```
//!
//! The store only keeps entries; deciding whether one is still valid is the
//! protocol's job, done at lookup time. There is no background sweep.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::store::{PayoutId, StoreResult, UserId};

/// Payout fields captured when step one was accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutSnapshot {
    pub amount: Decimal,
    pub user_id: UserId,
    pub payout_method_id: Option<String>,
}

/// A first-step confirmation waiting for its `YES`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingConfirmation {
    pub payout_id: PayoutId,
    pub snapshot: PayoutSnapshot,
    pub created_at: DateTime<Utc>,
}

impl PendingConfirmation {
    /// `now - created_at > window`. An entry from the future is never expired.
    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match (now - self.created_at).to_std() {
            Ok(age) => age > window,
            Err(_) => false,
        }
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>, window: Duration) -> Duration {
        let age = (now - self.created_at).to_std().unwrap_or_default();
        window.saturating_sub(age)
    }
}

/// Keyed storage for pending confirmations.
///
/// At most one entry exists per payout id. Implementations backed by a shared
/// table let several relay instances see each other's first steps.
#[async_trait]
pub trait PendingStore: Send + Sync {
    /// Insert or replace the entry for `entry.payout_id`.
    async fn put(&self, entry: PendingConfirmation) -> StoreResult<()>;

    async fn get(&self, payout_id: &PayoutId) -> StoreResult<Option<PendingConfirmation>>;

    async fn remove(&self, payout_id: &PayoutId) -> StoreResult<Option<PendingConfirmation>>;

    async fn list(&self) -> StoreResult<Vec<PendingConfirmation>>;

    async fn count(&self) -> StoreResult<usize>;
}

/// Process-local pending store. Lost on restart, not shared between instances.
#[derive(Clone, Default)]
pub struct InMemoryPendingStore {
    inner: Arc<DashMap<PayoutId, PendingConfirmation>>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingStore for InMemoryPendingStore {
    async fn put(&self, entry: PendingConfirmation) -> StoreResult<()> {
        self.inner.insert(entry.payout_id.clone(), entry);
        Ok(())
    }

    async fn get(&self, payout_id: &PayoutId) -> StoreResult<Option<PendingConfirmation>> {
        Ok(self.inner.get(payout_id).map(|r| r.value().clone()))
    }

    async fn remove(&self, payout_id: &PayoutId) -> StoreResult<Option<PendingConfirmation>> {
        Ok(self.inner.remove(payout_id).map(|(_, v)| v))
    }

    async fn list(&self) -> StoreResult<Vec<PendingConfirmation>> {
        Ok(self.inner.iter().map(|r| r.value().clone()).collect())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.inner.len())
    }
}
