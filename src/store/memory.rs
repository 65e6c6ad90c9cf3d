//! In-process datastore.
//!
//! Backs the `memory` datastore backend and the test suites. Each table is a
//! `DashMap`; the conditional status update holds the row's shard lock, so two
//! concurrent confirmations of the same payout see exactly one winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

use crate::store::types::{
    AdminLogEntry, Payout, PayoutId, PayoutMethod, PayoutStatus, StoreError, StoreResult, UserId,
};
use crate::store::PayoutStore;

/// Wallet row as kept by the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletRecord {
    pub balance: Decimal,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Default)]
pub struct InMemoryPayoutStore {
    payouts: Arc<DashMap<PayoutId, Payout>>,
    methods: Arc<DashMap<String, PayoutMethod>>,
    wallets: Arc<DashMap<UserId, WalletRecord>>,
    admin_logs: Arc<Mutex<Vec<AdminLogEntry>>>,
}

impl InMemoryPayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_payout(&self, payout: Payout) {
        self.payouts.insert(payout.id.clone(), payout);
    }

    pub fn insert_method(&self, method: PayoutMethod) {
        self.methods.insert(method.id.clone(), method);
    }

    pub fn set_wallet_balance(&self, user_id: UserId, balance: Decimal) {
        self.wallets.insert(user_id, WalletRecord { balance, updated_at: None });
    }

    pub fn payout(&self, id: &PayoutId) -> Option<Payout> {
        self.payouts.get(id).map(|r| r.value().clone())
    }

    pub fn wallet(&self, user_id: &UserId) -> Option<WalletRecord> {
        self.wallets.get(user_id).map(|r| r.value().clone())
    }

    pub fn admin_logs(&self) -> Vec<AdminLogEntry> {
        self.admin_logs
            .lock()
            .map(|logs| logs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PayoutStore for InMemoryPayoutStore {
    async fn fetch_payout(&self, id: &PayoutId) -> StoreResult<Option<Payout>> {
        Ok(self.payout(id))
    }

    async fn fetch_payout_method(&self, id: &str) -> StoreResult<Option<PayoutMethod>> {
        Ok(self.methods.get(id).map(|r| r.value().clone()))
    }

    async fn mark_payout_success(&self, id: &PayoutId, at: DateTime<Utc>) -> StoreResult<bool> {
        match self.payouts.get_mut(id) {
            Some(mut row) if row.status == PayoutStatus::Pending => {
                row.status = PayoutStatus::Success;
                row.processed_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn zero_wallet(&self, user_id: &UserId, at: DateTime<Utc>) -> StoreResult<()> {
        match self.wallets.get_mut(user_id) {
            Some(mut wallet) => {
                wallet.balance = Decimal::ZERO;
                wallet.updated_at = Some(at);
                Ok(())
            }
            None => Err(StoreError::Missing(format!("wallet for user {}", user_id))),
        }
    }

    async fn insert_admin_log(&self, entry: AdminLogEntry) -> StoreResult<()> {
        let mut logs = self
            .admin_logs
            .lock()
            .map_err(|_| StoreError::Http("admin log mutex poisoned".into()))?;
        logs.push(entry);
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
