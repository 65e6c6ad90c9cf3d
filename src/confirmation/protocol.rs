//! Two-step payout confirmation.
//!
//! # States (per payout id)
//! ```text
//! NoPending ──/confirm_payout──▶ AwaitingSecondStep ──YES (in window)──▶ NoPending + payout finalized
//!                                      │
//!                                      ├── window elapsed (seen at next lookup) ──▶ NoPending
//!                                      └── /confirm_payout again ──▶ AwaitingSecondStep (timer reset)
//! ```
//!
//! The pending store only gates the UX. The conditional `pending → success`
//! update in the datastore decides who wins when two confirmations race.

use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::confirmation::clock::{Clock, SystemClock};
use crate::confirmation::command::Command;
use crate::confirmation::pending::{PayoutSnapshot, PendingConfirmation, PendingStore};
use crate::confirmation::types::{ConfirmationError, Outcome};
use crate::observability::metrics;
use crate::store::{AdminLogEntry, PayoutId, PayoutStore, StoreResult};

/// Audit `action_type` for a finalized payout.
pub const ACTION_PAYOUT_CONFIRMATION: &str = "payout_confirmation";

/// Settings that may change on config reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolSettings {
    /// The only sender allowed to issue commands.
    pub operator_id: i64,
    /// How long step one stays valid.
    pub window: Duration,
}

/// A live pending confirmation as shown by the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct PendingView {
    #[serde(flatten)]
    pub entry: PendingConfirmation,
    pub age_secs: u64,
    pub remaining_secs: u64,
}

pub struct PayoutConfirmation {
    settings: ArcSwap<ProtocolSettings>,
    payouts: Arc<dyn PayoutStore>,
    pending: Arc<dyn PendingStore>,
    clock: Arc<dyn Clock>,
}

impl PayoutConfirmation {
    pub fn new(
        settings: ProtocolSettings,
        payouts: Arc<dyn PayoutStore>,
        pending: Arc<dyn PendingStore>,
    ) -> Self {
        Self {
            settings: ArcSwap::from_pointee(settings),
            payouts,
            pending,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> Arc<ProtocolSettings> {
        self.settings.load_full()
    }

    /// Swap operator and window. Entries already pending are judged against the new window.
    pub fn update_settings(&self, settings: ProtocolSettings) {
        tracing::info!(
            operator_id = settings.operator_id,
            window_secs = settings.window.as_secs(),
            "Confirmation settings updated"
        );
        self.settings.store(Arc::new(settings));
    }

    pub fn payouts(&self) -> &Arc<dyn PayoutStore> {
        &self.payouts
    }

    /// Parse an operator message and run it. Always yields exactly one reply.
    pub async fn handle(&self, text: &str, caller: i64) -> String {
        let command = Command::parse(text);
        let result = self.dispatch(&command, caller).await;

        match &result {
            Ok(_) => metrics::record_command(command.name(), "ok"),
            Err(e) => metrics::record_command(command.name(), e.label()),
        }

        match result {
            Ok(outcome) => outcome.reply_text(),
            Err(e) => e.reply_text(),
        }
    }

    async fn dispatch(&self, command: &Command, caller: i64) -> Result<Outcome, ConfirmationError> {
        self.authorize(caller)?;
        match command {
            Command::ConfirmPayout(id) => self.request_confirmation(id, caller).await,
            Command::Yes(id) => self.confirm_final(id, caller).await,
            Command::Help | Command::Unrecognized => Ok(Outcome::Usage),
        }
    }

    fn authorize(&self, caller: i64) -> Result<(), ConfirmationError> {
        if caller == self.settings.load().operator_id {
            Ok(())
        } else {
            tracing::warn!(caller, "Command from unauthorized sender rejected");
            Err(ConfirmationError::Unauthorized(caller))
        }
    }

    /// Step one: remember that the operator wants to finalize `payout_id`.
    pub async fn request_confirmation(
        &self,
        payout_id: &PayoutId,
        caller: i64,
    ) -> Result<Outcome, ConfirmationError> {
        self.authorize(caller)?;

        let payout = match self.payouts.fetch_payout(payout_id).await? {
            Some(p) if p.is_pending() => p,
            Some(p) => {
                tracing::info!(payout_id = %payout_id, status = p.status.as_str(), "Payout not pending");
                return Err(ConfirmationError::NotFoundOrAlreadyProcessed(payout_id.clone()));
            }
            None => {
                tracing::info!(payout_id = %payout_id, "Payout not found");
                return Err(ConfirmationError::NotFoundOrAlreadyProcessed(payout_id.clone()));
            }
        };

        let method = self.describe_method(payout.payout_method_id.as_deref()).await;
        let window = self.settings.load().window;

        let entry = PendingConfirmation {
            payout_id: payout.id.clone(),
            snapshot: PayoutSnapshot {
                amount: payout.amount,
                user_id: payout.user_id.clone(),
                payout_method_id: payout.payout_method_id.clone(),
            },
            created_at: self.clock.now(),
        };
        self.pending.put(entry).await?;
        self.refresh_pending_gauge().await;

        tracing::info!(
            payout_id = %payout_id,
            amount = %payout.amount,
            user_id = %payout.user_id,
            "Payout awaiting second step"
        );

        Ok(Outcome::AwaitingSecondStep {
            payout_id: payout.id.clone(),
            amount: payout.amount,
            user_id: payout.user_id,
            method,
            window,
            follow_up: format!("YES {}", payout.id),
        })
    }

    /// Step two: finalize a payout whose first step is still live.
    pub async fn confirm_final(
        &self,
        payout_id: &PayoutId,
        caller: i64,
    ) -> Result<Outcome, ConfirmationError> {
        self.authorize(caller)?;

        let now = self.clock.now();
        let window = self.settings.load().window;

        let entry = match self.pending.get(payout_id).await? {
            Some(entry) if entry.is_expired(now, window) => {
                self.pending.remove(payout_id).await?;
                self.refresh_pending_gauge().await;
                tracing::info!(payout_id = %payout_id, "Pending confirmation expired");
                return Err(ConfirmationError::ExpiredOrNotPending(payout_id.clone()));
            }
            Some(entry) => entry,
            None => return Err(ConfirmationError::ExpiredOrNotPending(payout_id.clone())),
        };

        let applied = self.payouts.mark_payout_success(payout_id, now).await?;
        if !applied {
            self.discard(payout_id).await;
            tracing::info!(payout_id = %payout_id, "Payout already processed by someone else");
            return Err(ConfirmationError::RaceLost(payout_id.clone()));
        }

        let snapshot = entry.snapshot;
        if let Err(e) = self.payouts.zero_wallet(&snapshot.user_id, now).await {
            self.discard(payout_id).await;
            metrics::record_partial_failure();
            tracing::error!(
                payout_id = %payout_id,
                user_id = %snapshot.user_id,
                error = %e,
                "Payout marked success but wallet update failed; manual fix required"
            );
            return Err(ConfirmationError::PartialFailure {
                payout_id: payout_id.clone(),
                user_id: snapshot.user_id,
                reason: e.to_string(),
            });
        }

        let audit = AdminLogEntry {
            action_type: ACTION_PAYOUT_CONFIRMATION.to_string(),
            operator_id: caller.to_string(),
            payout_id: payout_id.clone(),
            details: serde_json::json!({
                "amount": snapshot.amount,
                "user_id": snapshot.user_id,
                "payout_method_id": snapshot.payout_method_id,
            }),
            created_at: now,
        };
        let audit_logged = match self.payouts.insert_admin_log(audit).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(payout_id = %payout_id, error = %e, "Failed to write audit log");
                false
            }
        };

        self.discard(payout_id).await;

        tracing::info!(
            payout_id = %payout_id,
            amount = %snapshot.amount,
            user_id = %snapshot.user_id,
            operator_id = caller,
            "Payout confirmed"
        );

        Ok(Outcome::Confirmed {
            payout_id: payout_id.clone(),
            amount: snapshot.amount,
            user_id: snapshot.user_id,
            audit_logged,
        })
    }

    /// Live pending confirmations. Expired entries found here are dropped.
    pub async fn pending_snapshot(&self) -> StoreResult<Vec<PendingView>> {
        let now = self.clock.now();
        let window = self.settings.load().window;
        let mut live = Vec::new();

        for entry in self.pending.list().await? {
            if entry.is_expired(now, window) {
                self.pending.remove(&entry.payout_id).await?;
                continue;
            }
            let age_secs = (now - entry.created_at).num_seconds().max(0) as u64;
            let remaining_secs = entry.remaining(now, window).as_secs();
            live.push(PendingView {
                entry,
                age_secs,
                remaining_secs,
            });
        }

        self.refresh_pending_gauge().await;
        live.sort_by(|a, b| a.entry.created_at.cmp(&b.entry.created_at));
        Ok(live)
    }

    async fn describe_method(&self, method_id: Option<&str>) -> String {
        let Some(method_id) = method_id else {
            return "not set".to_string();
        };
        match self.payouts.fetch_payout_method(method_id).await {
            Ok(Some(method)) => method.masked(),
            Ok(None) => "unknown method".to_string(),
            Err(e) => {
                tracing::warn!(method_id, error = %e, "Payout method lookup failed");
                "unknown method".to_string()
            }
        }
    }

    /// Remove a pending entry after it has been consumed. A failure here only
    /// leaves a stale entry behind, which the datastore guard makes harmless.
    async fn discard(&self, payout_id: &PayoutId) {
        if let Err(e) = self.pending.remove(payout_id).await {
            tracing::warn!(payout_id = %payout_id, error = %e, "Failed to discard pending confirmation");
        }
        self.refresh_pending_gauge().await;
    }

    async fn refresh_pending_gauge(&self) {
        if let Ok(count) = self.pending.count().await {
            metrics::record_pending_confirmations(count);
        }
    }
}
