//! Protocol results and error definitions.

use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

use crate::store::{PayoutId, StoreError, UserId};

/// Why a command did not take effect.
#[derive(Debug, Error)]
pub enum ConfirmationError {
    /// Sender is not the configured operator.
    #[error("unauthorized sender {0}")]
    Unauthorized(i64),

    /// Payout missing or not `pending` at lookup time.
    #[error("payout {0} not found or already processed")]
    NotFoundOrAlreadyProcessed(PayoutId),

    /// No live first-step entry for this payout.
    #[error("no pending confirmation for payout {0} (expired or not found)")]
    ExpiredOrNotPending(PayoutId),

    /// The conditional update affected zero rows.
    #[error("payout {0} was already processed")]
    RaceLost(PayoutId),

    /// Payout marked success but the wallet write failed.
    #[error("payout {payout_id} marked success but wallet update for user {user_id} failed: {reason}")]
    PartialFailure {
        payout_id: PayoutId,
        user_id: UserId,
        reason: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ConfirmationError {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            ConfirmationError::Unauthorized(_) => "unauthorized",
            ConfirmationError::NotFoundOrAlreadyProcessed(_) => "not_found",
            ConfirmationError::ExpiredOrNotPending(_) => "expired",
            ConfirmationError::RaceLost(_) => "race_lost",
            ConfirmationError::PartialFailure { .. } => "partial_failure",
            ConfirmationError::Store(_) => "store_error",
        }
    }

    /// Text sent back to the operator.
    pub fn reply_text(&self) -> String {
        match self {
            ConfirmationError::Unauthorized(_) => {
                "Unauthorized. This bot only accepts commands from the payout operator.".to_string()
            }
            ConfirmationError::NotFoundOrAlreadyProcessed(id) => {
                format!("Payout `{}` not found or already processed.", id)
            }
            ConfirmationError::ExpiredOrNotPending(id) => format!(
                "No pending confirmation for payout `{}` (expired or never requested).\nSend `/confirm_payout {}` first.",
                id, id
            ),
            ConfirmationError::RaceLost(id) => format!("Payout `{}` was already processed.", id),
            ConfirmationError::PartialFailure {
                payout_id,
                user_id,
                reason,
            } => format!(
                "WARNING: INCONSISTENT STATE\nPayout `{}` is marked *success* but the wallet update for user `{}` FAILED.\nReason: {}\nFix the wallet manually; do not confirm again.",
                payout_id,
                user_id,
                code_span(reason)
            ),
            ConfirmationError::Store(e) => format!("Datastore error: {}", code_span(&e.to_string())),
        }
    }
}

/// What a successful command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Step one accepted.
    AwaitingSecondStep {
        payout_id: PayoutId,
        amount: Decimal,
        user_id: UserId,
        method: String,
        window: Duration,
        follow_up: String,
    },
    /// Step two applied.
    Confirmed {
        payout_id: PayoutId,
        amount: Decimal,
        user_id: UserId,
        audit_logged: bool,
    },
    Usage,
}

impl Outcome {
    /// Text sent back to the operator.
    pub fn reply_text(&self) -> String {
        match self {
            Outcome::AwaitingSecondStep {
                payout_id,
                amount,
                user_id,
                method,
                window,
                follow_up,
            } => format!(
                "*Confirm payout* `{}`\nAmount: {}\nUser: `{}`\nMethod: `{}`\n\nReply `{}` within {} to mark it paid.",
                payout_id,
                amount,
                user_id,
                method,
                follow_up,
                describe_window(*window)
            ),
            Outcome::Confirmed {
                payout_id,
                amount,
                user_id,
                audit_logged,
            } => {
                let mut text = format!(
                    "Payout `{}` confirmed.\nAmount {} marked paid; wallet for user `{}` cleared.",
                    payout_id, amount, user_id
                );
                if !audit_logged {
                    text.push_str("\nWARNING: the audit log entry could not be written.");
                }
                text
            }
            Outcome::Usage => crate::confirmation::command::USAGE.to_string(),
        }
    }
}

/// Wrap free text (datastore error bodies) in a Markdown code span.
///
/// `_` and `*` are literal inside a span; a backtick would close it early.
fn code_span(text: &str) -> String {
    format!("`{}`", text.replace('`', "'"))
}

fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    match secs {
        60 => "1 minute".to_string(),
        s if s % 60 == 0 => format!("{} minutes", s / 60),
        s => format!("{} seconds", s),
    }
}
