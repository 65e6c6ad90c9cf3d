//! Datastore record types and error definitions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of a payout row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayoutId(pub String);

impl PayoutId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the user owning a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payout lifecycle status.
///
/// A payout leaves `Pending` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Success,
    Failed,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Success => "success",
            PayoutStatus::Failed => "failed",
        }
    }
}

/// A row of the `payouts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub id: PayoutId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub status: PayoutStatus,
    #[serde(default)]
    pub payout_method_id: Option<String>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

impl Payout {
    pub fn is_pending(&self) -> bool {
        self.status == PayoutStatus::Pending
    }
}

/// A row of the `payout_methods` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutMethod {
    pub id: String,
    /// e.g. "upi" or "bank".
    pub method_type: String,
    /// Account number, UPI handle, or similar. Never logged in full.
    pub account_identifier: String,
}

impl PayoutMethod {
    /// Human-readable detail with everything but the last four characters hidden.
    pub fn masked(&self) -> String {
        format!("{} {}", self.method_type.to_uppercase(), mask_identifier(&self.account_identifier))
    }
}

/// Mask all but the last four characters of an account identifier.
pub fn mask_identifier(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

/// A row of the `admin_logs` audit table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminLogEntry {
    pub action_type: String,
    pub operator_id: String,
    pub payout_id: PayoutId,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Errors that can occur while talking to the datastore.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure.
    #[error("datastore request failed: {0}")]
    Http(String),

    /// Datastore answered with a non-success status.
    #[error("datastore returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape.
    #[error("failed to decode datastore response: {0}")]
    Decode(String),

    /// Request exceeded the configured timeout.
    #[error("datastore timeout after {0} seconds")]
    Timeout(u64),

    /// A row the operation depends on does not exist.
    #[error("missing {0}")]
    Missing(String),
}

/// Result type for datastore operations.
pub type StoreResult<T> = Result<T, StoreError>;
