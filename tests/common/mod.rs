//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use payout_relay::store::{InMemoryPayoutStore, Payout, PayoutId, PayoutMethod, PayoutStatus, UserId};

pub const OPERATOR: i64 = 424242;
pub const STRANGER: i64 = 777;

/// A message the relay sent to the mock Bot API.
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub parse_mode: Option<String>,
}

pub struct MockTelegram {
    pub addr: SocketAddr,
    pub sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl MockTelegram {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Poll until `count` messages arrived or a second passed.
    pub async fn wait_for(&self, count: usize) -> Vec<SentMessage> {
        for _ in 0..50 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.sent()
    }
}

/// Rough legacy-Markdown entity check: outside code spans, `_` and `*`
/// must pair up, and every code span must be closed.
fn legacy_markdown_parses(text: &str) -> bool {
    let mut in_code = false;
    let (mut underscores, mut stars) = (0, 0);
    for c in text.chars() {
        match c {
            '`' => in_code = !in_code,
            '_' if !in_code => underscores += 1,
            '*' if !in_code => stars += 1,
            _ => {}
        }
    }
    !in_code && underscores % 2 == 0 && stars % 2 == 0
}

/// Accepted messages are recorded; unparseable Markdown is refused the way
/// the Bot API does it.
async fn send_message(
    State(sent): State<Arc<Mutex<Vec<SentMessage>>>>,
    Json(message): Json<SentMessage>,
) -> (StatusCode, Json<Value>) {
    if message.parse_mode.as_deref() == Some("Markdown") && !legacy_markdown_parses(&message.text) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: can't parse entities: Can't find end of the entity"
            })),
        );
    }
    sent.lock().unwrap().push(message);
    (StatusCode::OK, Json(json!({"ok": true, "result": {"message_id": 1}})))
}

/// Start a mock Telegram Bot API that records every `sendMessage`.
pub async fn start_mock_telegram() -> MockTelegram {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/{bot}/sendMessage", post(send_message))
        .with_state(sent.clone());

    let addr = spawn_router(app).await;
    MockTelegram { addr, sent }
}

/// Serve a router on an ephemeral local port.
pub async fn spawn_router(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

pub fn payout(id: &str, user: &str, amount: &str, status: PayoutStatus) -> Payout {
    Payout {
        id: PayoutId::new(id),
        user_id: UserId::new(user),
        amount: dec(amount),
        status,
        payout_method_id: Some(format!("m-{}", user)),
        processed_at: None,
    }
}

/// Store with two pending payouts, one already paid, and funded wallets.
pub fn seeded_store() -> InMemoryPayoutStore {
    let store = InMemoryPayoutStore::new();
    store.insert_payout(payout("p-1", "u-1", "1200.00", PayoutStatus::Pending));
    store.insert_payout(payout("p-2", "u-2", "300.50", PayoutStatus::Pending));
    store.insert_payout(payout("p-done", "u-3", "99.00", PayoutStatus::Success));
    for user in ["u-1", "u-2", "u-3"] {
        store.insert_method(PayoutMethod {
            id: format!("m-{}", user),
            method_type: "upi".into(),
            account_identifier: format!("{}-handle@okbank", user),
        });
    }
    store.set_wallet_balance(UserId::new("u-1"), dec("1200.00"));
    store.set_wallet_balance(UserId::new("u-2"), dec("300.50"));
    store.set_wallet_balance(UserId::new("u-3"), Decimal::ZERO);
    store
}

/// A Bot API update carrying a text message.
pub fn text_update(update_id: i64, sender: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "date": 1_700_000_000,
            "chat": {"id": sender, "type": "private"},
            "from": {"id": sender, "is_bot": false, "first_name": "Test"},
            "text": text
        }
    })
}
