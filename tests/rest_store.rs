//! RestPayoutStore against a mock PostgREST server.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use payout_relay::config::DatastoreConfig;
use payout_relay::confirmation::{InMemoryPendingStore, PayoutConfirmation, ProtocolSettings};
use payout_relay::store::{
    AdminLogEntry, PayoutId, PayoutStatus, PayoutStore, RestPayoutStore, StoreError, UserId,
};

mod common;

const SERVICE_KEY: &str = "svc-key";

#[derive(Default)]
struct MockDb {
    tables: HashMap<String, Vec<Value>>,
}

type Db = Arc<Mutex<MockDb>>;

fn filters(params: &HashMap<String, String>) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(k, v)| v.strip_prefix("eq.").map(|v| (k.clone(), v.to_string())))
        .collect()
}

fn matches(row: &Value, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(k, v)| row.get(k).and_then(|x| x.as_str()) == Some(v.as_str()))
}

fn authorized(headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers.get("authorization").and_then(|v| v.to_str().ok());
    apikey == Some(SERVICE_KEY) && bearer == Some("Bearer svc-key")
}

async fn select(
    State(db): State<Db>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, r#"{"message":"Invalid API key"}"#).into_response();
    }
    let filters = filters(&params);
    let db = db.lock().unwrap();
    let rows: Vec<Value> = db
        .tables
        .get(&table)
        .map(|rows| rows.iter().filter(|r| matches(r, &filters)).cloned().collect())
        .unwrap_or_default();
    Json(rows).into_response()
}

async fn update(
    State(db): State<Db>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let filters = filters(&params);
    let mut db = db.lock().unwrap();

    // PostgREST refuses a PATCH naming a column the table does not have.
    let known = db.tables.get(&table).and_then(|rows| rows.first()).and_then(|r| r.as_object());
    if let (Some(known), Some(changes)) = (known, patch.as_object()) {
        if let Some(column) = changes.keys().find(|k| !known.contains_key(*k)) {
            let message = format!(
                "Could not find the '{}' column of '{}' in the schema cache",
                column, table
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"code": "PGRST204", "message": message})),
            )
                .into_response();
        }
    }

    let mut updated = Vec::new();
    if let Some(rows) = db.tables.get_mut(&table) {
        for row in rows.iter_mut().filter(|r| matches(r, &filters)) {
            if let (Some(obj), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
                for (k, v) in changes {
                    obj.insert(k.clone(), v.clone());
                }
            }
            updated.push(row.clone());
        }
    }
    Json(updated).into_response()
}

async fn insert(
    State(db): State<Db>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(row): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    db.lock().unwrap().tables.entry(table).or_default().push(row);
    StatusCode::CREATED.into_response()
}

async fn start_mock_postgrest() -> (String, Db) {
    let mut db = MockDb::default();
    db.tables.insert(
        "payouts".into(),
        vec![
            json!({"id": "p-1", "user_id": "u-1", "amount": 1200.5, "status": "pending",
                   "payout_method_id": "m-1", "processed_at": null}),
            json!({"id": "p-done", "user_id": "u-2", "amount": 10, "status": "success",
                   "payout_method_id": null, "processed_at": "2026-01-01T00:00:00Z"}),
        ],
    );
    db.tables.insert(
        "payout_methods".into(),
        vec![json!({"id": "m-1", "method_type": "bank", "account_identifier": "000111222333"})],
    );
    db.tables.insert(
        "wallet".into(),
        vec![json!({"user_id": "u-1", "balance": 1200.5})],
    );
    let db = Arc::new(Mutex::new(db));

    let app = Router::new()
        .route("/rest/v1/{table}", get(select).patch(update).post(insert))
        .with_state(db.clone());
    let addr = common::spawn_router(app).await;
    (format!("http://{}", addr), db)
}

fn store_for(url: &str, key: &str) -> RestPayoutStore {
    RestPayoutStore::new(&DatastoreConfig {
        rest_url: url.to_string(),
        service_key: key.to_string(),
        timeout_secs: 2,
        ..DatastoreConfig::default()
    })
    .unwrap()
}

fn row(db: &Db, table: &str, key: &str, value: &str) -> Value {
    db.lock().unwrap().tables[table]
        .iter()
        .find(|r| r[key] == value)
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn test_fetch_payout_and_method() {
    let (url, _) = start_mock_postgrest().await;
    let store = store_for(&url, SERVICE_KEY);

    let payout = store.fetch_payout(&PayoutId::new("p-1")).await.unwrap().unwrap();
    assert_eq!(payout.status, PayoutStatus::Pending);
    assert_eq!(payout.user_id, UserId::new("u-1"));
    assert_eq!(payout.amount, common::dec("1200.5"));

    assert!(store.fetch_payout(&PayoutId::new("nope")).await.unwrap().is_none());

    let method = store.fetch_payout_method("m-1").await.unwrap().unwrap();
    assert_eq!(method.masked(), "BANK ********2333");

    store.ping().await.unwrap();
}

#[tokio::test]
async fn test_conditional_update_over_rest() {
    let (url, db) = start_mock_postgrest().await;
    let store = store_for(&url, SERVICE_KEY);
    let id = PayoutId::new("p-1");

    assert!(store.mark_payout_success(&id, Utc::now()).await.unwrap());
    assert!(!store.mark_payout_success(&id, Utc::now()).await.unwrap());
    assert!(!store.mark_payout_success(&PayoutId::new("p-done"), Utc::now()).await.unwrap());

    let stored = row(&db, "payouts", "id", "p-1");
    assert_eq!(stored["status"], "success");
    assert!(stored["processed_at"].is_string());
}

#[tokio::test]
async fn test_wallet_and_audit_writes() {
    let (url, db) = start_mock_postgrest().await;
    let store = store_for(&url, SERVICE_KEY);

    store.zero_wallet(&UserId::new("u-1"), Utc::now()).await.unwrap();
    let wallet = row(&db, "wallet", "user_id", "u-1");
    assert_eq!(wallet["balance"], 0);
    assert_eq!(wallet.as_object().unwrap().len(), 2);

    let err = store.zero_wallet(&UserId::new("ghost"), Utc::now()).await.unwrap_err();
    assert!(matches!(err, StoreError::Missing(_)));

    store
        .insert_admin_log(AdminLogEntry {
            action_type: "payout_confirmation".into(),
            operator_id: "42".into(),
            payout_id: PayoutId::new("p-1"),
            details: json!({"amount": "1200.5"}),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    let log = row(&db, "admin_logs", "payout_id", "p-1");
    assert_eq!(log["action_type"], "payout_confirmation");
    assert_eq!(log["operator_id"], "42");
}

#[tokio::test]
async fn test_unknown_column_is_rejected_by_datastore() {
    let (url, _) = start_mock_postgrest().await;
    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let res = client
        .patch(format!("{}/rest/v1/wallet?user_id=eq.u-1", url))
        .header("apikey", SERVICE_KEY)
        .header("authorization", "Bearer svc-key")
        .json(&json!({"balance": 0, "updated_at": "2026-01-01T00:00:00Z"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "PGRST204");
}

#[tokio::test]
async fn test_bad_key_surfaces_status() {
    let (url, _) = start_mock_postgrest().await;
    let store = store_for(&url, "wrong-key");

    match store.fetch_payout(&PayoutId::new("p-1")).await {
        Err(StoreError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("Invalid API key"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_datastore() {
    let store = store_for("http://127.0.0.1:9", SERVICE_KEY);
    assert!(matches!(
        store.ping().await,
        Err(StoreError::Http(_)) | Err(StoreError::Timeout(_))
    ));
}

#[tokio::test]
async fn test_protocol_over_rest_store() {
    let (url, db) = start_mock_postgrest().await;
    let protocol = PayoutConfirmation::new(
        ProtocolSettings {
            operator_id: common::OPERATOR,
            window: Duration::from_secs(600),
        },
        Arc::new(store_for(&url, SERVICE_KEY)),
        Arc::new(InMemoryPendingStore::new()),
    );

    let reply = protocol.handle("/confirm_payout p-1", common::OPERATOR).await;
    assert!(reply.contains("BANK ********2333"), "reply was: {}", reply);

    let reply = protocol.handle("YES p-1", common::OPERATOR).await;
    assert!(reply.contains("confirmed"), "reply was: {}", reply);

    assert_eq!(row(&db, "payouts", "id", "p-1")["status"], "success");
    assert_eq!(row(&db, "wallet", "user_id", "u-1")["balance"], 0);
    let log = row(&db, "admin_logs", "payout_id", "p-1");
    assert_eq!(log["operator_id"], common::OPERATOR.to_string());
}
