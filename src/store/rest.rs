//! Datastore client for the managed backend's REST interface.
//!
//! # Responsibilities
//! - Talk to the PostgREST-style `/rest/v1/{table}` endpoints
//! - Express the conditional `pending → success` update as a filtered PATCH
//! - Map transport, status and decode failures into `StoreError`
//!
//! The service key grants row-level-security bypass; it is never logged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use url::Url;

use crate::config::DatastoreConfig;
use crate::store::types::{
    AdminLogEntry, Payout, PayoutId, PayoutMethod, StoreError, StoreResult, UserId,
};
use crate::store::PayoutStore;

const PAYOUTS: &str = "payouts";
const PAYOUT_METHODS: &str = "payout_methods";
const WALLET: &str = "wallet";
const ADMIN_LOGS: &str = "admin_logs";

/// REST-backed payout store.
#[derive(Clone)]
pub struct RestPayoutStore {
    client: Client,
    base_url: Url,
    service_key: String,
    timeout_secs: u64,
}

impl RestPayoutStore {
    /// Create a new store from configuration.
    pub fn new(config: &DatastoreConfig) -> StoreResult<Self> {
        let mut raw = config.rest_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url: Url = raw.parse().map_err(|e| {
            StoreError::Http(format!("Invalid datastore URL '{}': {}", config.rest_url, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;

        tracing::info!(rest_url = %base_url, "Datastore client initialized");

        Ok(Self {
            client,
            base_url,
            service_key: config.service_key.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn request(&self, method: Method, table: &str) -> StoreResult<RequestBuilder> {
        let url = self
            .base_url
            .join(&format!("rest/v1/{}", table))
            .map_err(|e| StoreError::Http(e.to_string()))?;

        Ok(self
            .client
            .request(method, url)
            .header("apikey", &self.service_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.service_key)))
    }

    async fn send(&self, builder: RequestBuilder) -> StoreResult<Response> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_rows<T: DeserializeOwned>(&self, builder: RequestBuilder) -> StoreResult<Vec<T>> {
        let response = self.send(builder).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.timeout_secs)
        } else {
            StoreError::Http(e.to_string())
        }
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl PayoutStore for RestPayoutStore {
    async fn fetch_payout(&self, id: &PayoutId) -> StoreResult<Option<Payout>> {
        let builder = self
            .request(Method::GET, PAYOUTS)?
            .query(&[("id", eq(id.as_str())), ("select", "*".to_string())]);

        let rows: Vec<Payout> = self.send_rows(builder).await?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_payout_method(&self, id: &str) -> StoreResult<Option<PayoutMethod>> {
        let builder = self
            .request(Method::GET, PAYOUT_METHODS)?
            .query(&[("id", eq(id)), ("select", "*".to_string())]);

        let rows: Vec<PayoutMethod> = self.send_rows(builder).await?;
        Ok(rows.into_iter().next())
    }

    async fn mark_payout_success(&self, id: &PayoutId, at: DateTime<Utc>) -> StoreResult<bool> {
        let builder = self
            .request(Method::PATCH, PAYOUTS)?
            .query(&[("id", eq(id.as_str())), ("status", eq("pending"))])
            .header("Prefer", "return=representation")
            .json(&json!({
                "status": "success",
                "processed_at": at,
            }));

        let rows: Vec<serde_json::Value> = self.send_rows(builder).await?;
        tracing::debug!(payout_id = %id, rows = rows.len(), "Conditional payout update");
        Ok(!rows.is_empty())
    }

    // Only `balance` is part of the wallet table's contract; PostgREST rejects
    // the whole PATCH when any named column is missing.
    async fn zero_wallet(&self, user_id: &UserId, _at: DateTime<Utc>) -> StoreResult<()> {
        let builder = self
            .request(Method::PATCH, WALLET)?
            .query(&[("user_id", eq(user_id.as_str()))])
            .header("Prefer", "return=representation")
            .json(&json!({ "balance": 0 }));

        let rows: Vec<serde_json::Value> = self.send_rows(builder).await?;
        if rows.is_empty() {
            return Err(StoreError::Missing(format!("wallet for user {}", user_id)));
        }
        Ok(())
    }

    async fn insert_admin_log(&self, entry: AdminLogEntry) -> StoreResult<()> {
        let builder = self
            .request(Method::POST, ADMIN_LOGS)?
            .header("Prefer", "return=minimal")
            .json(&entry);

        self.send(builder).await?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let builder = self
            .request(Method::GET, PAYOUTS)?
            .query(&[("select", "id"), ("limit", "1")]);

        self.send(builder).await?;
        Ok(())
    }
}
