//! Telegram webhook endpoint.
//!
//! Telegram redelivers any update that is not answered with 2xx, so once an
//! update is accepted the handler answers 200 even when the reply could not be
//! sent. A redelivered `YES` would otherwise be processed twice.
//!
//! Sender ids in the body are only trusted behind the secret token; with no
//! secret configured every update is refused.
//!
//! The command and its reply run on a detached task. Dropping the request
//! future (client disconnect, server timeout) must not stop a confirmation
//! between its datastore writes, or the partial-failure report is lost.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::telegram::Update;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

pub async fn telegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let request_id = request_id(&headers);

    let expected_secret = state.inner.config.load().telegram.webhook_secret.clone();
    if expected_secret.is_empty() {
        tracing::error!(request_id = %request_id, "Webhook secret not configured; refusing update");
        return StatusCode::FORBIDDEN;
    }
    let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if presented != Some(expected_secret.as_str()) {
        tracing::warn!(request_id = %request_id, "Webhook call with bad secret token");
        return StatusCode::FORBIDDEN;
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Undecodable webhook body");
            return StatusCode::BAD_REQUEST;
        }
    };

    let Some(message) = update.command_message() else {
        tracing::debug!(request_id = %request_id, update_id = update.update_id, "Ignoring non-message update");
        return StatusCode::OK;
    };
    let Some(text) = message.text.as_deref() else {
        tracing::debug!(request_id = %request_id, update_id = update.update_id, "Ignoring message without text");
        return StatusCode::OK;
    };

    let caller = message.sender_id();
    let chat_id = message.chat.id;
    let text = text.to_owned();

    tracing::info!(
        request_id = %request_id,
        update_id = update.update_id,
        caller,
        "Operator command received"
    );

    let task = tokio::spawn(async move {
        let reply = state.inner.protocol.handle(&text, caller).await;

        if let Err(e) = state.inner.messenger.send_message(chat_id, &reply).await {
            tracing::error!(request_id = %request_id, chat_id, error = %e, "Failed to send reply");
        }
    });

    if let Err(e) = task.await {
        tracing::error!(error = %e, "Command task did not complete");
    }

    StatusCode::OK
}
