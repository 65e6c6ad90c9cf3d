use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::confirmation::PendingView;
use crate::http::server::AppState;
use crate::store::PayoutId;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub datastore: String,
    pub confirmation_window_secs: u64,
}

#[derive(Serialize)]
pub struct AnnounceResult {
    pub payout_id: PayoutId,
    pub delivered: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let datastore = match state.inner.protocol.payouts().ping().await {
        Ok(()) => "reachable".to_string(),
        Err(e) => format!("unreachable: {}", e),
    };

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        datastore,
        confirmation_window_secs: state.inner.protocol.settings().window.as_secs(),
    })
}

pub async fn get_pending(State(state): State<AppState>) -> impl IntoResponse {
    match state.inner.protocol.pending_snapshot().await {
        Ok(pending) => (StatusCode::OK, Json::<Vec<PendingView>>(pending)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list pending confirmations");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to list pending confirmations").into_response()
        }
    }
}

/// Tell the operator a withdrawal is waiting, with the command that starts confirming it.
pub async fn announce_payout(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let payout_id = PayoutId::new(id);

    let payout = match state.inner.protocol.payouts().fetch_payout(&payout_id).await {
        Ok(Some(p)) if p.is_pending() => p,
        Ok(_) => return (StatusCode::NOT_FOUND, "Payout not found or not pending").into_response(),
        Err(e) => {
            tracing::error!(payout_id = %payout_id, error = %e, "Payout lookup failed");
            return (StatusCode::BAD_GATEWAY, "Datastore unavailable").into_response();
        }
    };

    let text = format!(
        "*New payout request*\nPayout `{}`\nAmount: {}\nUser: `{}`\n\nSend `/confirm_payout {}` to start confirmation.",
        payout.id, payout.amount, payout.user_id, payout.id
    );
    let operator = state.inner.protocol.settings().operator_id;

    match state.inner.messenger.send_message(operator, &text).await {
        Ok(()) => {
            tracing::info!(payout_id = %payout_id, "Payout announced to operator");
            (
                StatusCode::OK,
                Json(AnnounceResult {
                    payout_id,
                    delivered: true,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(payout_id = %payout_id, error = %e, "Failed to announce payout");
            (
                StatusCode::BAD_GATEWAY,
                Json(AnnounceResult {
                    payout_id,
                    delivered: false,
                }),
            )
                .into_response()
        }
    }
}
