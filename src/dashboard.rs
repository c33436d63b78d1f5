//! Summary counters shown on the dashboard.

use crate::AppState;
use crate::api::error_response;
use crate::recipients::Recipient;
use crate::store::{EMAILS_SENT_COUNT_KEY, RECIPIENTS_KEY, Store, StoreError};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_recipients: usize,
    pub emails_sent: u64,
}

pub async fn dashboard(store: &Store) -> Result<DashboardStats, StoreError> {
    let guard = store.lock().await;
    let recipients: Vec<Recipient> = guard.load_or_init(RECIPIENTS_KEY, Vec::new()).await?;
    let emails_sent: u64 = guard.load_or_init(EMAILS_SENT_COUNT_KEY, 0).await?;

    Ok(DashboardStats {
        total_recipients: recipients.len(),
        emails_sent,
    })
}

/// Adds `count` to the sent counter and returns the new total.
pub async fn record_sent(store: &Store, count: u64) -> Result<u64, StoreError> {
    let total = store
        .update(EMAILS_SENT_COUNT_KEY, 0u64, |sent: &mut u64| {
            *sent = sent.saturating_add(count);
            Ok::<_, StoreError>(*sent)
        })
        .await?;

    info!("Recorded {} sent emails, {} in total", count, total);
    Ok(total)
}

pub async fn dashboard_handler(State(app_state): State<AppState>) -> Response {
    match dashboard(&app_state.store).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            error!("Failed to load dashboard: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}
