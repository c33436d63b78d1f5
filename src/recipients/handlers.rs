use super::{Recipient, RecipientError};
use crate::AppState;
use crate::api::error_response;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Serialize, Deserialize)]
pub struct RecipientListResponse {
    pub columns: Vec<String>,
    pub recipients: Vec<Recipient>,
}

#[derive(Deserialize)]
pub struct AddRecipientRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub fields: std::collections::BTreeMap<String, String>,
}

fn recipient_error_response(e: RecipientError) -> Response {
    match &e {
        RecipientError::Import(_) => {
            warn!("CSV import rejected: {}", e);
            error_response(StatusCode::UNPROCESSABLE_ENTITY, "import_failed", e.to_string())
        }
        RecipientError::EmptyEmail => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, "invalid_recipient", e.to_string())
        }
        RecipientError::Duplicate(_) => {
            error_response(StatusCode::CONFLICT, "duplicate_recipient", e.to_string())
        }
        RecipientError::NotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "not_found", e.to_string())
        }
        RecipientError::Store(_) => {
            error!("Recipient store error: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub async fn list_recipients_handler(State(app_state): State<AppState>) -> Response {
    match super::list_recipients(&app_state.store).await {
        Ok(recipients) => Json(RecipientListResponse {
            columns: super::display_columns(&recipients),
            recipients,
        })
        .into_response(),
        Err(e) => recipient_error_response(e),
    }
}

pub async fn import_recipients_handler(State(app_state): State<AppState>, body: String) -> Response {
    match super::import_csv(&app_state.store, &body).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => recipient_error_response(e),
    }
}

pub async fn add_recipient_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<AddRecipientRequest>,
) -> Response {
    let fields = payload.fields.into_iter().collect();
    match super::add_recipient(&app_state.store, &payload.email, fields).await {
        Ok(recipient) => (StatusCode::CREATED, Json(recipient)).into_response(),
        Err(e) => recipient_error_response(e),
    }
}

pub async fn delete_recipient_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match super::delete_recipient(&app_state.store, &id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => recipient_error_response(e),
    }
}
