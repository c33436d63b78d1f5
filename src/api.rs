use crate::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

pub fn error_response(status: StatusCode, kind: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: kind.to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    name: String,
}

pub async fn health_handler(State(app_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: app_state.config.app.name.clone(),
    })
}
