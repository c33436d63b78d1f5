use super::{OptimizationRequest, OptimizerError};
use crate::AppState;
use crate::api::error_response;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

const OPTIMIZATION_FAILED: &str = "optimization_failed";

pub async fn optimize_handler(
    State(app_state): State<AppState>,
    Json(request): Json<OptimizationRequest>,
) -> Response {
    let Some(optimizer) = &app_state.optimizer else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            OPTIMIZATION_FAILED,
            "Content optimizer is not configured",
        );
    };

    match optimizer.optimize(&request).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => optimizer_error_response(e),
    }
}

fn optimizer_error_response(e: OptimizerError) -> Response {
    if e.is_validation() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, OPTIMIZATION_FAILED, e.to_string());
    }

    error!("Content optimization failed: {}", e);
    error_response(
        StatusCode::BAD_GATEWAY,
        OPTIMIZATION_FAILED,
        format!("Failed to optimize content: {}", e),
    )
}
