use super::{EmailTemplate, TemplateDraft, TemplateError};
use crate::AppState;
use crate::api::error_response;
use crate::recipients;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;

fn template_error_response(e: TemplateError) -> Response {
    match &e {
        TemplateError::MissingField(_) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, "invalid_template", e.to_string())
        }
        TemplateError::NotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "not_found", e.to_string())
        }
        TemplateError::Store(_) => {
            error!("Template store error: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub async fn list_templates_handler(State(app_state): State<AppState>) -> Response {
    match super::list_templates(&app_state.store).await {
        Ok(templates) => Json::<Vec<EmailTemplate>>(templates).into_response(),
        Err(e) => template_error_response(e),
    }
}

pub async fn create_template_handler(
    State(app_state): State<AppState>,
    Json(draft): Json<TemplateDraft>,
) -> Response {
    match super::create_template(&app_state.store, draft).await {
        Ok(template) => (StatusCode::CREATED, Json(template)).into_response(),
        Err(e) => template_error_response(e),
    }
}

pub async fn update_template_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<TemplateDraft>,
) -> Response {
    match super::update_template(&app_state.store, &id, draft).await {
        Ok(template) => Json(template).into_response(),
        Err(e) => template_error_response(e),
    }
}

pub async fn delete_template_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match super::delete_template(&app_state.store, &id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => template_error_response(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    pub template_id: Option<String>,
    pub recipient_id: Option<String>,
}

/// Personalizes a subject/body pair (or a stored template) for one recipient.
pub async fn preview_handler(
    State(app_state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> Response {
    let (subject, body) = match &request.template_id {
        Some(template_id) => match super::get_template(&app_state.store, template_id).await {
            Ok(template) => (template.subject, template.body),
            Err(e) => return template_error_response(e),
        },
        None => (request.subject, request.body),
    };

    let recipient = match &request.recipient_id {
        Some(recipient_id) => match recipients::list_recipients(&app_state.store).await {
            Ok(all) => match all.into_iter().find(|r| &r.id == recipient_id) {
                Some(recipient) => Some(recipient),
                None => {
                    return error_response(
                        StatusCode::NOT_FOUND,
                        "not_found",
                        format!("Recipient not found: {}", recipient_id),
                    );
                }
            },
            Err(e) => {
                error!("Failed to load recipients for preview: {}", e);
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    e.to_string(),
                );
            }
        },
        None => None,
    };

    Json(super::preview(&subject, &body, recipient.as_ref())).into_response()
}
