//! Batch-sending preferences and the default schedule time.
//!
//! These are stored for the compose flow; nothing in this crate sends or
//! schedules mail.

use crate::AppState;
use crate::api::error_response;
use crate::store::{BATCH_SETTINGS_KEY, DEFAULT_SCHEDULE_TIME_KEY, Store, StoreError};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

pub const DEFAULT_SCHEDULE_TIME: &str = "09:00";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Batch size must be at least 1")]
    InvalidBatchSize,

    #[error("Batch interval must be at least 1 minute")]
    InvalidInterval,

    #[error("Invalid schedule time '{0}', expected HH:MM")]
    InvalidScheduleTime(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSettings {
    pub enabled: bool,
    pub batch_size: u32,
    pub interval_minutes: u32,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            batch_size: 100,
            interval_minutes: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub default_schedule_time: String,
    pub batch: BatchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_schedule_time: DEFAULT_SCHEDULE_TIME.to_string(),
            batch: BatchSettings::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.batch.batch_size == 0 {
            return Err(SettingsError::InvalidBatchSize);
        }
        if self.batch.interval_minutes == 0 {
            return Err(SettingsError::InvalidInterval);
        }
        NaiveTime::parse_from_str(&self.default_schedule_time, "%H:%M")
            .map_err(|_| SettingsError::InvalidScheduleTime(self.default_schedule_time.clone()))?;
        Ok(())
    }
}

/// Both keys are read under one lock so a concurrent save is never half seen.
pub async fn load_settings(store: &Store) -> Result<Settings, SettingsError> {
    let guard = store.lock().await;
    let default_schedule_time = guard
        .load_or_init(DEFAULT_SCHEDULE_TIME_KEY, DEFAULT_SCHEDULE_TIME.to_string())
        .await?;
    let batch = guard
        .load_or_init(BATCH_SETTINGS_KEY, BatchSettings::default())
        .await?;

    Ok(Settings {
        default_schedule_time,
        batch,
    })
}

pub async fn save_settings(store: &Store, settings: &Settings) -> Result<(), SettingsError> {
    settings.validate()?;
    let guard = store.lock().await;
    guard
        .save(DEFAULT_SCHEDULE_TIME_KEY, &settings.default_schedule_time)
        .await?;
    guard.save(BATCH_SETTINGS_KEY, &settings.batch).await?;
    drop(guard);
    info!(
        "Settings saved: schedule time {}, batch sending {}",
        settings.default_schedule_time,
        if settings.batch.enabled { "on" } else { "off" }
    );
    Ok(())
}

fn settings_error_response(e: SettingsError) -> Response {
    match &e {
        SettingsError::Store(_) => {
            error!("Settings store error: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        _ => error_response(StatusCode::UNPROCESSABLE_ENTITY, "invalid_settings", e.to_string()),
    }
}

pub async fn get_settings_handler(State(app_state): State<AppState>) -> Response {
    match load_settings(&app_state.store).await {
        Ok(settings) => Json(settings).into_response(),
        Err(e) => settings_error_response(e),
    }
}

pub async fn update_settings_handler(
    State(app_state): State<AppState>,
    Json(settings): Json<Settings>,
) -> Response {
    match save_settings(&app_state.store, &settings).await {
        Ok(()) => Json(settings).into_response(),
        Err(e) => settings_error_response(e),
    }
}
