use crate::Config;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create data directory: {0}")]
    DataDirectoryCreationFailed(#[from] std::io::Error),

    #[error("Data directory is not a directory: {0}")]
    DataDirectoryNotADirectory(String),

    #[error("Content optimizer is not configured")]
    OptimizerNotConfigured,

    #[error("Content optimizer has no API key")]
    OptimizerApiKeyMissing,

    #[error("Invalid optimizer base URL '{0}': {1}")]
    InvalidOptimizerUrl(String, url::ParseError),
}

impl StartupCheckError {
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            StartupCheckError::DataDirectoryCreationFailed(_)
                | StartupCheckError::DataDirectoryNotADirectory(_)
                | StartupCheckError::InvalidOptimizerUrl(..)
        )
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    let data_dir = Path::new(&config.store.data_directory);
    if !data_dir.exists() {
        info!("Data directory does not exist, creating: {:?}", data_dir);
        if let Err(e) = tokio::fs::create_dir_all(data_dir).await {
            error!("Failed to create data directory: {}", e);
            errors.push(StartupCheckError::DataDirectoryCreationFailed(e));
        }
    } else if !data_dir.is_dir() {
        errors.push(StartupCheckError::DataDirectoryNotADirectory(
            data_dir.display().to_string(),
        ));
    } else {
        info!("Data directory exists: {:?}", data_dir);
    }

    match &config.optimizer {
        None => {
            warn!("No [optimizer] section, content optimization is disabled");
            errors.push(StartupCheckError::OptimizerNotConfigured);
        }
        Some(optimizer) => {
            if let Err(e) = url::Url::parse(optimizer.base_url()) {
                errors.push(StartupCheckError::InvalidOptimizerUrl(
                    optimizer.base_url().to_string(),
                    e,
                ));
            }
            if !optimizer.has_api_key() {
                warn!("Optimizer API key missing, content optimization is disabled");
                errors.push(StartupCheckError::OptimizerApiKeyMissing);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
