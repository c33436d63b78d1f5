use thiserror::Error;

/// Everything that can make an optimization request fail.
///
/// `Validation` is raised before the provider is contacted; every other
/// variant is a provider-side failure.
#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Missing required field: {field}")]
    Validation { field: String },

    #[error("Provider returned no structured output")]
    NoOutput,

    #[error("Provider output is invalid: {0}")]
    InvalidOutput(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({error_type}): {message}")]
    Api { error_type: String, message: String },

    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("Optimizer configuration error: {0}")]
    ConfigError(String),
}

impl OptimizerError {
    pub fn is_validation(&self) -> bool {
        matches!(self, OptimizerError::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_names_the_field() {
        let err = OptimizerError::Validation {
            field: "campaignGoal".to_string(),
        };
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Missing required field: campaignGoal");
        assert!(!OptimizerError::NoOutput.is_validation());
    }
}
