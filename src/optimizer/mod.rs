pub mod config;
pub mod error;
pub mod handlers;
pub mod prompt;
pub mod providers;
pub mod schema;
pub mod types;

pub use config::*;
pub use error::*;
pub use prompt::render_prompt;
pub use types::*;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub const GENERATION_NAME: &str = "optimize_email_content";

/// A generative text backend that answers with structured output.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Returns the structured output, or `None` when the provider produced
    /// none.
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<Value>, OptimizerError>;
    fn name(&self) -> &str;
}

pub type DynContentProvider = Arc<dyn ContentProvider>;

pub fn create_provider(config: &OptimizerConfig) -> Result<DynContentProvider, OptimizerError> {
    match config {
        OptimizerConfig::Anthropic(anthropic_config) => Ok(Arc::new(
            providers::anthropic::AnthropicProvider::new(anthropic_config)?,
        )),
    }
}

pub fn build_generation_request(request: &OptimizationRequest) -> GenerationRequest {
    GenerationRequest {
        name: GENERATION_NAME.to_string(),
        prompt: render_prompt(request),
        input: request.to_value(),
        input_schema: schema::input_schema(),
        output_schema: schema::output_schema(),
    }
}

/// Validates requests, calls the provider once and validates its answer.
///
/// Failures are never retried here.
#[derive(Clone)]
pub struct ContentOptimizer {
    provider: DynContentProvider,
}

impl ContentOptimizer {
    pub fn new(provider: DynContentProvider) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn optimize(
        &self,
        request: &OptimizationRequest,
    ) -> Result<OptimizationResult, OptimizerError> {
        let generation = build_generation_request(request);

        if let Some(field) =
            schema::first_missing_field(&generation.input_schema, &generation.input, false)
        {
            return Err(OptimizerError::Validation { field });
        }

        info!("Requesting content optimization from {}", self.provider.name());
        let output = match self.provider.generate(&generation).await {
            Ok(Some(output)) => output,
            Ok(None) => {
                warn!("{} returned no structured output", self.provider.name());
                return Err(OptimizerError::NoOutput);
            }
            Err(e) => {
                warn!("Content optimization failed: {}", e);
                return Err(e);
            }
        };

        if let Some(field) = schema::first_missing_field(&generation.output_schema, &output, true)
        {
            warn!("Provider output is missing '{}'", field);
            return Err(OptimizerError::InvalidOutput(format!(
                "missing field '{}'",
                field
            )));
        }

        serde_json::from_value(output).map_err(|e| OptimizerError::InvalidOutput(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider {
        response: Mutex<Option<Result<Option<Value>, OptimizerError>>>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl MockProvider {
        fn returning(response: Result<Option<Value>, OptimizerError>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(response)),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentProvider for MockProvider {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<Option<Value>, OptimizerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(request.prompt.clone());
            self.response.lock().unwrap().take().unwrap_or(Ok(None))
        }

        fn name(&self) -> &str {
            "Mock"
        }
    }

    fn valid_request() -> OptimizationRequest {
        OptimizationRequest::new(
            "Big news",
            "We launched a thing",
            "increase signups",
            "startup founders",
        )
    }

    fn complete_output() -> Value {
        json!({
            "optimizedSubject": "Your next favorite tool is here",
            "optimizedBody": "Founders, meet the thing.",
            "explanation": "Speaks directly to founders."
        })
    }

    #[tokio::test]
    async fn test_optimize_returns_provider_output() {
        let provider = MockProvider::returning(Ok(Some(complete_output())));
        let optimizer = ContentOptimizer::new(provider.clone());

        let result = optimizer.optimize(&valid_request()).await.unwrap();
        assert_eq!(result.optimized_subject, "Your next favorite tool is here");
        assert_eq!(result.optimized_body, "Founders, meet the thing.");
        assert_eq!(result.explanation, "Speaks directly to founders.");
        assert_eq!(provider.calls(), 1);

        let prompt = provider.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Campaign Goal: increase signups"));
    }

    #[tokio::test]
    async fn test_empty_fields_never_reach_provider() {
        let cases = [
            (OptimizationRequest::new("", "b", "g", "a"), "subject"),
            (OptimizationRequest::new("s", "", "g", "a"), "body"),
            (OptimizationRequest::new("s", "b", "  ", "a"), "campaignGoal"),
            (OptimizationRequest::new("s", "b", "g", ""), "targetAudience"),
            (OptimizationRequest::default(), "subject"),
        ];

        for (request, expected_field) in cases {
            let provider = MockProvider::returning(Ok(Some(complete_output())));
            let optimizer = ContentOptimizer::new(provider.clone());

            let err = optimizer.optimize(&request).await.unwrap_err();
            assert!(err.is_validation());
            assert!(matches!(err, OptimizerError::Validation { ref field } if field == expected_field));
            assert_eq!(provider.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_no_structured_output_is_provider_error() {
        let provider = MockProvider::returning(Ok(None));
        let optimizer = ContentOptimizer::new(provider);

        let err = optimizer.optimize(&valid_request()).await.unwrap_err();
        assert!(matches!(err, OptimizerError::NoOutput));
        assert!(!err.is_validation());
    }

    #[tokio::test]
    async fn test_incomplete_output_is_provider_error() {
        let provider = MockProvider::returning(Ok(Some(json!({
            "optimizedSubject": "S",
            "optimizedBody": "B"
        }))));
        let optimizer = ContentOptimizer::new(provider);

        let err = optimizer.optimize(&valid_request()).await.unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidOutput(ref m) if m.contains("explanation")));
    }

    #[tokio::test]
    async fn test_wrongly_typed_output_is_provider_error() {
        let provider = MockProvider::returning(Ok(Some(json!({
            "optimizedSubject": "S",
            "optimizedBody": ["B"],
            "explanation": "E"
        }))));
        let optimizer = ContentOptimizer::new(provider);

        let err = optimizer.optimize(&valid_request()).await.unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn test_provider_failure_is_not_retried() {
        let provider = MockProvider::returning(Err(OptimizerError::RateLimited(30)));
        let optimizer = ContentOptimizer::new(provider.clone());

        let err = optimizer.optimize(&valid_request()).await.unwrap_err();
        assert!(matches!(err, OptimizerError::RateLimited(30)));
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_generation_request_carries_both_schemas() {
        let generation = build_generation_request(&valid_request());
        assert_eq!(generation.name, GENERATION_NAME);
        assert_eq!(generation.input["campaignGoal"], "increase signups");
        assert_eq!(generation.input_schema, schema::input_schema());
        assert_eq!(generation.output_schema, schema::output_schema());
    }
}
