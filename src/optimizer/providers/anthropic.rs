//! Anthropic Messages API provider.
//!
//! Structured output is obtained by offering a single tool whose input
//! schema is the requested output schema and forcing the model to call it.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::optimizer::{AnthropicConfig, ContentProvider, GenerationRequest, OptimizerError};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(config: &AnthropicConfig) -> Result<Self, OptimizerError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            OptimizerError::ConfigError(format!(
                "no API key configured (set optimizer.api_key or {})",
                crate::optimizer::config::API_KEY_ENV
            ))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&api_key)
                .map_err(|_| OptimizerError::ConfigError("API key is not a valid header".into()))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.base_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn build_request(&self, request: &GenerationRequest) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            tools: vec![Tool {
                name: request.name.clone(),
                description: "Record the optimized email content.".to_string(),
                input_schema: request.output_schema.clone(),
            }],
            tool_choice: ToolChoice {
                choice_type: "tool".to_string(),
                name: request.name.clone(),
            },
        }
    }

    async fn handle_error_status(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> OptimizerError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return OptimizerError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return OptimizerError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => parse_error_body(&body),
            Err(e) => OptimizerError::Http(e),
        }
    }
}

#[async_trait]
impl ContentProvider for AnthropicProvider {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<Value>, OptimizerError> {
        debug!("Sending prompt to Anthropic:\n{}", request.prompt);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.build_request(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let err = self.handle_error_status(status, response).await;
            error!("Anthropic request failed with {}: {}", status, err);
            return Err(err);
        }

        let body = response.text().await?;
        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| OptimizerError::InvalidOutput(format!("Failed to parse response: {e}")))?;

        Ok(extract_tool_input(parsed, &request.name))
    }

    fn name(&self) -> &str {
        "Anthropic"
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    tools: Vec<Tool>,
    tool_choice: ToolChoice,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    choice_type: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "tool_use")]
    ToolUse { name: String, input: Value },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

fn extract_tool_input(response: MessagesResponse, tool_name: &str) -> Option<Value> {
    response.content.into_iter().find_map(|block| match block {
        ContentBlock::ToolUse { name, input } if name == tool_name => Some(input),
        _ => None,
    })
}

fn parse_error_body(body: &str) -> OptimizerError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_error) => OptimizerError::Api {
            error_type: api_error.error.error_type,
            message: api_error.error.message,
        },
        Err(_) => OptimizerError::Api {
            error_type: "unknown".to_string(),
            message: body.to_string(),
        },
    }
}
