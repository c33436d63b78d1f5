use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Content to rewrite plus the context the rewrite should target.
///
/// Absent fields deserialize as empty so they fail validation rather than
/// JSON parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub campaign_goal: String,
    #[serde(default)]
    pub target_audience: String,
}

impl OptimizationRequest {
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        campaign_goal: impl Into<String>,
        target_audience: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            campaign_goal: campaign_goal.into(),
            target_audience: target_audience.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "subject": self.subject,
            "body": self.body,
            "campaignGoal": self.campaign_goal,
            "targetAudience": self.target_audience,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub optimized_subject: String,
    pub optimized_body: String,
    pub explanation: String,
}

/// What a provider receives: the rendered prompt, the raw input and both
/// schemas. Providers must answer with a value matching `output_schema`.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub name: String,
    pub prompt: String,
    pub input: Value,
    pub input_schema: Value,
    pub output_schema: Value,
}
