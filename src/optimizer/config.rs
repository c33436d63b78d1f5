use serde::{Deserialize, Serialize};

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum OptimizerConfig {
    Anthropic(AnthropicConfig),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnthropicConfig {
    /// Falls back to `ANTHROPIC_API_KEY` when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_ANTHROPIC_URL.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl AnthropicConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl OptimizerConfig {
    pub fn base_url(&self) -> &str {
        match self {
            OptimizerConfig::Anthropic(config) => &config.base_url,
        }
    }

    pub fn has_api_key(&self) -> bool {
        match self {
            OptimizerConfig::Anthropic(config) => config.resolve_api_key().is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_anthropic_section() {
        let toml = r#"
provider = "anthropic"
api_key = "sk-test"
model = "claude-test"
"#;
        let config: OptimizerConfig = toml_edit::de::from_str(toml).unwrap();
        let OptimizerConfig::Anthropic(anthropic) = config;
        assert_eq!(anthropic.api_key.as_deref(), Some("sk-test"));
        assert_eq!(anthropic.model, "claude-test");
        assert_eq!(anthropic.base_url, DEFAULT_ANTHROPIC_URL);
        assert_eq!(anthropic.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_configured_key_wins() {
        let config = AnthropicConfig {
            api_key: Some("sk-configured".to_string()),
            ..AnthropicConfig::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-configured"));
    }
}
