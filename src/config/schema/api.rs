use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Connection settings for the OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request timeout; user cancellation is independent of it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_temperature() -> f64 {
    0.8
}

fn default_max_tokens() -> u32 {
    512
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| ValidationError::ApiConfig {
            field: "base_url",
            reason: format!("is not a valid URL ({e})"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::ApiConfig {
                field: "base_url",
                reason: format!("must use http or https, got {}", parsed.scheme()),
            });
        }

        if self.model.trim().is_empty() {
            return Err(ValidationError::ApiConfig {
                field: "model",
                reason: "must not be empty".into(),
            });
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::ApiConfig {
                field: "temperature",
                reason: format!("must be within 0.0..=2.0, got {}", self.temperature),
            });
        }

        if self.max_tokens == 0 {
            return Err(ValidationError::ApiConfig {
                field: "max_tokens",
                reason: "must be greater than zero".into(),
            });
        }

        if self.timeout_secs == 0 {
            return Err(ValidationError::ApiConfig {
                field: "timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }

        if self
            .api_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            return Err(ValidationError::ApiConfig {
                field: "api_key",
                reason: "is set but blank".into(),
            });
        }

        Ok(())
    }
}
