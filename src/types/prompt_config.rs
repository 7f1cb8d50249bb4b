//! Per-provider request parameters.

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::providers::ProviderNames;

/// Request-level parameters used when rendering a full prompt payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Requests structured JSON output matching this schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<serde_json::Value>,
}

impl PromptConfig {
    pub fn new<P: Into<String>, M: Into<String>>(provider: P, model: M) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            top_p: None,
            json_schema: None,
        }
    }

    /// Defaults used when no config was added for `provider`.
    pub fn for_provider(provider: &str) -> Self {
        match provider {
            ProviderNames::ANTHROPIC => Self::new(provider, "claude-3-5-sonnet-latest")
                .with_max_tokens(defaults::providers::ANTHROPIC_MAX_TOKENS),
            ProviderNames::GEMINI => Self::new(provider, "gemini-2.0-flash"),
            _ => Self::new(provider, "gpt-4o"),
        }
    }

    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub const fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_json_schema(mut self, schema: serde_json::Value) -> Self {
        self.json_schema = Some(schema);
        self
    }
}
