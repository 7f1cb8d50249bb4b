//! Top-level configuration
//!
//! `PicPromptConfig` bundles the HTTP source settings with per-provider constraint
//! overrides. It is usually read from JSON and handed to `ImageHandler::from_config`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PromptError;
use crate::types::{ConstraintOverrides, HttpSourceConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PicPromptConfig {
    pub http: HttpSourceConfig,
    /// Keyed by provider name
    pub providers: HashMap<String, ConstraintOverrides>,
}

impl PicPromptConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate JSON; any failure is `InvalidConfig`.
    pub fn from_json_str(json: &str) -> Result<Self, PromptError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PromptError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_http(mut self, http: HttpSourceConfig) -> Self {
        self.http = http;
        self
    }

    /// Override constraints for one provider (name is case-insensitive).
    pub fn with_provider_overrides<S: Into<String>>(
        mut self,
        provider: S,
        overrides: ConstraintOverrides,
    ) -> Self {
        self.providers
            .insert(provider.into().trim().to_ascii_lowercase(), overrides);
        self
    }

    /// Reject overrides no image could ever satisfy.
    pub fn validate(&self) -> Result<(), PromptError> {
        for (name, o) in &self.providers {
            if o.max_bytes == Some(0) {
                return Err(PromptError::InvalidConfig(format!(
                    "provider {name}: max_bytes must be positive"
                )));
            }
            if o.max_dimension == Some(0) {
                return Err(PromptError::InvalidConfig(format!(
                    "provider {name}: max_dimension must be positive"
                )));
            }
            if o.allowed_media_types.as_ref().is_some_and(Vec::is_empty) {
                return Err(PromptError::InvalidConfig(format!(
                    "provider {name}: allowed_media_types must not be empty"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::time::Duration;

    #[test]
    fn parses_partial_json() {
        let config = PicPromptConfig::from_json_str(
            r#"{
                "http": {"timeout": 2, "retry_count": 0},
                "providers": {"anthropic": {"max_bytes": 1000000}}
            }"#,
        )
        .unwrap();
        assert_eq!(config.http.timeout, Some(Duration::from_secs(2)));
        assert_eq!(config.http.retry_count, 0);
        assert_eq!(config.providers["anthropic"].max_bytes, Some(1_000_000));
    }

    #[test]
    fn rejects_invalid_overrides() {
        let err = PicPromptConfig::from_json_str(r#"{"providers": {"openai": {"max_bytes": 0}}}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);

        let err = PicPromptConfig::from_json_str("{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn out_of_range_durations_are_invalid_config() {
        for json in [
            r#"{"http": {"timeout": -1}}"#,
            r#"{"http": {"connect_timeout": -0.5}}"#,
            r#"{"http": {"timeout": 1e30}}"#,
        ] {
            let err = PicPromptConfig::from_json_str(json).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfig, "{json}");
        }
    }
}
