//! Anthropic-style helper: base64 `image` blocks with an explicit media type.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use super::{EncodeMode, ProviderHelper, ProviderNames, fragment_text};
use crate::defaults::providers::{ANTHROPIC_MAX_BYTES, ANTHROPIC_MAX_DIMENSION, ANTHROPIC_MAX_TOKENS};
use crate::error::ImageError;
use crate::types::{
    MediaType, NormalizedImage, PromptConfig, ProviderConstraint, RenderedMessage, Role,
};

#[derive(Debug, Clone)]
pub struct AnthropicHelper {
    constraint: ProviderConstraint,
}

impl Default for AnthropicHelper {
    fn default() -> Self {
        Self::new(ProviderConstraint::new(
            ANTHROPIC_MAX_BYTES,
            ANTHROPIC_MAX_DIMENSION,
            MediaType::ALL.to_vec(),
        ))
    }
}

impl AnthropicHelper {
    pub fn new(constraint: ProviderConstraint) -> Self {
        Self { constraint }
    }
}

impl ProviderHelper for AnthropicHelper {
    fn name(&self) -> &str {
        ProviderNames::ANTHROPIC
    }

    fn constraint(&self) -> &ProviderConstraint {
        &self.constraint
    }

    fn with_constraint(&self, constraint: ProviderConstraint) -> Arc<dyn ProviderHelper> {
        Arc::new(Self::new(constraint))
    }

    fn encode_text(&self, text: &str) -> Value {
        json!({ "type": "text", "text": text })
    }

    fn encode_image(&self, image: &NormalizedImage, mode: EncodeMode) -> Result<Value, ImageError> {
        Ok(json!({
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": image.media_type.as_str(),
                "data": mode.payload(image),
            }
        }))
    }

    /// System entries move to the top-level `system` string; the Messages API
    /// accepts only user and assistant turns.
    fn format_prompt(&self, messages: &[RenderedMessage], config: &PromptConfig) -> Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .flat_map(|m| m.content.iter().filter_map(fragment_text))
            .collect();
        let turns: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = Map::new();
        body.insert("model".into(), json!(config.model));
        body.insert(
            "max_tokens".into(),
            json!(config.max_tokens.unwrap_or(ANTHROPIC_MAX_TOKENS)),
        );
        if !system.is_empty() {
            body.insert("system".into(), json!(system.join("\n\n")));
        }
        body.insert("messages".into(), Value::Array(turns));
        if let Some(t) = config.temperature {
            body.insert("temperature".into(), json!(t));
        }
        if let Some(p) = config.top_p {
            body.insert("top_p".into(), json!(p));
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageReference;
    use bytes::Bytes;

    #[test]
    fn encodes_base64_source_block() {
        let image = NormalizedImage {
            reference: ImageReference::parse("a.png").unwrap(),
            data: Bytes::from_static(b"abc"),
            media_type: MediaType::Png,
            width: 1,
            height: 1,
            transformed: false,
        };
        assert_eq!(
            AnthropicHelper::default()
                .encode_image(&image, EncodeMode::Full)
                .unwrap(),
            json!({
                "type": "image",
                "source": {"type": "base64", "media_type": "image/png", "data": "YWJj"}
            })
        );
    }

    #[test]
    fn hoists_system_text_and_defaults_max_tokens() {
        let helper = AnthropicHelper::default();
        let messages = vec![
            RenderedMessage {
                role: Role::System,
                content: vec![helper.encode_text("one")],
            },
            RenderedMessage {
                role: Role::User,
                content: vec![helper.encode_text("hi")],
            },
            RenderedMessage {
                role: Role::System,
                content: vec![helper.encode_text("two")],
            },
        ];
        let body = helper.format_prompt(&messages, &PromptConfig::new("anthropic", "claude"));

        assert_eq!(body["system"], "one\n\ntwo");
        assert_eq!(body["max_tokens"], ANTHROPIC_MAX_TOKENS);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }
}
