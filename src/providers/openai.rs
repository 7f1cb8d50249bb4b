//! OpenAI-style helper: images as data URIs inside `image_url` blocks.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use super::{EncodeMode, ProviderHelper, ProviderNames};
use crate::defaults::providers::{OPENAI_MAX_BYTES, OPENAI_MAX_DIMENSION};
use crate::error::ImageError;
use crate::types::{MediaType, NormalizedImage, PromptConfig, ProviderConstraint, RenderedMessage};

#[derive(Debug, Clone)]
pub struct OpenAiHelper {
    constraint: ProviderConstraint,
}

impl Default for OpenAiHelper {
    fn default() -> Self {
        Self::new(ProviderConstraint::new(
            OPENAI_MAX_BYTES,
            OPENAI_MAX_DIMENSION,
            MediaType::ALL.to_vec(),
        ))
    }
}

impl OpenAiHelper {
    pub fn new(constraint: ProviderConstraint) -> Self {
        Self { constraint }
    }
}

impl ProviderHelper for OpenAiHelper {
    fn name(&self) -> &str {
        ProviderNames::OPENAI
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
        Ok(json!({ "type": "image_url", "image_url": { "url": mode.data_uri(image) } }))
    }

    fn format_prompt(&self, messages: &[RenderedMessage], config: &PromptConfig) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = Map::new();
        body.insert("model".into(), json!(config.model));
        body.insert("messages".into(), Value::Array(messages));
        if let Some(t) = config.temperature {
            body.insert("temperature".into(), json!(t));
        }
        if let Some(n) = config.max_tokens {
            body.insert("max_tokens".into(), json!(n));
        }
        if let Some(p) = config.top_p {
            body.insert("top_p".into(), json!(p));
        }
        if let Some(schema) = &config.json_schema {
            body.insert(
                "response_format".into(),
                json!({
                    "type": "json_schema",
                    "json_schema": { "name": "response", "schema": schema, "strict": true }
                }),
            );
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageReference, Role};
    use bytes::Bytes;

    fn image() -> NormalizedImage {
        NormalizedImage {
            reference: ImageReference::parse("a.jpg").unwrap(),
            data: Bytes::from_static(b"abc"),
            media_type: MediaType::Jpeg,
            width: 1,
            height: 1,
            transformed: false,
        }
    }

    #[test]
    fn encodes_data_uri_block() {
        let helper = OpenAiHelper::default();
        assert_eq!(
            helper.encode_image(&image(), EncodeMode::Full).unwrap(),
            json!({"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,YWJj"}})
        );
        assert_eq!(
            helper.encode_image(&image(), EncodeMode::Preview).unwrap()["image_url"]["url"],
            "data:image/jpeg;base64,3 bytes"
        );
    }

    #[test]
    fn formats_chat_completion_body() {
        let helper = OpenAiHelper::default();
        let messages = vec![
            RenderedMessage {
                role: Role::System,
                content: vec![helper.encode_text("be brief")],
            },
            RenderedMessage {
                role: Role::User,
                content: vec![helper.encode_image(&image(), EncodeMode::Full).unwrap()],
            },
        ];
        let config = PromptConfig::for_provider("openai")
            .with_temperature(0.5)
            .with_json_schema(json!({"type": "object"}));
        let body = helper.format_prompt(&messages, &config);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"][0]["type"], "image_url");
        assert_eq!(body["temperature"], 0.5);
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["response_format"]["json_schema"]["schema"]["type"], "object");
    }
}
