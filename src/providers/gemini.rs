//! Gemini-style helper.
//!
//! Unlike the other helpers, Gemini picks its encoding per image: small images go
//! inline as `inline_data`, images above the inline limit are sent as `file_data`
//! pointing at a URI the provider can read.

use std::fmt::Debug;
use std::sync::Arc;

use serde_json::{Map, Value, json};

use super::{EncodeMode, ProviderHelper, ProviderNames};
use crate::defaults::providers::{GEMINI_INLINE_MAX_BYTES, GEMINI_MAX_BYTES, GEMINI_MAX_DIMENSION};
use crate::error::ImageError;
use crate::types::{
    MediaType, NormalizedImage, PreferredEncoding, PromptConfig, ProviderConstraint,
    ReferenceScheme, RenderedMessage, Role,
};

/// Supplies a provider-readable URI for images that cannot be sent inline.
///
/// May be asked more than once for the same image.
pub trait FileUriResolver: Send + Sync + Debug {
    fn file_uri(&self, image: &NormalizedImage) -> Option<String>;
}

/// HTTP(S) and `gs://` references point at themselves, as long as the bytes were
/// not rewritten. Gemini cannot read local paths or `s3://` objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteReferenceUris;

impl FileUriResolver for RemoteReferenceUris {
    fn file_uri(&self, image: &NormalizedImage) -> Option<String> {
        let readable = match image.reference.scheme() {
            ReferenceScheme::Http => true,
            ReferenceScheme::ObjectStore { store, .. } => store == "gs",
            ReferenceScheme::Local { .. } => false,
        };
        (readable && !image.transformed).then(|| image.reference.as_str().trim().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct GeminiHelper {
    constraint: ProviderConstraint,
    uris: Arc<dyn FileUriResolver>,
}

impl Default for GeminiHelper {
    fn default() -> Self {
        Self::new(
            ProviderConstraint::new(
                GEMINI_MAX_BYTES,
                GEMINI_MAX_DIMENSION,
                vec![MediaType::Png, MediaType::Jpeg, MediaType::Webp],
            )
            .with_inline_max_bytes(GEMINI_INLINE_MAX_BYTES),
        )
    }
}

impl GeminiHelper {
    pub fn new(constraint: ProviderConstraint) -> Self {
        Self {
            constraint,
            uris: Arc::new(RemoteReferenceUris),
        }
    }

    pub fn with_file_uri_resolver(mut self, uris: Arc<dyn FileUriResolver>) -> Self {
        self.uris = uris;
        self
    }

    const fn role(role: Role) -> &'static str {
        match role {
            Role::Assistant => "model",
            Role::User | Role::System => "user",
        }
    }
}

impl ProviderHelper for GeminiHelper {
    fn name(&self) -> &str {
        ProviderNames::GEMINI
    }

    fn constraint(&self) -> &ProviderConstraint {
        &self.constraint
    }

    fn with_constraint(&self, constraint: ProviderConstraint) -> Arc<dyn ProviderHelper> {
        Arc::new(Self {
            constraint,
            uris: self.uris.clone(),
        })
    }

    fn encode_text(&self, text: &str) -> Value {
        json!({ "text": text })
    }

    fn encode_image(&self, image: &NormalizedImage, mode: EncodeMode) -> Result<Value, ImageError> {
        match self.constraint.encoding_for(image.byte_length()) {
            PreferredEncoding::InlineBase64 => Ok(json!({
                "inline_data": {
                    "mime_type": image.media_type.as_str(),
                    "data": mode.payload(image),
                }
            })),
            PreferredEncoding::UploadReference => {
                let uri = self
                    .uris
                    .file_uri(image)
                    .ok_or(ImageError::InlineUnsuitable {
                        byte_length: image.byte_length(),
                        inline_max_bytes: self.constraint.inline_max_bytes.unwrap_or(0),
                    })?;
                Ok(json!({
                    "file_data": {
                        "mime_type": image.media_type.as_str(),
                        "file_uri": uri,
                    }
                }))
            }
        }
    }

    /// Images above the inline limit with no readable URI are refitted to the limit.
    fn inline_fallback(&self, image: &NormalizedImage) -> Option<ProviderConstraint> {
        let limit = self.constraint.inline_max_bytes?;
        let can_inline = self.constraint.preferred_encoding == PreferredEncoding::InlineBase64;
        let needs_uri = self.constraint.encoding_for(image.byte_length())
            == PreferredEncoding::UploadReference;
        (can_inline && needs_uri && self.uris.file_uri(image).is_none()).then(|| ProviderConstraint {
            max_bytes: limit.min(self.constraint.max_bytes),
            ..self.constraint.clone()
        })
    }

    fn format_prompt(&self, messages: &[RenderedMessage], config: &PromptConfig) -> Value {
        let system_parts: Vec<&Value> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .flat_map(|m| m.content.iter())
            .collect();
        let contents: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| json!({ "role": Self::role(m.role), "parts": m.content }))
            .collect();

        let mut body = Map::new();
        body.insert("model".into(), json!(config.model));
        body.insert("contents".into(), Value::Array(contents));
        if !system_parts.is_empty() {
            body.insert(
                "systemInstruction".into(),
                json!({ "parts": system_parts }),
            );
        }

        let mut generation = Map::new();
        if let Some(t) = config.temperature {
            generation.insert("temperature".into(), json!(t));
        }
        if let Some(n) = config.max_tokens {
            generation.insert("maxOutputTokens".into(), json!(n));
        }
        if let Some(p) = config.top_p {
            generation.insert("topP".into(), json!(p));
        }
        if let Some(schema) = &config.json_schema {
            generation.insert("responseMimeType".into(), json!("application/json"));
            generation.insert("responseSchema".into(), schema.clone());
        }
        if !generation.is_empty() {
            body.insert("generationConfig".into(), Value::Object(generation));
        }
        Value::Object(body)
    }
}
