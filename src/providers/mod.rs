//! Provider helpers
//!
//! A `ProviderHelper` owns one provider's image constraint and knows the wire shape
//! of that provider's message fragments and request body. Helpers are looked up by
//! name through the `ProviderFactory`.

pub mod anthropic;
pub mod factory;
pub mod gemini;
pub mod openai;

use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ImageError;
use crate::types::{NormalizedImage, PromptConfig, ProviderConstraint, RenderedMessage};

pub use anthropic::AnthropicHelper;
pub use factory::ProviderFactory;
pub use gemini::{FileUriResolver, GeminiHelper, RemoteReferenceUris};
pub use openai::OpenAiHelper;

/// Built-in provider names
pub struct ProviderNames;

impl ProviderNames {
    pub const OPENAI: &'static str = "openai";
    pub const ANTHROPIC: &'static str = "anthropic";
    pub const GEMINI: &'static str = "gemini";
}

/// Whether image payloads carry real data or a size placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodeMode {
    #[default]
    Full,
    /// Replace base64 payloads with `"<n> bytes"`; meant for logs and inspection.
    Preview,
}

impl EncodeMode {
    pub(crate) fn payload(self, image: &NormalizedImage) -> String {
        match self {
            Self::Full => image.to_base64(),
            Self::Preview => format!("{} bytes", image.byte_length()),
        }
    }

    /// `data:<media-type>;base64,<payload>`
    pub(crate) fn data_uri(self, image: &NormalizedImage) -> String {
        format!("data:{};base64,{}", image.media_type, self.payload(image))
    }
}

/// One provider's image budget and wire format.
///
/// Encoding methods are pure: they never fetch or resize, they only shape an
/// already normalized image or a text entry into the provider's JSON.
pub trait ProviderHelper: Send + Sync + Debug {
    /// Lowercase name the factory registers this helper under.
    fn name(&self) -> &str;

    /// Budget the resolver fits images into before encoding.
    fn constraint(&self) -> &ProviderConstraint;

    /// Copy of this helper governed by a different constraint.
    fn with_constraint(&self, constraint: ProviderConstraint) -> Arc<dyn ProviderHelper>;

    /// Fragment for one text entry.
    fn encode_text(&self, text: &str) -> Value;

    /// Fragment for one normalized image. `Preview` swaps the payload for its size.
    fn encode_image(&self, image: &NormalizedImage, mode: EncodeMode) -> Result<Value, ImageError>;

    /// Tighter budget for an image that fits `constraint()` but could not be encoded
    /// as it is. The handler re-resolves once with it; `None` keeps the image.
    fn inline_fallback(&self, _image: &NormalizedImage) -> Option<ProviderConstraint> {
        None
    }

    /// Top-level request body for this provider.
    fn format_prompt(&self, messages: &[RenderedMessage], config: &PromptConfig) -> Value;
}

/// Text of a fragment produced by `encode_text`, for providers that hoist system text.
pub(crate) fn fragment_text(fragment: &Value) -> Option<&str> {
    fragment.get("text").and_then(Value::as_str)
}
