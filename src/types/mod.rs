//! Core data model.

pub mod constraint;
pub mod http;
pub mod image;
pub mod media;
pub mod message;
pub mod prompt_config;
pub mod reference;

pub use constraint::{ConstraintOverrides, PreferredEncoding, ProviderConstraint};
pub use http::{HttpSourceConfig, HttpSourceConfigBuilder};
pub use image::{NormalizedImage, RawImage};
pub use media::MediaType;
pub use message::{PromptContent, PromptMessage, RenderedMessage, Role};
pub use prompt_config::PromptConfig;
pub use reference::{ImageReference, ReferenceScheme};
