//! pic-prompt
//!
//! Image acquisition, normalization and provider encoding for multimodal LLM prompts.
//!
//! A reference (local path, `http(s)://` URL or `s3://`/`gs://` object key) is fetched,
//! sniffed, shrunk to fit the target provider's limits and rendered as the message
//! fragment that provider expects.
//!
//! ```rust,ignore
//! use pic_prompt::builder::PromptBuilder;
//!
//! let mut builder = PromptBuilder::new()?;
//! builder.add_system_message("You describe photos.");
//! builder.add_image_message("./cat.jpg")?;
//! let content = builder.get_content_for("openai")?;
//! ```
#![deny(unsafe_code)]

pub mod builder;
pub mod config;
pub mod defaults;
pub mod error;
pub mod images;
pub mod providers;
pub mod retry;
pub mod sources;
pub mod types;
pub mod utils;

pub use builder::{AsyncPromptBuilder, PromptBuilder};
pub use config::PicPromptConfig;
pub use error::{ErrorKind, ImageError, PromptError};
pub use images::{ImageHandler, SizeConstraintResolver};
pub use providers::{ProviderFactory, ProviderHelper};
pub use types::{
    ImageReference, MediaType, NormalizedImage, PromptConfig, PromptMessage, ProviderConstraint,
    RawImage,
};

/// Convenient imports for the common builder workflow.
pub mod prelude {
    pub use crate::builder::{AsyncPromptBuilder, PromptBuilder};
    pub use crate::error::{ErrorKind, ImageError, PromptError};
    pub use crate::images::ImageHandler;
    pub use crate::providers::{ProviderFactory, ProviderHelper, ProviderNames};
    pub use crate::types::{MediaType, PromptConfig, Role};
}
