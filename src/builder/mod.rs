//! Prompt builders
//!
//! Both builders keep an append-only log of text and image entries and render it
//! per provider on demand. `PromptBuilder` resolves images by blocking;
//! `AsyncPromptBuilder` fetches them eagerly and concurrently. Rendering itself is
//! shared.

pub mod async_prompt_builder;
pub mod prompt_builder;
mod render;

use std::collections::HashMap;

use crate::error::PromptError;
use crate::types::{ImageReference, PromptConfig, PromptMessage, Role};

pub use async_prompt_builder::AsyncPromptBuilder;
pub use prompt_builder::PromptBuilder;

fn config_key(provider: &str) -> String {
    provider.trim().to_ascii_lowercase()
}

/// Ordered entries plus per-provider request configs.
#[derive(Debug, Clone, Default)]
pub(crate) struct MessageLog {
    messages: Vec<PromptMessage>,
    configs: HashMap<String, PromptConfig>,
}

impl MessageLog {
    pub(crate) fn messages(&self) -> &[PromptMessage] {
        &self.messages
    }

    pub(crate) fn push_text(&mut self, role: Role, text: String) {
        self.messages.push(PromptMessage::text(role, text));
    }

    pub(crate) fn push_images(&mut self, references: Vec<ImageReference>) {
        self.messages
            .extend(references.into_iter().map(PromptMessage::image));
    }

    pub(crate) fn add_config(&mut self, config: PromptConfig) {
        self.configs.insert(config_key(&config.provider), config);
    }

    pub(crate) fn get_config(&self, provider: &str) -> Option<&PromptConfig> {
        self.configs.get(&config_key(provider))
    }

    pub(crate) fn remove_config(&mut self, provider: &str) -> Option<PromptConfig> {
        self.configs.remove(&config_key(provider))
    }

    /// Stored config, or the provider's defaults.
    pub(crate) fn config_for(&self, provider: &str) -> PromptConfig {
        self.get_config(provider)
            .cloned()
            .unwrap_or_else(|| PromptConfig::for_provider(&config_key(provider)))
    }
}

/// Parse every reference before touching the log so a bad one appends nothing.
pub(crate) fn parse_references<I, S>(references: I) -> Result<Vec<ImageReference>, PromptError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    references
        .into_iter()
        .map(|r| {
            let r = r.as_ref();
            ImageReference::parse(r).map_err(|e| PromptError::image(r, None, e))
        })
        .collect()
}
