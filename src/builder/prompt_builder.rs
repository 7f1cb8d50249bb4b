//! Blocking prompt builder.

use std::sync::Arc;

use serde_json::Value;

use super::render::{fragments, render, resolve_blocking};
use super::{MessageLog, parse_references};
use crate::config::PicPromptConfig;
use crate::error::PromptError;
use crate::images::ImageHandler;
use crate::providers::EncodeMode;
use crate::types::{PromptConfig, PromptMessage, RenderedMessage, Role};

/// Accumulates prompt entries and renders them for a provider.
///
/// Images are only recorded by `add_image_message`; they are fetched and
/// normalized when content is requested for a provider. Must not be used from
/// inside an async runtime when HTTP references are present; use
/// [`AsyncPromptBuilder`](super::AsyncPromptBuilder) there.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    log: MessageLog,
    handler: Arc<ImageHandler>,
}

impl PromptBuilder {
    pub fn new() -> Result<Self, PromptError> {
        Ok(Self::with_handler(Arc::new(ImageHandler::new()?)))
    }

    /// Builder with a fresh handler configured from `config`.
    pub fn from_config(config: &PicPromptConfig) -> Result<Self, PromptError> {
        Ok(Self::with_handler(Arc::new(ImageHandler::from_config(config)?)))
    }

    /// Builder sharing an existing handler and its cache.
    pub fn with_handler(handler: Arc<ImageHandler>) -> Self {
        Self {
            log: MessageLog::default(),
            handler,
        }
    }

    pub fn handler(&self) -> &ImageHandler {
        &self.handler
    }

    pub fn messages(&self) -> &[PromptMessage] {
        self.log.messages()
    }

    pub fn add_system_message<S: Into<String>>(&mut self, text: S) -> &mut Self {
        self.log.push_text(Role::System, text.into());
        self
    }

    pub fn add_user_message<S: Into<String>>(&mut self, text: S) -> &mut Self {
        self.log.push_text(Role::User, text.into());
        self
    }

    pub fn add_assistant_message<S: Into<String>>(&mut self, text: S) -> &mut Self {
        self.log.push_text(Role::Assistant, text.into());
        self
    }

    /// Record an image reference. Only parsing happens here.
    pub fn add_image_message(&mut self, reference: &str) -> Result<&mut Self, PromptError> {
        self.add_image_messages([reference])
    }

    /// Append several images in order. Nothing is appended if any reference is malformed.
    pub fn add_image_messages<I, S>(&mut self, references: I) -> Result<&mut Self, PromptError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let references = parse_references(references)?;
        self.log.push_images(references);
        Ok(self)
    }

    pub fn add_config(&mut self, config: PromptConfig) -> &mut Self {
        self.log.add_config(config);
        self
    }

    pub fn get_config(&self, provider: &str) -> Option<&PromptConfig> {
        self.log.get_config(provider)
    }

    pub fn remove_config(&mut self, provider: &str) -> Option<PromptConfig> {
        self.log.remove_config(provider)
    }

    pub fn has_config(&self, provider: &str) -> bool {
        self.log.get_config(provider).is_some()
    }

    /// Log entries with their fragments, still role-tagged.
    pub fn get_messages_for(&self, provider: &str) -> Result<Vec<RenderedMessage>, PromptError> {
        self.render_for(provider, EncodeMode::Full)
    }

    fn render_for(&self, provider: &str, mode: EncodeMode) -> Result<Vec<RenderedMessage>, PromptError> {
        let helper = self.handler.helper(provider)?;
        let resolved = resolve_blocking(&self.handler, provider, self.log.messages())?;
        render(helper.as_ref(), resolved, mode)
    }

    /// One provider-shaped fragment per entry, in log order.
    pub fn get_content_for(&self, provider: &str) -> Result<Vec<Value>, PromptError> {
        self.render_for(provider, EncodeMode::Full).map(fragments)
    }

    /// Like `get_content_for`, with image data replaced by its size.
    pub fn get_content_preview_for(&self, provider: &str) -> Result<Vec<Value>, PromptError> {
        self.render_for(provider, EncodeMode::Preview).map(fragments)
    }

    /// Full request body for `provider`, using its stored config or defaults.
    pub fn get_prompt_for(&self, provider: &str) -> Result<Value, PromptError> {
        let helper = self.handler.helper(provider)?;
        let rendered = self.render_for(provider, EncodeMode::Full)?;
        let mut config = self.log.config_for(provider);
        if config.model.is_empty() {
            config.model = PromptConfig::for_provider(helper.name()).model;
        }
        Ok(helper.format_prompt(&rendered, &config))
    }
}
