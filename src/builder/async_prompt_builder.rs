//! Async prompt builder.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::render::{fragments, render, resolve_async};
use super::{MessageLog, parse_references};
use crate::config::PicPromptConfig;
use crate::error::PromptError;
use crate::images::ImageHandler;
use crate::providers::EncodeMode;
use crate::types::{PromptConfig, PromptMessage, RenderedMessage, Role};

/// Async counterpart of [`PromptBuilder`](super::PromptBuilder).
///
/// Image references are fetched when added, so a missing file or failed download
/// is reported by `add_image_message(s)` rather than at render time. Batches are
/// fetched concurrently and appended in the order given.
#[derive(Debug, Clone)]
pub struct AsyncPromptBuilder {
    log: MessageLog,
    handler: Arc<ImageHandler>,
}

impl AsyncPromptBuilder {
    pub fn new() -> Result<Self, PromptError> {
        Ok(Self::with_handler(Arc::new(ImageHandler::new()?)))
    }

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

    /// Fetch one reference, then append it.
    pub async fn add_image_message(&mut self, reference: &str) -> Result<&mut Self, PromptError> {
        self.add_image_messages([reference]).await
    }

    /// Fetch all references concurrently, then append them in the given order.
    ///
    /// Fails with the first error, naming its reference; nothing from a failed
    /// batch is appended.
    pub async fn add_image_messages<I, S>(&mut self, references: I) -> Result<&mut Self, PromptError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let references = parse_references(references)?;
        self.handler.prefetch_many(&references).await?;
        debug!(target: "pic_prompt::builder", count = references.len(), "appending images");
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

    async fn render_for(
        &self,
        provider: &str,
        mode: EncodeMode,
    ) -> Result<Vec<RenderedMessage>, PromptError> {
        let helper = self.handler.helper(provider)?;
        let resolved = resolve_async(&self.handler, provider, self.log.messages()).await?;
        render(helper.as_ref(), resolved, mode)
    }

    pub async fn get_messages_for(&self, provider: &str) -> Result<Vec<RenderedMessage>, PromptError> {
        self.render_for(provider, EncodeMode::Full).await
    }

    pub async fn get_content_for(&self, provider: &str) -> Result<Vec<Value>, PromptError> {
        self.render_for(provider, EncodeMode::Full).await.map(fragments)
    }

    pub async fn get_content_preview_for(&self, provider: &str) -> Result<Vec<Value>, PromptError> {
        self.render_for(provider, EncodeMode::Preview)
            .await
            .map(fragments)
    }

    pub async fn get_prompt_for(&self, provider: &str) -> Result<Value, PromptError> {
        let helper = self.handler.helper(provider)?;
        let rendered = self.render_for(provider, EncodeMode::Full).await?;
        let mut config = self.log.config_for(provider);
        if config.model.is_empty() {
            config.model = PromptConfig::for_provider(helper.name()).model;
        }
        Ok(helper.format_prompt(&rendered, &config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn failed_prefetch_appends_nothing() {
        let mut builder = AsyncPromptBuilder::new().unwrap();
        builder.add_user_message("look");
        let err = builder
            .add_image_messages(["/nope/one.png", "/nope/two.png"])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceNotFound);
        assert!(err.reference().is_some_and(|r| r.starts_with("/nope/")));
        assert_eq!(builder.messages().len(), 1);
    }

    #[tokio::test]
    async fn unknown_provider_is_reported() {
        let mut builder = AsyncPromptBuilder::new().unwrap();
        builder.add_user_message("q");
        let err = builder.get_content_for("bard").await.unwrap_err();
        assert_eq!(err, PromptError::UnknownProvider("bard".into()));
    }
}
