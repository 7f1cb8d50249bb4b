//! Projection of the message log into provider fragments.
//!
//! Rendering is split in two: resolving image entries (blocking or async, the only
//! step that differs between builders) and encoding, which is pure.

use futures::future::try_join_all;
use serde_json::Value;

use crate::error::PromptError;
use crate::images::ImageHandler;
use crate::providers::{EncodeMode, ProviderHelper};
use crate::types::{NormalizedImage, PromptContent, PromptMessage, RenderedMessage, Role};

/// A log entry whose image, if any, has been normalized for one provider.
pub(super) enum Resolved<'a> {
    Text(&'a str),
    Image(NormalizedImage),
}

pub(super) fn resolve_blocking<'a>(
    handler: &ImageHandler,
    provider: &str,
    messages: &'a [PromptMessage],
) -> Result<Vec<(Role, Resolved<'a>)>, PromptError> {
    messages
        .iter()
        .map(|m| {
            let resolved = match &m.content {
                PromptContent::Text(text) => Resolved::Text(text),
                PromptContent::Image(r) => Resolved::Image(handler.get_normalized(r, provider)?),
            };
            Ok((m.role, resolved))
        })
        .collect()
}

/// Images are normalized concurrently; the result keeps log order.
pub(super) async fn resolve_async<'a>(
    handler: &ImageHandler,
    provider: &str,
    messages: &'a [PromptMessage],
) -> Result<Vec<(Role, Resolved<'a>)>, PromptError> {
    try_join_all(messages.iter().map(|m| async move {
        let resolved = match &m.content {
            PromptContent::Text(text) => Resolved::Text(text),
            PromptContent::Image(r) => {
                Resolved::Image(handler.get_normalized_async(r, provider).await?)
            }
        };
        Ok::<_, PromptError>((m.role, resolved))
    }))
    .await
}

pub(super) fn render(
    helper: &dyn ProviderHelper,
    resolved: Vec<(Role, Resolved<'_>)>,
    mode: EncodeMode,
) -> Result<Vec<RenderedMessage>, PromptError> {
    resolved
        .into_iter()
        .map(|(role, entry)| {
            let fragment = match entry {
                Resolved::Text(text) => helper.encode_text(text),
                Resolved::Image(image) => helper.encode_image(&image, mode).map_err(|e| {
                    PromptError::image(image.reference.as_str(), Some(helper.name()), e)
                })?,
            };
            Ok(RenderedMessage {
                role,
                content: vec![fragment],
            })
        })
        .collect()
}

/// One fragment per entry, in log order.
pub(super) fn fragments(rendered: Vec<RenderedMessage>) -> Vec<Value> {
    rendered.into_iter().flat_map(|m| m.content).collect()
}
