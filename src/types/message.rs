//! Prompt message log entries.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ImageReference;

/// Message sender role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of one log entry. The variant is the message type: it picks whether
/// rendering encodes text directly or normalizes the referenced image first.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptContent {
    Text(String),
    Image(ImageReference),
}

/// One entry of the builder's append-only log.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptMessage {
    pub role: Role,
    pub content: PromptContent,
}

impl PromptMessage {
    pub fn text<S: Into<String>>(role: Role, text: S) -> Self {
        Self {
            role,
            content: PromptContent::Text(text.into()),
        }
    }

    /// Image entries are always sent with the user role.
    pub fn image(reference: ImageReference) -> Self {
        Self {
            role: Role::User,
            content: PromptContent::Image(reference),
        }
    }

    pub fn image_reference(&self) -> Option<&ImageReference> {
        match &self.content {
            PromptContent::Image(r) => Some(r),
            PromptContent::Text(_) => None,
        }
    }
}

/// A log entry rendered for one provider: role plus provider-shaped fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub role: Role,
    pub content: Vec<serde_json::Value>,
}
