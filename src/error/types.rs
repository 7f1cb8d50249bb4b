//! Core error types.

use thiserror::Error;

/// Root-cause classification shared by `ImageError` and `PromptError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SourceNotFound,
    SourceUnreadable,
    SourceAccessDenied,
    SourceFetchFailed,
    UnsupportedMediaType,
    ImageTooLarge,
    UnknownProvider,
    InvalidReference,
    UnsupportedReference,
    InvalidImage,
    InlineUnsuitable,
    InvalidConfig,
}

/// Failures raised while acquiring, normalizing or encoding a single image.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ImageError {
    /// The referenced file or object does not exist
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// The file exists but could not be read (permissions, I/O)
    #[error("source unreadable: {0}")]
    SourceUnreadable(String),

    /// The object store refused the credentials supplied by its client
    #[error("access denied: {0}")]
    SourceAccessDenied(String),

    /// Network or HTTP failure; `retryable` marks the transient subset
    #[error("fetch failed: {message}")]
    SourceFetchFailed {
        message: String,
        status: Option<u16>,
        retryable: bool,
    },

    /// Neither sniffing nor the hint produced a supported type, or the
    /// provider does not accept the detected type
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The quality floor was reached without fitting the byte budget
    #[error("image too large: {byte_length} bytes exceeds budget of {max_bytes} bytes")]
    ImageTooLarge { byte_length: usize, max_bytes: usize },

    /// The reference string cannot be interpreted
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// No source is registered for the reference scheme
    #[error("no source registered for reference: {0}")]
    UnsupportedReference(String),

    /// Bytes that sniff as an image but do not decode
    #[error("invalid image data: {0}")]
    InvalidImage(String),

    /// The image must be sent by reference but no file URI is available
    #[error("image of {byte_length} bytes exceeds inline limit of {inline_max_bytes} bytes and has no file uri")]
    InlineUnsuitable {
        byte_length: usize,
        inline_max_bytes: usize,
    },
}

impl ImageError {
    /// Build a fetch failure.
    pub fn fetch_failed<S: Into<String>>(message: S, status: Option<u16>, retryable: bool) -> Self {
        Self::SourceFetchFailed {
            message: message.into(),
            status,
            retryable,
        }
    }

    /// Only transient fetch failures are retried.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SourceFetchFailed {
                retryable: true,
                ..
            }
        )
    }

    /// HTTP status behind a fetch failure, if any.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::SourceFetchFailed { status, .. } => *status,
            _ => None,
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceNotFound(_) => ErrorKind::SourceNotFound,
            Self::SourceUnreadable(_) => ErrorKind::SourceUnreadable,
            Self::SourceAccessDenied(_) => ErrorKind::SourceAccessDenied,
            Self::SourceFetchFailed { .. } => ErrorKind::SourceFetchFailed,
            Self::UnsupportedMediaType(_) => ErrorKind::UnsupportedMediaType,
            Self::ImageTooLarge { .. } => ErrorKind::ImageTooLarge,
            Self::InvalidReference(_) => ErrorKind::InvalidReference,
            Self::UnsupportedReference(_) => ErrorKind::UnsupportedReference,
            Self::InvalidImage(_) => ErrorKind::InvalidImage,
            Self::InlineUnsuitable { .. } => ErrorKind::InlineUnsuitable,
        }
    }
}

/// Crate-level error returned by the handler, the factory and the builders.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PromptError {
    /// An image failed; carries the offending reference and, when known, the provider
    #[error("image '{reference}'{}: {source}", provider_suffix(.provider))]
    Image {
        reference: String,
        provider: Option<String>,
        #[source]
        source: ImageError,
    },

    /// No helper is registered under this provider name
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn provider_suffix(provider: &Option<String>) -> String {
    provider
        .as_deref()
        .map(|p| format!(" (provider {p})"))
        .unwrap_or_default()
}

impl PromptError {
    /// Tag an image failure with its reference and provider.
    pub fn image<R: Into<String>>(reference: R, provider: Option<&str>, source: ImageError) -> Self {
        Self::Image {
            reference: reference.into(),
            provider: provider.map(str::to_string),
            source,
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Image { source, .. } => source.kind(),
            Self::UnknownProvider(_) => ErrorKind::UnknownProvider,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Reference of the failed image, if this is an image failure.
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Image { reference, .. } => Some(reference),
            _ => None,
        }
    }

    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Image { provider, .. } => provider.as_deref(),
            _ => None,
        }
    }

    /// Root cause for image failures.
    pub const fn image_error(&self) -> Option<&ImageError> {
        match self {
            Self::Image { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_fetch_failures_are_retryable() {
        assert!(ImageError::fetch_failed("timeout", None, true).is_retryable());
        assert!(!ImageError::fetch_failed("HTTP 404", Some(404), false).is_retryable());
        assert!(!ImageError::SourceNotFound("a.png".into()).is_retryable());
        assert!(!ImageError::SourceAccessDenied("s3://b/k".into()).is_retryable());
    }

    #[test]
    fn tagged_error_keeps_root_kind_and_reference() {
        let err = PromptError::image(
            "https://example.com/cat.png",
            Some("openai"),
            ImageError::fetch_failed("HTTP 404", Some(404), false),
        );
        assert_eq!(err.kind(), ErrorKind::SourceFetchFailed);
        assert_eq!(err.reference(), Some("https://example.com/cat.png"));
        assert_eq!(err.provider(), Some("openai"));
        assert_eq!(err.image_error().and_then(ImageError::status_code), Some(404));

        let msg = err.to_string();
        assert!(msg.contains("https://example.com/cat.png"));
        assert!(msg.contains("provider openai"));
    }

    #[test]
    fn untagged_provider_is_omitted_from_message() {
        let err = PromptError::image("a.png", None, ImageError::SourceNotFound("a.png".into()));
        assert_eq!(err.to_string(), "image 'a.png': source not found: a.png");
    }
}
