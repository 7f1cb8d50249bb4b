//! Error Handling Module
//!
//! This module provides the error types of the image pipeline:
//! - `ImageError`: root causes raised by sources, the detector, the resolver and helpers
//! - `PromptError`: crate-level error, tagging image failures with reference and provider
//! - `ErrorKind`: coarse classification for callers that only need the cause
//!
//! # Example
//!
//! ```rust,ignore
//! use pic_prompt::error::{ErrorKind, ImageError};
//!
//! let error = ImageError::fetch_failed("HTTP 404", Some(404), false);
//! assert_eq!(error.kind(), ErrorKind::SourceFetchFailed);
//! assert!(!error.is_retryable());
//! ```

pub(crate) mod conversions;
pub mod types;

pub use types::*;
