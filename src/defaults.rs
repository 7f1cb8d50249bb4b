//! Default Configuration Values
//!
//! This module centralizes the default values used by sources, the resolver and the
//! provider helpers. Keeping them in one place makes them easier to document and adjust.

use std::time::Duration;

/// HTTP source defaults
pub mod http {
    use super::*;

    /// Default read timeout for a single image download.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Default connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Redirects followed before a download fails.
    pub const MAX_REDIRECTS: usize = 5;

    /// Default User-Agent string for image downloads
    pub const USER_AGENT: &str = "pic-prompt/0.1.0";
}

/// Retry defaults for transient download failures
pub mod retry {
    use super::*;

    /// Retries after the first attempt.
    pub const RETRY_COUNT: u32 = 3;

    /// Delay before the first retry; doubled on every following retry.
    pub const INITIAL_BACKOFF: Duration = Duration::from_millis(200);

    /// Upper bound for a single backoff delay.
    pub const MAX_BACKOFF: Duration = Duration::from_secs(5);

    pub const BACKOFF_MULTIPLIER: f64 = 2.0;
}

/// Size-constraint resolver defaults
pub mod quality {
    /// JPEG quality used for the first recompression attempt.
    pub const INITIAL_QUALITY: u8 = 85;

    /// Lowest JPEG quality the resolver will try before giving up.
    pub const MIN_QUALITY_FLOOR: u8 = 20;

    /// Hard bound on recompression attempts per image.
    pub const MAX_QUALITY_STEPS: usize = 8;
}

/// Per-provider image limits
pub mod providers {
    /// OpenAI accepts up to 20MB per image; larger sides are downscaled server-side anyway.
    pub const OPENAI_MAX_BYTES: usize = 20_000_000;
    pub const OPENAI_MAX_DIMENSION: u32 = 2048;

    /// Anthropic rejects images above 5MB or 8000px on either side.
    pub const ANTHROPIC_MAX_BYTES: usize = 5_000_000;
    pub const ANTHROPIC_MAX_DIMENSION: u32 = 8000;

    /// Gemini caps inline request payloads at 20MB; base64 inflates by 4/3.
    pub const GEMINI_MAX_BYTES: usize = 20_000_000;
    pub const GEMINI_MAX_DIMENSION: u32 = 3072;
    pub const GEMINI_INLINE_MAX_BYTES: usize = 15_000_000;

    /// Anthropic requires `max_tokens` on every request.
    pub const ANTHROPIC_MAX_TOKENS: u32 = 1024;
}
