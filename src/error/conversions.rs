//! Conversions from library errors into the crate taxonomy.

use super::types::ImageError;

impl From<std::io::Error> for ImageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ImageError::SourceNotFound(err.to_string()),
            _ => ImageError::SourceUnreadable(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for ImageError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        // Redirect overflow is permanent; connection and timeout failures are not.
        let retryable = !err.is_redirect()
            && (err.is_timeout()
                || err.is_connect()
                || err.is_request()
                || err.is_body()
                || status.is_some_and(is_transient_status));
        ImageError::SourceFetchFailed {
            message: err.to_string(),
            status,
            retryable,
        }
    }
}

impl From<image::ImageError> for ImageError {
    fn from(err: image::ImageError) -> Self {
        ImageError::InvalidImage(err.to_string())
    }
}

/// 5xx and 429 are worth another attempt; other statuses are not.
pub(crate) const fn is_transient_status(status: u16) -> bool {
    status == 429 || status >= 500
}
