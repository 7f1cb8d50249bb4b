//! HTTP source configuration types.
//!
//! This module defines `HttpSourceConfig` and its builder, used to configure
//! timeouts, redirects and retries of image downloads.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::defaults;

/// HTTP source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSourceConfig {
    /// Request timeout (whole download)
    #[serde(with = "duration_option_serde")]
    pub timeout: Option<Duration>,
    /// Connection timeout
    #[serde(with = "duration_option_serde")]
    pub connect_timeout: Option<Duration>,
    /// Redirects followed before failing
    pub max_redirects: usize,
    /// Retries after the first attempt for transient failures
    pub retry_count: u32,
    /// Delay before the first retry
    #[serde(with = "duration_millis_serde")]
    pub initial_backoff: Duration,
    /// Upper bound for one backoff delay
    #[serde(with = "duration_millis_serde")]
    pub max_backoff: Duration,
    /// Add jitter to backoff delays
    pub use_jitter: bool,
    /// Custom headers sent with every download
    pub headers: HashMap<String, String>,
    /// User agent
    pub user_agent: Option<String>,
}

/// Builder for `HttpSourceConfig`
#[derive(Debug, Clone, Default)]
pub struct HttpSourceConfigBuilder {
    config: HttpSourceConfig,
}

impl HttpSourceConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole-download timeout; `None` disables it
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout = timeout;
        self
    }
    /// Connection timeout
    pub fn connect_timeout(mut self, connect_timeout: Option<Duration>) -> Self {
        self.config.connect_timeout = connect_timeout;
        self
    }
    /// Redirects followed before failing
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.max_redirects = max_redirects;
        self
    }
    /// Retries after the first attempt
    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.config.retry_count = retry_count;
        self
    }
    /// Initial and maximum backoff delay
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.initial_backoff = initial;
        self.config.max_backoff = max.max(initial);
        self
    }
    /// Randomize backoff delays
    pub fn jitter(mut self, use_jitter: bool) -> Self {
        self.config.use_jitter = use_jitter;
        self
    }
    /// User agent sent with each download
    pub fn user_agent<S: Into<String>>(mut self, user_agent: Option<S>) -> Self {
        self.config.user_agent = user_agent.map(|s| s.into());
        self
    }
    /// Add a header sent with each download
    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.config.headers.insert(key.into(), value.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> HttpSourceConfig {
        self.config
    }
}

impl HttpSourceConfig {
    /// Returns a builder for constructing `HttpSourceConfig`
    pub fn builder() -> HttpSourceConfigBuilder {
        HttpSourceConfigBuilder::new()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            timeout: Some(defaults::http::REQUEST_TIMEOUT),
            connect_timeout: Some(defaults::http::CONNECT_TIMEOUT),
            max_redirects: defaults::http::MAX_REDIRECTS,
            retry_count: defaults::retry::RETRY_COUNT,
            initial_backoff: defaults::retry::INITIAL_BACKOFF,
            max_backoff: defaults::retry::MAX_BACKOFF,
            use_jitter: true,
            headers: HashMap::new(),
            user_agent: Some(defaults::http::USER_AGENT.to_string()),
        }
    }
}

// Helper module for Duration serialization (seconds)
mod duration_option_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => d.as_secs_f64().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<f64> = Option::deserialize(deserializer)?;
        secs.map(Duration::try_from_secs_f64)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = HttpSourceConfig::builder()
            .timeout(Some(Duration::from_millis(250)))
            .retry_count(1)
            .max_redirects(0)
            .backoff(Duration::from_millis(10), Duration::from_millis(5))
            .header("x-test", "1")
            .build();
        assert_eq!(config.timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.retry_count, 1);
        assert_eq!(config.max_redirects, 0);
        assert_eq!(config.max_backoff, Duration::from_millis(10));
        assert_eq!(config.headers.get("x-test").map(String::as_str), Some("1"));
        assert_eq!(config.connect_timeout, Some(defaults::http::CONNECT_TIMEOUT));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: HttpSourceConfig =
            serde_json::from_str(r#"{"timeout": 1.5, "retry_count": 5, "initial_backoff": 50}"#)
                .unwrap();
        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.retry_count, 5);
        assert_eq!(config.initial_backoff, Duration::from_millis(50));
        assert_eq!(config.max_redirects, defaults::http::MAX_REDIRECTS);
    }
}
