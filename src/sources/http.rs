//! HTTP(S) source
//!
//! GET with bounded redirects, connect/read timeouts and retries for transient
//! failures (timeouts, connection errors, 5xx, 429). Client errors are returned on
//! the first attempt.

use std::sync::OnceLock;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, redirect};
use tracing::debug;

use super::{FetchedImage, ImageSource};
use crate::error::conversions::is_transient_status;
use crate::error::{ImageError, PromptError};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::types::{HttpSourceConfig, ImageReference};

pub struct HttpSource {
    config: HttpSourceConfig,
    headers: HeaderMap,
    client: reqwest::Client,
    // Built on first blocking fetch; a blocking client must not be created inside a runtime.
    blocking: OnceLock<reqwest::blocking::Client>,
    retry: RetryExecutor,
}

impl std::fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpSource {
    pub fn new(config: HttpSourceConfig) -> Result<Self, PromptError> {
        let headers = header_map(&config)?;

        let mut builder = reqwest::Client::builder()
            .redirect(redirect::Policy::limited(config.max_redirects))
            .default_headers(headers.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder
            .build()
            .map_err(|e| PromptError::InvalidConfig(format!("failed to build http client: {e}")))?;

        let retry = RetryExecutor::new(RetryPolicy::from_http_config(&config));
        Ok(Self {
            config,
            headers,
            client,
            blocking: OnceLock::new(),
            retry,
        })
    }

    pub fn config(&self) -> &HttpSourceConfig {
        &self.config
    }

    fn blocking_client(&self) -> Result<&reqwest::blocking::Client, ImageError> {
        if let Some(client) = self.blocking.get() {
            return Ok(client);
        }
        let mut builder = reqwest::blocking::Client::builder()
            .redirect(redirect::Policy::limited(self.config.max_redirects))
            .default_headers(self.headers.clone())
            .timeout(self.config.timeout);
        if let Some(connect_timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(user_agent) = &self.config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder.build().map_err(|e| {
            ImageError::fetch_failed(format!("failed to build http client: {e}"), None, false)
        })?;
        Ok(self.blocking.get_or_init(|| client))
    }
}

fn header_map(config: &HttpSourceConfig) -> Result<HeaderMap, PromptError> {
    let mut headers = HeaderMap::new();
    for (k, v) in &config.headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|e| PromptError::InvalidConfig(format!("Invalid header name '{k}': {e}")))?;
        let value = HeaderValue::from_str(v)
            .map_err(|e| PromptError::InvalidConfig(format!("Invalid header value for '{k}': {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn status_error(url: &str, status: StatusCode) -> ImageError {
    ImageError::fetch_failed(
        format!("GET {url} returned HTTP {status}"),
        Some(status.as_u16()),
        is_transient_status(status.as_u16()),
    )
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl ImageSource for HttpSource {
    fn fetch(&self, reference: &ImageReference) -> Result<FetchedImage, ImageError> {
        let url = reference.as_str().trim();
        let client = self.blocking_client()?;
        self.retry.execute_blocking(url, || {
            debug!(target: "pic_prompt::sources", %url, "GET");
            let response = client.get(url).send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(status_error(url, status));
            }
            let content_type = content_type(response.headers());
            let data = response.bytes()?;
            Ok(FetchedImage { data, content_type })
        })
    }

    async fn fetch_async(&self, reference: &ImageReference) -> Result<FetchedImage, ImageError> {
        let url = reference.as_str().trim();
        self.retry
            .execute(url, || async move {
                debug!(target: "pic_prompt::sources", %url, "GET");
                let response = self.client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(status_error(url, status));
                }
                let content_type = content_type(response.headers());
                let data = response.bytes().await?;
                Ok(FetchedImage { data, content_type })
            })
            .await
    }
}
