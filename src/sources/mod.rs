//! Image sources
//!
//! One `ImageSource` per reference scheme. Sources only retrieve bytes; media type
//! detection runs afterwards on the fetched bytes so blocking and async fetches
//! share the same post-processing.

pub mod http;
pub mod local;
pub mod object_store;

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ImageError, PromptError};
use crate::types::{HttpSourceConfig, ImageReference, RawImage};
use crate::utils::MediaTypeDetector;

pub use http::HttpSource;
pub use local::LocalFileSource;
pub use object_store::{ObjectStoreClient, ObjectStoreError, ObjectStoreSource};

/// Bytes as returned by a source, plus the content type it declared (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedImage {
    pub data: Bytes,
    pub content_type: Option<String>,
}

impl FetchedImage {
    pub fn new<B: Into<Bytes>>(data: B) -> Self {
        Self {
            data: data.into(),
            content_type: None,
        }
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Retrieves image bytes for one reference scheme.
///
/// `fetch` and `fetch_async` must return equivalent results for the same reference.
#[async_trait]
pub trait ImageSource: Send + Sync + Debug {
    /// Blocking fetch; must not be called from inside an async runtime.
    fn fetch(&self, reference: &ImageReference) -> Result<FetchedImage, ImageError>;

    async fn fetch_async(&self, reference: &ImageReference) -> Result<FetchedImage, ImageError>;
}

/// Sources keyed by scheme name (`file`, `http`, `s3`, `gs`, ...).
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn ImageSource>>,
}

impl SourceRegistry {
    /// Local and HTTP(S) sources with default settings.
    pub fn new() -> Result<Self, PromptError> {
        Self::with_http_config(&HttpSourceConfig::default())
    }

    /// Local and HTTP(S) sources, the latter configured by `config`.
    pub fn with_http_config(config: &HttpSourceConfig) -> Result<Self, PromptError> {
        let mut registry = Self::empty();
        registry.register("file", Arc::new(LocalFileSource));
        registry.register("http", Arc::new(HttpSource::new(config.clone())?));
        Ok(registry)
    }

    /// Registry with no sources.
    pub fn empty() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// Add or replace the source serving `scheme`.
    pub fn register<S: Into<String>>(&mut self, scheme: S, source: Arc<dyn ImageSource>) {
        self.sources
            .insert(scheme.into().to_ascii_lowercase(), source);
    }

    /// Register `s3://` and `gs://` backed by the given client.
    pub fn with_object_store(mut self, client: Arc<dyn ObjectStoreClient>) -> Self {
        for store in ["s3", "gs"] {
            self.register(
                store,
                Arc::new(ObjectStoreSource::new(store, client.clone())),
            );
        }
        self
    }

    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Source for the reference's scheme, or `UnsupportedReference`.
    pub fn source_for(&self, reference: &ImageReference) -> Result<&Arc<dyn ImageSource>, ImageError> {
        self.sources
            .get(reference.scheme_name())
            .ok_or_else(|| ImageError::UnsupportedReference(reference.to_string()))
    }

    /// Fetch and detect the media type, blocking.
    pub fn fetch(&self, reference: &ImageReference) -> Result<RawImage, ImageError> {
        let fetched = self.source_for(reference)?.fetch(reference)?;
        into_raw(reference, fetched)
    }

    pub async fn fetch_async(&self, reference: &ImageReference) -> Result<RawImage, ImageError> {
        let fetched = self.source_for(reference)?.fetch_async(reference).await?;
        into_raw(reference, fetched)
    }
}

/// Detect the media type of fetched bytes; the declared content type is tried
/// before the reference's own extension.
fn into_raw(reference: &ImageReference, fetched: FetchedImage) -> Result<RawImage, ImageError> {
    let media_type = MediaTypeDetector::detect(&fetched.data, fetched.content_type.as_deref())
        .or_else(|_| MediaTypeDetector::detect(&fetched.data, Some(reference.hint())))?;
    Ok(RawImage {
        reference: reference.clone(),
        data: fetched.data,
        media_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaType;

    #[test]
    fn missing_scheme_is_unsupported() {
        let registry = SourceRegistry::new().unwrap();
        assert_eq!(registry.schemes(), vec!["file", "http"]);

        let reference = ImageReference::parse("s3://bucket/key.png").unwrap();
        assert!(matches!(
            registry.fetch(&reference),
            Err(ImageError::UnsupportedReference(_))
        ));
    }

    #[test]
    fn octet_stream_header_falls_back_to_extension() {
        let reference = ImageReference::parse("https://example.com/a.webp").unwrap();
        let fetched = FetchedImage::new(&b"????"[..]).with_content_type("application/octet-stream");
        let raw = into_raw(&reference, fetched).unwrap();
        assert_eq!(raw.media_type, MediaType::Webp);
    }
}
