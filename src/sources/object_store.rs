//! Object-store source (`s3://bucket/key`, `gs://bucket/key`).
//!
//! The store API itself is supplied by the caller through `ObjectStoreClient`, which
//! owns credentials and endpoint configuration. Failures are never retried here.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::{FetchedImage, ImageSource};
use crate::error::ImageError;
use crate::types::{ImageReference, ReferenceScheme};

/// Failures reported by an object-store client.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ObjectStoreError {
    #[error("object not found")]
    NotFound,
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("{0}")]
    Other(String),
}

/// Bucket/key GET against some object store.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync + Debug {
    fn get_object(&self, bucket: &str, key: &str) -> Result<FetchedImage, ObjectStoreError>;

    async fn get_object_async(&self, bucket: &str, key: &str)
    -> Result<FetchedImage, ObjectStoreError>;
}

#[derive(Debug, Clone)]
pub struct ObjectStoreSource {
    store: String,
    client: Arc<dyn ObjectStoreClient>,
}

impl ObjectStoreSource {
    pub fn new<S: Into<String>>(store: S, client: Arc<dyn ObjectStoreClient>) -> Self {
        Self {
            store: store.into(),
            client,
        }
    }

    fn location<'a>(&self, reference: &'a ImageReference) -> Result<(&'a str, &'a str), ImageError> {
        match reference.scheme() {
            ReferenceScheme::ObjectStore { store, bucket, key } if *store == self.store => {
                Ok((bucket, key))
            }
            _ => Err(ImageError::UnsupportedReference(reference.to_string())),
        }
    }
}

fn map_error(reference: &ImageReference, err: ObjectStoreError) -> ImageError {
    match err {
        ObjectStoreError::NotFound => ImageError::SourceNotFound(reference.to_string()),
        ObjectStoreError::AccessDenied(msg) => {
            ImageError::SourceAccessDenied(format!("{reference}: {msg}"))
        }
        ObjectStoreError::Other(msg) => ImageError::fetch_failed(msg, None, false),
    }
}

#[async_trait]
impl ImageSource for ObjectStoreSource {
    fn fetch(&self, reference: &ImageReference) -> Result<FetchedImage, ImageError> {
        let (bucket, key) = self.location(reference)?;
        debug!(target: "pic_prompt::sources", store = %self.store, %bucket, %key, "get object");
        self.client
            .get_object(bucket, key)
            .map_err(|e| map_error(reference, e))
    }

    async fn fetch_async(&self, reference: &ImageReference) -> Result<FetchedImage, ImageError> {
        let (bucket, key) = self.location(reference)?;
        debug!(target: "pic_prompt::sources", store = %self.store, %bucket, %key, "get object");
        self.client
            .get_object_async(bucket, key)
            .await
            .map_err(|e| map_error(reference, e))
    }
}
