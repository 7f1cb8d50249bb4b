//! Local filesystem source.

use async_trait::async_trait;
use tracing::debug;

use super::{FetchedImage, ImageSource};
use crate::error::ImageError;
use crate::types::{ImageReference, ReferenceScheme};

/// Reads bare paths and `file://` references.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSource;

fn local_path(reference: &ImageReference) -> Result<&str, ImageError> {
    match reference.scheme() {
        ReferenceScheme::Local { path } => Ok(path),
        _ => Err(ImageError::UnsupportedReference(reference.to_string())),
    }
}

fn with_path(path: &str, err: std::io::Error) -> ImageError {
    match ImageError::from(err) {
        ImageError::SourceNotFound(_) => ImageError::SourceNotFound(path.to_string()),
        ImageError::SourceUnreadable(msg) => ImageError::SourceUnreadable(format!("{path}: {msg}")),
        other => other,
    }
}

#[async_trait]
impl ImageSource for LocalFileSource {
    fn fetch(&self, reference: &ImageReference) -> Result<FetchedImage, ImageError> {
        let path = local_path(reference)?;
        debug!(target: "pic_prompt::sources", %path, "reading local image");
        let data = std::fs::read(path).map_err(|e| with_path(path, e))?;
        Ok(FetchedImage::new(data))
    }

    async fn fetch_async(&self, reference: &ImageReference) -> Result<FetchedImage, ImageError> {
        let path = local_path(reference)?;
        debug!(target: "pic_prompt::sources", %path, "reading local image");
        let data = tokio::fs::read(path).await.map_err(|e| with_path(path, e))?;
        Ok(FetchedImage::new(data))
    }
}
