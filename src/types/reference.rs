//! Image references and their schemes.

use std::fmt;

use crate::error::ImageError;

/// Where an image lives, inferred from the reference string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceScheme {
    /// Filesystem path (bare path or `file://`)
    Local { path: String },
    /// `http://` or `https://` URL
    Http,
    /// `s3://bucket/key` or `gs://bucket/key`
    ObjectStore {
        store: String,
        bucket: String,
        key: String,
    },
}

/// Caller-supplied image location. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    raw: String,
    scheme: ReferenceScheme,
}

impl ImageReference {
    /// Classify a reference by scheme prefix (case-insensitive).
    ///
    /// `s3://` and `gs://` need both a bucket and a key.
    pub fn parse<S: Into<String>>(reference: S) -> Result<Self, ImageError> {
        let raw = reference.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ImageError::InvalidReference("empty reference".to_string()));
        }

        let lower = trimmed.to_ascii_lowercase();
        let scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
            ReferenceScheme::Http
        } else if let Some((store, rest)) = ["s3://", "gs://"]
            .iter()
            .copied()
            .find_map(|p| lower.starts_with(p).then(|| (&p[..2], &trimmed[p.len()..])))
        {
            let (bucket, key) = rest
                .split_once('/')
                .filter(|(b, k)| !b.is_empty() && !k.is_empty())
                .ok_or_else(|| {
                    ImageError::InvalidReference(format!("expected {store}://bucket/key, got {raw}"))
                })?;
            ReferenceScheme::ObjectStore {
                store: store.to_string(),
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
        } else if lower.starts_with("file://") {
            ReferenceScheme::Local {
                path: trimmed["file://".len()..].to_string(),
            }
        } else {
            ReferenceScheme::Local {
                path: trimmed.to_string(),
            }
        };

        Ok(Self { raw, scheme })
    }

    /// The reference exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &ReferenceScheme {
        &self.scheme
    }

    /// Registry key of the source able to serve this reference.
    pub fn scheme_name(&self) -> &str {
        match &self.scheme {
            ReferenceScheme::Local { .. } => "file",
            ReferenceScheme::Http => "http",
            ReferenceScheme::ObjectStore { store, .. } => store,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.scheme, ReferenceScheme::Local { .. })
    }

    /// Extension-bearing part of the reference, used as a media type hint.
    pub fn hint(&self) -> &str {
        match &self.scheme {
            ReferenceScheme::Local { path } => path,
            ReferenceScheme::ObjectStore { key, .. } => key,
            ReferenceScheme::Http => self.raw.trim(),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<&str> for ImageReference {
    type Error = ImageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
