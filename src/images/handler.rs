//! Image handler
//!
//! Ties sources, media detection, provider constraints and the resolver together.
//! Raw images are cached per reference and normalized images per
//! `(reference, provider)`, so a reference is fetched at most once per handler no
//! matter how many providers it is rendered for.

use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::try_join_all;
use tracing::debug;

use super::cache::{Lookup, SingleFlightCache};
use super::resolver::SizeConstraintResolver;
use crate::config::PicPromptConfig;
use crate::error::{ImageError, PromptError};
use crate::providers::{ProviderFactory, ProviderHelper};
use crate::sources::SourceRegistry;
use crate::types::{ImageReference, NormalizedImage, RawImage};
use crate::utils::MediaTypeDetector;

/// Counters for the normalization cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Normalized lookups served from the cache
    pub hits: u64,
    /// Normalized lookups that ran the resolver
    pub misses: u64,
    /// Source fetches actually performed
    pub fetches: u64,
    /// Cached `(reference, provider)` entries
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
}

impl Counters {
    fn record(&self, lookup: Lookup) {
        match lookup {
            Lookup::Hit => self.hits.fetch_add(1, Ordering::Relaxed),
            Lookup::Miss => self.misses.fetch_add(1, Ordering::Relaxed),
        };
    }
}

type NormalizedKey = (String, String);

#[derive(Debug)]
pub struct ImageHandler {
    sources: SourceRegistry,
    providers: ProviderFactory,
    resolver: SizeConstraintResolver,
    raw: SingleFlightCache<String, RawImage>,
    normalized: SingleFlightCache<NormalizedKey, NormalizedImage>,
    counters: Counters,
}

impl ImageHandler {
    /// Handler with default sources and the built-in providers.
    pub fn new() -> Result<Self, PromptError> {
        Ok(Self::with_parts(SourceRegistry::new()?, ProviderFactory::new()))
    }

    /// Handler built from a validated config: HTTP settings for the source
    /// registry and per-provider constraint overrides.
    pub fn from_config(config: &PicPromptConfig) -> Result<Self, PromptError> {
        config.validate()?;
        let sources = SourceRegistry::with_http_config(&config.http)?;
        let providers = ProviderFactory::new().with_overrides(&config.providers)?;
        Ok(Self::with_parts(sources, providers))
    }

    /// Handler over caller-assembled sources and providers, with empty caches.
    pub fn with_parts(sources: SourceRegistry, providers: ProviderFactory) -> Self {
        Self {
            sources,
            providers,
            resolver: SizeConstraintResolver::default(),
            raw: SingleFlightCache::new(),
            normalized: SingleFlightCache::new(),
            counters: Counters::default(),
        }
    }

    /// Replace the resolver, e.g. to bound the quality search differently.
    pub fn with_resolver(mut self, resolver: SizeConstraintResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn providers(&self) -> &ProviderFactory {
        &self.providers
    }

    /// Helper for `provider`; fails before any I/O for unknown names.
    pub fn helper(&self, provider: &str) -> Result<std::sync::Arc<dyn ProviderHelper>, PromptError> {
        self.providers.get(provider)
    }

    /// Snapshot of hit, miss and fetch counters.
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            entries: self.normalized.len(),
        }
    }

    fn normalize(&self, raw: &RawImage, helper: &dyn ProviderHelper) -> Result<NormalizedImage, ImageError> {
        let constraint = helper.constraint();
        MediaTypeDetector::ensure_allowed(raw.media_type, constraint)?;
        let image = self.resolver.resolve(raw, constraint)?;
        let Some(tighter) = helper.inline_fallback(&image) else {
            return Ok(image);
        };
        match self.resolver.resolve(raw, &tighter) {
            Ok(refitted) => {
                debug!(
                    target: "pic_prompt::handler",
                    reference = %raw.reference,
                    provider = helper.name(),
                    bytes = refitted.byte_length(),
                    "refitted for inline encoding"
                );
                Ok(refitted)
            }
            // Encoding reports the original as unsuitable for inline use.
            Err(ImageError::ImageTooLarge { .. }) => Ok(image),
            Err(e) => Err(e),
        }
    }

    fn fetch_raw(&self, reference: &ImageReference) -> Result<RawImage, ImageError> {
        self.raw
            .get_or_try_init(&reference.as_str().to_string(), || {
                self.counters.fetches.fetch_add(1, Ordering::Relaxed);
                debug!(target: "pic_prompt::handler", %reference, "fetching");
                self.sources.fetch(reference)
            })
            .map(|(raw, _)| raw)
    }

    async fn fetch_raw_async(&self, reference: &ImageReference) -> Result<RawImage, ImageError> {
        self.raw
            .get_or_try_init_async(&reference.as_str().to_string(), || async {
                self.counters.fetches.fetch_add(1, Ordering::Relaxed);
                debug!(target: "pic_prompt::handler", %reference, "fetching");
                self.sources.fetch_async(reference).await
            })
            .await
            .map(|(raw, _)| raw)
    }

    /// Fetch and detect without normalizing.
    pub fn get_raw(&self, reference: &ImageReference) -> Result<RawImage, PromptError> {
        self.fetch_raw(reference)
            .map_err(|e| PromptError::image(reference.as_str(), None, e))
    }

    /// Async variant of [`get_raw`](Self::get_raw).
    pub async fn get_raw_async(&self, reference: &ImageReference) -> Result<RawImage, PromptError> {
        self.fetch_raw_async(reference)
            .await
            .map_err(|e| PromptError::image(reference.as_str(), None, e))
    }

    /// Fetch, detect and fit `reference` to `provider`'s constraint.
    ///
    /// Concurrent callers for the same `(reference, provider)` share one resolution;
    /// errors carry the reference and the provider name.
    pub fn get_normalized(
        &self,
        reference: &ImageReference,
        provider: &str,
    ) -> Result<NormalizedImage, PromptError> {
        let helper = self.helper(provider)?;
        let key = (reference.as_str().to_string(), helper.name().to_string());
        let (image, lookup) = self
            .normalized
            .get_or_try_init(&key, || {
                let raw = self.fetch_raw(reference)?;
                self.normalize(&raw, helper.as_ref())
            })
            .map_err(|e| PromptError::image(reference.as_str(), Some(helper.name()), e))?;
        self.counters.record(lookup);
        debug!(target: "pic_prompt::handler", %reference, provider = helper.name(), ?lookup, "normalized");
        Ok(image)
    }

    /// Async variant of [`get_normalized`](Self::get_normalized).
    pub async fn get_normalized_async(
        &self,
        reference: &ImageReference,
        provider: &str,
    ) -> Result<NormalizedImage, PromptError> {
        let helper = self.helper(provider)?;
        let key = (reference.as_str().to_string(), helper.name().to_string());
        let (image, lookup) = self
            .normalized
            .get_or_try_init_async(&key, || async {
                let raw = self.fetch_raw_async(reference).await?;
                // Resolver work is CPU-bound and runs inline.
                self.normalize(&raw, helper.as_ref())
            })
            .await
            .map_err(|e| PromptError::image(reference.as_str(), Some(helper.name()), e))?;
        self.counters.record(lookup);
        debug!(target: "pic_prompt::handler", %reference, provider = helper.name(), ?lookup, "normalized");
        Ok(image)
    }

    /// Normalize many references concurrently; output order follows input order.
    /// The first failure is returned, tagged with its reference.
    pub async fn get_normalized_many(
        &self,
        references: &[ImageReference],
        provider: &str,
    ) -> Result<Vec<NormalizedImage>, PromptError> {
        self.helper(provider)?;
        try_join_all(
            references
                .iter()
                .map(|r| self.get_normalized_async(r, provider)),
        )
        .await
    }

    /// Fetch many references concurrently into the raw cache.
    pub async fn prefetch_many(
        &self,
        references: &[ImageReference],
    ) -> Result<Vec<RawImage>, PromptError> {
        try_join_all(references.iter().map(|r| self.get_raw_async(r))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::MediaType;
    use std::io::Write;

    fn png_file() -> tempfile::NamedTempFile {
        let img = image::RgbImage::from_pixel(8, 4, image::Rgb([10, 20, 30]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(bytes.get_ref()).unwrap();
        file
    }

    #[test]
    fn caches_per_reference_and_provider() {
        let file = png_file();
        let reference = ImageReference::parse(file.path().to_string_lossy()).unwrap();
        let handler = ImageHandler::new().unwrap();

        let first = handler.get_normalized(&reference, "openai").unwrap();
        assert_eq!(first.media_type, MediaType::Png);
        assert_eq!((first.width, first.height), (8, 4));
        let again = handler.get_normalized(&reference, "OpenAI").unwrap();
        assert_eq!(first, again);
        handler.get_normalized(&reference, "anthropic").unwrap();

        let stats = handler.cache_stats();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 2);
    }

    #[test]
    fn unknown_provider_fails_before_fetch() {
        let handler = ImageHandler::new().unwrap();
        let reference = ImageReference::parse("/missing/file.png").unwrap();
        let err = handler.get_normalized(&reference, "nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownProvider);
        assert_eq!(handler.cache_stats().fetches, 0);
    }

    #[test]
    fn errors_are_tagged_with_reference_and_provider() {
        let handler = ImageHandler::new().unwrap();
        let reference = ImageReference::parse("/missing/file.png").unwrap();
        let err = handler.get_normalized(&reference, "gemini").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceNotFound);
        assert_eq!(err.reference(), Some("/missing/file.png"));
        assert_eq!(err.provider(), Some("gemini"));
    }

    #[test]
    fn gemini_refits_local_images_above_inline_limit() {
        let mut state: u32 = 0x9E37_79B9;
        let noisy = image::RgbImage::from_fn(64, 64, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            image::Rgb([r, g, b])
        });
        let mut bytes = std::io::Cursor::new(Vec::new());
        noisy.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        let png = bytes.into_inner();
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&png).unwrap();
        let reference = ImageReference::parse(file.path().to_string_lossy()).unwrap();

        let limit = png.len() / 2;
        let config = PicPromptConfig::new().with_provider_overrides(
            "gemini",
            crate::types::ConstraintOverrides {
                inline_max_bytes: Some(limit),
                ..Default::default()
            },
        );
        let handler = ImageHandler::from_config(&config).unwrap();

        let image = handler.get_normalized(&reference, "gemini").unwrap();
        assert!(image.transformed);
        assert_eq!(image.media_type, MediaType::Jpeg);
        assert!(image.byte_length() <= limit);

        let helper = handler.helper("gemini").unwrap();
        let fragment = helper
            .encode_image(&image, crate::providers::EncodeMode::Preview)
            .unwrap();
        assert_eq!(fragment["inline_data"]["mime_type"], "image/jpeg");

        let untouched = handler.get_normalized(&reference, "openai").unwrap();
        assert!(!untouched.transformed);
    }

    #[tokio::test]
    async fn disallowed_media_type_is_rejected() {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Gif).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes.get_ref()).unwrap();
        let reference = ImageReference::parse(file.path().to_string_lossy()).unwrap();

        let handler = ImageHandler::new().unwrap();
        let err = handler
            .get_normalized_async(&reference, "gemini")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedMediaType);
        assert!(handler.get_normalized_async(&reference, "openai").await.is_ok());
    }
}
