//! Size-constraint resolver
//!
//! Fits raw image bytes into a provider's byte and dimension budget. Images that
//! already fit are returned untouched. Oversized images are downscaled to the
//! dimension limit and, if still too heavy, recompressed as JPEG along a fixed
//! quality ladder. The search is deterministic: equal inputs give equal bytes.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use tracing::{debug, info};

use crate::defaults;
use crate::error::ImageError;
use crate::types::{MediaType, NormalizedImage, ProviderConstraint, RawImage};

/// Descending JPEG qualities: `floor + (q - floor) / 2`, ending at the floor.
#[derive(Debug, Clone)]
pub struct QualitySteps {
    next: Option<u8>,
    floor: u8,
    emitted: usize,
    max_steps: usize,
}

impl QualitySteps {
    pub fn new(initial: u8, floor: u8, max_steps: usize) -> Self {
        let floor = floor.min(initial);
        Self {
            next: (max_steps > 0).then_some(initial),
            floor,
            emitted: 0,
            max_steps,
        }
    }
}

impl Iterator for QualitySteps {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let q = self.next?;
        self.emitted += 1;
        self.next = if q <= self.floor || self.emitted >= self.max_steps {
            None
        } else if self.emitted + 1 == self.max_steps {
            Some(self.floor)
        } else {
            Some(self.floor + (q - self.floor) / 2)
        };
        Some(q)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SizeConstraintResolver {
    max_quality_steps: usize,
}

impl Default for SizeConstraintResolver {
    fn default() -> Self {
        Self {
            max_quality_steps: defaults::quality::MAX_QUALITY_STEPS,
        }
    }
}

impl SizeConstraintResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of JPEG encodes per image (at least one).
    pub fn with_max_quality_steps(mut self, steps: usize) -> Self {
        self.max_quality_steps = steps.max(1);
        self
    }

    /// Quality ladder the resolver walks for `constraint`.
    pub fn quality_steps(&self, constraint: &ProviderConstraint) -> QualitySteps {
        QualitySteps::new(
            constraint.initial_quality,
            constraint.min_quality_floor,
            self.max_quality_steps,
        )
    }

    /// Fit `raw` into `constraint`, or fail with `ImageTooLarge`.
    ///
    /// Untouched when already within budget; otherwise downscaled and, if still
    /// too large, recompressed as JPEG. Equal inputs give byte-identical output.
    pub fn resolve(
        &self,
        raw: &RawImage,
        constraint: &ProviderConstraint,
    ) -> Result<NormalizedImage, ImageError> {
        let format = raw.media_type.image_format();
        let (width, height) = ImageReader::with_format(Cursor::new(&raw.data[..]), format)
            .into_dimensions()?;

        if constraint.is_satisfied_by(raw.byte_length(), width, height) {
            debug!(target: "pic_prompt::resolver", reference = %raw.reference, bytes = raw.byte_length(), "within budget");
            return Ok(NormalizedImage {
                reference: raw.reference.clone(),
                data: raw.data.clone(),
                media_type: raw.media_type,
                width,
                height,
                transformed: false,
            });
        }

        let mut img = ImageReader::with_format(Cursor::new(&raw.data[..]), format).decode()?;
        let resized = width.max(height) > constraint.max_dimension;
        if resized {
            img = img.resize(
                constraint.max_dimension,
                constraint.max_dimension,
                FilterType::Lanczos3,
            );
            info!(
                target: "pic_prompt::resolver",
                reference = %raw.reference,
                from = ?(width, height),
                to = ?img.dimensions(),
                "downscaled image"
            );
        }

        let mut smallest = raw.byte_length();

        // A resize alone keeps the source format; JPEG sources go straight to the ladder.
        if resized && raw.media_type != MediaType::Jpeg {
            let encoded = encode_as(&img, raw.media_type)?;
            if encoded.len() <= constraint.max_bytes {
                return Ok(normalized(raw, img.dimensions(), encoded, raw.media_type));
            }
            smallest = smallest.min(encoded.len());
        }

        if !constraint.allows(MediaType::Jpeg) {
            return Err(ImageError::ImageTooLarge {
                byte_length: smallest,
                max_bytes: constraint.max_bytes,
            });
        }

        let rgb = img.to_rgb8();
        for quality in self.quality_steps(constraint) {
            let encoded = encode_jpeg(&rgb, quality)?;
            debug!(target: "pic_prompt::resolver", quality, bytes = encoded.len(), "jpeg attempt");
            if encoded.len() <= constraint.max_bytes {
                info!(
                    target: "pic_prompt::resolver",
                    reference = %raw.reference,
                    quality,
                    from = raw.byte_length(),
                    to = encoded.len(),
                    "recompressed image"
                );
                return Ok(normalized(raw, img.dimensions(), encoded, MediaType::Jpeg));
            }
            smallest = smallest.min(encoded.len());
        }

        Err(ImageError::ImageTooLarge {
            byte_length: smallest,
            max_bytes: constraint.max_bytes,
        })
    }
}

fn normalized(raw: &RawImage, (width, height): (u32, u32), data: Vec<u8>, media_type: MediaType) -> NormalizedImage {
    NormalizedImage {
        reference: raw.reference.clone(),
        data: Bytes::from(data),
        media_type,
        width,
        height,
        transformed: true,
    }
}

fn encode_as(img: &DynamicImage, media_type: MediaType) -> Result<Vec<u8>, ImageError> {
    let mut out = Cursor::new(Vec::new());
    match media_type {
        MediaType::Jpeg => return encode_jpeg(&img.to_rgb8(), defaults::quality::INITIAL_QUALITY),
        MediaType::Png => img.write_to(&mut out, media_type.image_format())?,
        // GIF and WebP encoders take 8-bit RGBA only.
        MediaType::Gif | MediaType::Webp => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_to(&mut out, media_type.image_format())?,
    }
    Ok(out.into_inner())
}

fn encode_jpeg(rgb: &image::RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(rgb)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageReference;
    use image::{ImageFormat, Rgb, RgbImage};

    fn noisy(width: u32, height: u32) -> DynamicImage {
        // Deterministic high-entropy pattern so JPEG cannot compress it trivially.
        let mut state: u32 = 0x1234_5678;
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgb([r, g, b])
        }))
    }

    fn raw(img: &DynamicImage, format: ImageFormat, media_type: MediaType) -> RawImage {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        RawImage {
            reference: ImageReference::parse("fixture").unwrap(),
            data: Bytes::from(out.into_inner()),
            media_type,
        }
    }

    #[test]
    fn quality_ladder_halves_towards_floor() {
        let steps: Vec<u8> = QualitySteps::new(85, 20, 8).collect();
        assert_eq!(steps, vec![85, 52, 36, 28, 24, 22, 21, 20]);

        let bounded: Vec<u8> = QualitySteps::new(100, 1, 3).collect();
        assert_eq!(bounded, vec![100, 50, 1]);

        assert_eq!(QualitySteps::new(20, 20, 8).collect::<Vec<_>>(), vec![20]);
    }

    #[test]
    fn step_limit_bounds_the_ladder() {
        let c = ProviderConstraint::new(1, 1, MediaType::ALL.to_vec());
        let resolver = SizeConstraintResolver::new().with_max_quality_steps(2);
        assert_eq!(resolver.quality_steps(&c).collect::<Vec<_>>(), vec![85, 20]);

        let at_least_one = SizeConstraintResolver::new().with_max_quality_steps(0);
        assert_eq!(at_least_one.quality_steps(&c).collect::<Vec<_>>(), vec![85]);
    }

    #[test]
    fn fast_path_returns_same_bytes() {
        let raw = raw(&noisy(16, 16), ImageFormat::Png, MediaType::Png);
        let c = ProviderConstraint::new(raw.byte_length(), 16, vec![MediaType::Png]);
        let out = SizeConstraintResolver::new().resolve(&raw, &c).unwrap();
        assert!(!out.transformed);
        assert_eq!(out.data, raw.data);
        assert_eq!((out.width, out.height), (16, 16));
    }

    #[tracing_test::traced_test]
    #[test]
    fn downscale_keeps_aspect_ratio_and_format() {
        let raw = raw(&noisy(64, 32), ImageFormat::Png, MediaType::Png);
        let c = ProviderConstraint::new(usize::MAX, 16, vec![MediaType::Png]);
        let out = SizeConstraintResolver::new().resolve(&raw, &c).unwrap();
        assert!(out.transformed);
        assert_eq!(out.media_type, MediaType::Png);
        assert_eq!((out.width, out.height), (16, 8));
        assert!(logs_contain("downscaled image"));
    }

    #[test]
    fn recompresses_png_to_jpeg_when_over_bytes() {
        let raw = raw(&noisy(64, 64), ImageFormat::Png, MediaType::Png);
        let budget = raw.byte_length() / 2;
        let c = ProviderConstraint::new(budget, 64, MediaType::ALL.to_vec());
        let out = SizeConstraintResolver::new().resolve(&raw, &c).unwrap();
        assert_eq!(out.media_type, MediaType::Jpeg);
        assert!(out.byte_length() <= budget);
    }

    #[test]
    fn too_large_when_jpeg_not_allowed_or_floor_reached() {
        let raw = raw(&noisy(64, 64), ImageFormat::Png, MediaType::Png);
        let c = ProviderConstraint::new(100, 64, vec![MediaType::Png]);
        assert!(matches!(
            SizeConstraintResolver::new().resolve(&raw, &c),
            Err(ImageError::ImageTooLarge { max_bytes: 100, .. })
        ));

        let c = ProviderConstraint::new(100, 64, MediaType::ALL.to_vec());
        let err = SizeConstraintResolver::new().resolve(&raw, &c).unwrap_err();
        match err {
            ImageError::ImageTooLarge { byte_length, max_bytes } => {
                assert_eq!(max_bytes, 100);
                assert!(byte_length > 100);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn undecodable_bytes_are_invalid_image() {
        let raw = RawImage {
            reference: ImageReference::parse("broken.png").unwrap(),
            data: Bytes::from_static(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2]),
            media_type: MediaType::Png,
        };
        let c = ProviderConstraint::new(1, 1, MediaType::ALL.to_vec());
        assert!(matches!(
            SizeConstraintResolver::new().resolve(&raw, &c),
            Err(ImageError::InvalidImage(_))
        ));
    }
}
