//! Media type detection utilities

use crate::error::ImageError;
use crate::types::{MediaType, ProviderConstraint};

/// Resolves the media type of fetched bytes.
///
/// Magic-number sniffing wins over any hint; a hint (content-type header or
/// path/URL extension) is only consulted when the bytes are not recognized.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaTypeDetector;

impl MediaTypeDetector {
    pub fn detect(bytes: &[u8], hint: Option<&str>) -> Result<MediaType, ImageError> {
        if let Some(kind) = infer::get(bytes) {
            // Recognized but unsupported content is rejected, not overridden by the hint.
            return MediaType::from_mime(kind.mime_type())
                .ok_or_else(|| ImageError::UnsupportedMediaType(kind.mime_type().to_string()));
        }

        let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) else {
            return Err(ImageError::UnsupportedMediaType(
                "unrecognized content without hint".to_string(),
            ));
        };

        if let Some(media_type) = MediaType::from_mime(hint) {
            return Ok(media_type);
        }

        guess_from_path_or_url(hint)
            .and_then(|m| MediaType::from_mime(&m))
            .ok_or_else(|| ImageError::UnsupportedMediaType(hint.to_string()))
    }

    /// Check the detected type against what a provider accepts.
    pub fn ensure_allowed(
        media_type: MediaType,
        constraint: &ProviderConstraint,
    ) -> Result<MediaType, ImageError> {
        if constraint.allows(media_type) {
            Ok(media_type)
        } else {
            Err(ImageError::UnsupportedMediaType(media_type.to_string()))
        }
    }
}

/// Guess MIME by file path or URL (extension-based); query and fragment are ignored.
fn guess_from_path_or_url(path_or_url: &str) -> Option<String> {
    let path = path_or_url
        .split(['?', '#'])
        .next()
        .unwrap_or(path_or_url);
    mime_guess::from_path(path).first_raw().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn sniffed_content_wins_over_extension() {
        let detected = MediaTypeDetector::detect(PNG_SIGNATURE, Some("photo.jpg")).unwrap();
        assert_eq!(detected, MediaType::Png);

        let detected = MediaTypeDetector::detect(JPEG_SIGNATURE, Some("image/png")).unwrap();
        assert_eq!(detected, MediaType::Jpeg);
    }

    #[test]
    fn falls_back_to_hint() {
        let unknown = b"not an image header";
        assert_eq!(
            MediaTypeDetector::detect(unknown, Some("image/webp; q=1")).unwrap(),
            MediaType::Webp
        );
        assert_eq!(
            MediaTypeDetector::detect(unknown, Some("https://cdn.example.com/a.gif?v=2")).unwrap(),
            MediaType::Gif
        );
    }

    #[test]
    fn rejects_unknown_and_unsupported() {
        assert!(matches!(
            MediaTypeDetector::detect(b"plain", None),
            Err(ImageError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            MediaTypeDetector::detect(b"plain", Some("notes.txt")),
            Err(ImageError::UnsupportedMediaType(_))
        ));
        // PDF magic is recognized and not an accepted image type.
        assert!(matches!(
            MediaTypeDetector::detect(b"%PDF-1.7\n", Some("scan.png")),
            Err(ImageError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn ensure_allowed_checks_constraint() {
        let c = ProviderConstraint::new(10, 10, vec![MediaType::Png]);
        assert!(MediaTypeDetector::ensure_allowed(MediaType::Png, &c).is_ok());
        assert!(MediaTypeDetector::ensure_allowed(MediaType::Gif, &c).is_err());
    }
}
