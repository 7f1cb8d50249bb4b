//! Raw and normalized image payloads.

use std::fmt;

use base64::Engine;
use bytes::Bytes;

use super::{ImageReference, MediaType};

/// Bytes as fetched, with the media type the detector settled on.
#[derive(Clone, PartialEq)]
pub struct RawImage {
    pub reference: ImageReference,
    pub data: Bytes,
    pub media_type: MediaType,
}

impl RawImage {
    pub fn byte_length(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Debug for RawImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawImage")
            .field("reference", &self.reference.as_str())
            .field("media_type", &self.media_type)
            .field("byte_length", &self.byte_length())
            .finish()
    }
}

/// Image bytes that satisfy one provider's constraint.
#[derive(Clone, PartialEq)]
pub struct NormalizedImage {
    pub reference: ImageReference,
    pub data: Bytes,
    pub media_type: MediaType,
    pub width: u32,
    pub height: u32,
    /// False when the raw bytes were passed through untouched.
    pub transformed: bool,
}

impl NormalizedImage {
    pub fn byte_length(&self) -> usize {
        self.data.len()
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

impl fmt::Debug for NormalizedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedImage")
            .field("reference", &self.reference.as_str())
            .field("media_type", &self.media_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("byte_length", &self.byte_length())
            .field("transformed", &self.transformed)
            .finish()
    }
}
