//! Provider image constraints.

use serde::{Deserialize, Serialize};

use super::MediaType;
use crate::defaults;

/// How a helper prefers to ship image bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PreferredEncoding {
    #[default]
    InlineBase64,
    UploadReference,
}

/// Size and format rules one provider imposes on image inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConstraint {
    pub max_bytes: usize,
    pub max_dimension: u32,
    pub allowed_media_types: Vec<MediaType>,
    #[serde(default)]
    pub preferred_encoding: PreferredEncoding,
    /// Above this size an upload reference is used instead of inline data.
    #[serde(default)]
    pub inline_max_bytes: Option<usize>,
    #[serde(default = "default_initial_quality")]
    pub initial_quality: u8,
    #[serde(default = "default_min_quality_floor")]
    pub min_quality_floor: u8,
}

fn default_initial_quality() -> u8 {
    defaults::quality::INITIAL_QUALITY
}

fn default_min_quality_floor() -> u8 {
    defaults::quality::MIN_QUALITY_FLOOR
}

impl ProviderConstraint {
    pub fn new(max_bytes: usize, max_dimension: u32, allowed_media_types: Vec<MediaType>) -> Self {
        Self {
            max_bytes,
            max_dimension,
            allowed_media_types,
            preferred_encoding: PreferredEncoding::InlineBase64,
            inline_max_bytes: None,
            initial_quality: defaults::quality::INITIAL_QUALITY,
            min_quality_floor: defaults::quality::MIN_QUALITY_FLOOR,
        }
    }

    pub const fn with_preferred_encoding(mut self, encoding: PreferredEncoding) -> Self {
        self.preferred_encoding = encoding;
        self
    }

    pub const fn with_inline_max_bytes(mut self, limit: usize) -> Self {
        self.inline_max_bytes = Some(limit);
        self
    }

    /// Set the quality range of the recompression search.
    pub fn with_quality_range(mut self, initial: u8, floor: u8) -> Self {
        self.initial_quality = initial.clamp(1, 100);
        self.min_quality_floor = floor.clamp(1, self.initial_quality);
        self
    }

    pub fn allows(&self, media_type: MediaType) -> bool {
        self.allowed_media_types.contains(&media_type)
    }

    /// Whether an image of `byte_length` and `(width, height)` needs no work.
    pub fn is_satisfied_by(&self, byte_length: usize, width: u32, height: u32) -> bool {
        byte_length <= self.max_bytes && width.max(height) <= self.max_dimension
    }

    /// Encoding strategy for an image of `byte_length` bytes.
    pub fn encoding_for(&self, byte_length: usize) -> PreferredEncoding {
        match (self.preferred_encoding, self.inline_max_bytes) {
            (PreferredEncoding::UploadReference, _) => PreferredEncoding::UploadReference,
            (_, Some(limit)) if byte_length > limit => PreferredEncoding::UploadReference,
            _ => PreferredEncoding::InlineBase64,
        }
    }

    /// Apply configured overrides on top of this constraint.
    pub fn apply(mut self, overrides: &ConstraintOverrides) -> Self {
        if let Some(v) = overrides.max_bytes {
            self.max_bytes = v;
        }
        if let Some(v) = overrides.max_dimension {
            self.max_dimension = v;
        }
        if let Some(v) = &overrides.allowed_media_types {
            self.allowed_media_types = v.clone();
        }
        if let Some(v) = overrides.preferred_encoding {
            self.preferred_encoding = v;
        }
        if let Some(v) = overrides.inline_max_bytes {
            self.inline_max_bytes = Some(v);
        }
        let initial = overrides.initial_quality.unwrap_or(self.initial_quality);
        let floor = overrides.min_quality_floor.unwrap_or(self.min_quality_floor);
        self.with_quality_range(initial, floor)
    }
}

/// Partial constraint read from configuration; unset fields keep provider defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintOverrides {
    pub max_bytes: Option<usize>,
    pub max_dimension: Option<u32>,
    pub allowed_media_types: Option<Vec<MediaType>>,
    pub preferred_encoding: Option<PreferredEncoding>,
    pub inline_max_bytes: Option<usize>,
    pub initial_quality: Option<u8>,
    pub min_quality_floor: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_limit_switches_to_upload_reference() {
        let c = ProviderConstraint::new(100, 10, MediaType::ALL.to_vec()).with_inline_max_bytes(50);
        assert_eq!(c.encoding_for(50), PreferredEncoding::InlineBase64);
        assert_eq!(c.encoding_for(51), PreferredEncoding::UploadReference);

        let always = c.with_preferred_encoding(PreferredEncoding::UploadReference);
        assert_eq!(always.encoding_for(1), PreferredEncoding::UploadReference);
    }

    #[test]
    fn overrides_replace_only_set_fields() {
        let base = ProviderConstraint::new(1000, 512, vec![MediaType::Png]);
        let overrides = ConstraintOverrides {
            max_bytes: Some(10),
            min_quality_floor: Some(40),
            ..Default::default()
        };
        let c = base.apply(&overrides);
        assert_eq!(c.max_bytes, 10);
        assert_eq!(c.max_dimension, 512);
        assert_eq!(c.allowed_media_types, vec![MediaType::Png]);
        assert_eq!(c.min_quality_floor, 40);
        assert_eq!(c.initial_quality, defaults::quality::INITIAL_QUALITY);
    }

    #[test]
    fn quality_floor_never_exceeds_initial() {
        let c = ProviderConstraint::new(1, 1, vec![]).with_quality_range(30, 90);
        assert_eq!(c.initial_quality, 30);
        assert_eq!(c.min_quality_floor, 30);
    }

    #[test]
    fn deserializes_with_defaults() {
        let c: ProviderConstraint = serde_json::from_str(
            r#"{"max_bytes": 5, "max_dimension": 7, "allowed_media_types": ["image/png"]}"#,
        )
        .unwrap();
        assert_eq!(c.preferred_encoding, PreferredEncoding::InlineBase64);
        assert_eq!(c.min_quality_floor, defaults::quality::MIN_QUALITY_FLOOR);
    }
}
