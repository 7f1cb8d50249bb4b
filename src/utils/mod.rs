//! Utility helpers.

pub mod mime;

pub use mime::MediaTypeDetector;
