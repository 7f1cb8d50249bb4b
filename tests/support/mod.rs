//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::time::Duration;

use base64::Engine;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pic_prompt::types::HttpSourceConfig;

pub fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

/// Deterministic noise; compresses poorly so byte budgets bite.
pub fn noisy(width: u32, height: u32, seed: u32) -> DynamicImage {
    let mut state = seed | 1;
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    }))
}

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("encode fixture");
    out.into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(&solid(width, height, [200, 30, 30]), ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(&solid(width, height, [30, 30, 200]), ImageFormat::Jpeg)
}

pub fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Temp file with the given name suffix and contents.
pub fn temp_image(suffix: &str, bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file
}

pub fn path_of(file: &tempfile::NamedTempFile) -> String {
    file.path().to_string_lossy().into_owned()
}

/// Short timeouts and near-zero backoff so retry tests run fast.
pub fn fast_http(timeout: Duration, retry_count: u32) -> HttpSourceConfig {
    HttpSourceConfig::builder()
        .timeout(Some(timeout))
        .retry_count(retry_count)
        .backoff(Duration::from_millis(5), Duration::from_millis(20))
        .jitter(false)
        .build()
}
