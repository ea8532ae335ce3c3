// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image loading and utility functions for vision processing

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use thiserror::Error;

/// Maximum image size (16MB)
pub const MAX_IMAGE_SIZE: usize = 16 * 1024 * 1024;

/// Magic-byte prefixes for the formats the service accepts. WebP is
/// handled separately because its tag sits inside a RIFF container.
const SIGNATURES: &[(&[u8], ImageFormat)] = &[
    (b"\x89PNG", ImageFormat::Png),
    (&[0xFF, 0xD8, 0xFF], ImageFormat::Jpeg),
    (b"GIF87a", ImageFormat::Gif),
    (b"GIF89a", ImageFormat::Gif),
    (b"BM", ImageFormat::Bmp),
    (b"II*\x00", ImageFormat::Tiff),
    (b"MM\x00*", ImageFormat::Tiff),
];

/// Custom error types for image processing
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,

    #[error("Failed to encode image: {0}")]
    EncodeFailed(String),
}

/// Image information extracted during loading
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
    /// Size in bytes
    pub size_bytes: usize,
}

/// Decode a multipart upload into an in-memory image.
///
/// The upload is size-checked and format-sniffed before the decoder runs,
/// so garbage bytes fail with `UnsupportedFormat` rather than a decoder
/// error deep inside the `image` crate.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(DynamicImage, ImageInfo), ImageError> {
    match bytes.len() {
        0 => return Err(ImageError::EmptyData),
        n if n > MAX_IMAGE_SIZE => return Err(ImageError::TooLarge(n, MAX_IMAGE_SIZE)),
        _ => {}
    }

    let format = detect_format(bytes)?;
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let info = ImageInfo {
        width: image.width(),
        height: image.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((image, info))
}

/// Sniff the image format from leading magic bytes.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    // RIFF container with a WEBP tag at offset 8
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return Ok(ImageFormat::WebP);
    }

    SIGNATURES
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
        .map(|&(_, format)| format)
        .ok_or(ImageError::UnsupportedFormat)
}

/// Encode an annotated image as a PNG data URI for transport
///
/// # Arguments
/// * `image` - RGB image buffer to encode
///
/// # Returns
/// * `Ok(String)` - `data:image/png;base64,<...>` string
/// * `Err(ImageError::EncodeFailed)` - If PNG encoding fails
pub fn encode_png_data_uri(image: &RgbImage) -> Result<String, ImageError> {
    let mut png_bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| ImageError::EncodeFailed(e.to_string()))?;

    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(&png_bytes)
    ))
}
