// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image loading and transport encoding for the analysis pipeline

use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Prefix of every image data URI produced by this service
pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// JPEG quality used when no explicit quality is configured
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Custom error types for image processing
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Failed to read image file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Not a base64 data URI")]
    InvalidDataUri,

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Failed to encode image: {0}")]
    EncodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,
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

/// Load and decode an image file from disk
///
/// The format is sniffed from the file's magic bytes; the file name is
/// never trusted.
pub fn decode_image_file(path: &Path) -> Result<(DynamicImage, ImageInfo), ImageError> {
    let bytes = std::fs::read(path)?;
    decode_image_bytes(&bytes)
}

/// Decode raw image bytes
///
/// # Returns
/// * `Ok((DynamicImage, ImageInfo))` - The decoded image and metadata
/// * `Err(ImageError)` - If the bytes are empty, of an unknown format or corrupt
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(DynamicImage, ImageInfo), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let format = detect_format(bytes)?;

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let info = ImageInfo {
        width: img.width(),
        height: img.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((img, info))
}

/// Detect image format from magic bytes
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        _ => Err(ImageError::UnsupportedFormat),
    }
}

/// Encode an image as baseline JPEG
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let rgb = image.to_rgb8();
    let mut buffer = Cursor::new(Vec::new());

    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| ImageError::EncodeFailed(e.to_string()))?;

    Ok(buffer.into_inner())
}

/// Encode an image as a `data:image/jpeg;base64,...` URI
pub fn to_jpeg_data_uri(image: &DynamicImage, quality: u8) -> Result<String, ImageError> {
    let jpeg = encode_jpeg(image, quality)?;
    Ok(format!("{}{}", JPEG_DATA_URI_PREFIX, STANDARD.encode(jpeg)))
}

/// Decode a base64 data URI back into raw bytes
///
/// Accepts any media type, but the payload must be base64 encoded.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, ImageError> {
    let rest = uri.strip_prefix("data:").ok_or(ImageError::InvalidDataUri)?;
    let (_media_type, payload) = rest
        .split_once(";base64,")
        .ok_or(ImageError::InvalidDataUri)?;

    if payload.is_empty() {
        return Err(ImageError::EmptyData);
    }

    Ok(STANDARD.decode(payload)?)
}
