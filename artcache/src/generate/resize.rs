//! Fixed-size copies of single images.

use super::decode::{DecodedImage, SourceFormat};
use crate::error::ArtworkError;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Width and height of a resized copy.
pub const RESIZED_SIZE: u32 = 1024;

/// JPEG quality for resized copies.
pub const RESIZED_JPEG_QUALITY: u8 = 95;

/// Resizes to exactly `size`×`size` with Lanczos3, ignoring aspect ratio.
pub fn resize_square(image: &DynamicImage, size: u32) -> DynamicImage {
    image.resize_exact(size, size, FilterType::Lanczos3)
}

/// Encodes `image` in the storage format for `format`.
///
/// Returns the bytes and the store extension. WebP sources come back as PNG.
pub fn encode_as(
    image: &DynamicImage,
    format: SourceFormat,
) -> Result<(Vec<u8>, &'static str), ArtworkError> {
    let storage = format.storage_format();
    let bytes = match storage {
        SourceFormat::Jpeg => {
            let mut out = Vec::new();
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, RESIZED_JPEG_QUALITY);
            image
                .to_rgb8()
                .write_with_encoder(encoder)
                .map_err(|e| encode_error("JPEG", e))?;
            out
        }
        SourceFormat::Png | SourceFormat::Webp => write(image, ImageFormat::Png, "PNG")?,
        SourceFormat::Gif => write(image, ImageFormat::Gif, "GIF")?,
    };
    Ok((bytes, format.storage_extension()))
}

fn write(image: &DynamicImage, format: ImageFormat, name: &str) -> Result<Vec<u8>, ArtworkError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, format)
        .map_err(|e| encode_error(name, e))?;
    Ok(out.into_inner())
}

fn encode_error(format: &str, e: image::ImageError) -> ArtworkError {
    ArtworkError::GenerationFailed(format!("{} encode failed: {}", format, e))
}

/// Resizes a decoded source and re-encodes it in its own format.
pub fn resized_copy(decoded: &DecodedImage) -> Result<(Vec<u8>, &'static str), ArtworkError> {
    let resized = resize_square(&decoded.image, RESIZED_SIZE);
    encode_as(&resized, decoded.format)
}
