//! Image loading, resizing, and base64 encoding for the vision endpoint.
//!
//! Photos are downscaled to at most 1024px on the longest edge and
//! re-encoded as JPEG to keep request bodies small.

use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat};
use tracing::info;

use crate::client::InlineData;
use crate::error::ArogyaError;

/// Maximum dimension (width or height) for images sent to the endpoint.
pub const MAX_IMAGE_DIMENSION: u32 = 1024;

/// Minimum dimension for a usable photo.
pub const MIN_IMAGE_DIMENSION: u32 = 64;

pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";

/// Prepare raw image bytes: decode, validate, resize, encode.
///
/// # Errors
/// - Image cannot be decoded
/// - Image smaller than 64px on its shortest side
pub fn prepare_image(image_bytes: &[u8]) -> Result<InlineData, ArogyaError> {
    let img = image::load_from_memory(image_bytes).map_err(|e| {
        ArogyaError::Image(format!(
            "Failed to load image: {}. Ensure it's a valid JPEG/PNG/WebP.",
            e
        ))
    })?;

    let (width, height) = (img.width(), img.height());
    info!("Loaded image: {}x{}", width, height);

    if width.min(height) < MIN_IMAGE_DIMENSION {
        return Err(ArogyaError::Image(format!(
            "Image too small for analysis: {}x{}. Minimum dimension is {}px.",
            width, height, MIN_IMAGE_DIMENSION
        )));
    }

    let resized = resize_if_needed(img, MAX_IMAGE_DIMENSION);
    if resized.width() != width || resized.height() != height {
        info!("Resized to: {}x{}", resized.width(), resized.height());
    }

    let jpeg_bytes = encode_to_jpeg(&resized)?;
    info!("Encoded to JPEG: {} bytes", jpeg_bytes.len());

    Ok(InlineData {
        mime_type: JPEG_MEDIA_TYPE.to_string(),
        data: STANDARD.encode(&jpeg_bytes),
    })
}

/// Read and prepare an image file.
pub fn prepare_image_file(path: &Path) -> Result<InlineData, ArogyaError> {
    let bytes = std::fs::read(path).map_err(|e| {
        ArogyaError::Image(format!("Failed to read image '{}': {}", path.display(), e))
    })?;
    prepare_image(&bytes)
}

/// Accept a `data:<mime>;base64,<payload>` URL, the form a capture canvas
/// or file reader produces. The payload is decoded and re-prepared so it
/// goes through the same size limits as a file.
pub fn prepare_data_url(data_url: &str) -> Result<InlineData, ArogyaError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| ArogyaError::Image("Not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ArogyaError::Image("Data URL has no payload".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(ArogyaError::Image(
            "Only base64 data URLs are supported".to_string(),
        ));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ArogyaError::Image(format!("Invalid base64 image data: {}", e)))?;
    prepare_image(&bytes)
}

/// Resize image if either dimension exceeds max, maintaining aspect ratio.
fn resize_if_needed(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());

    if width <= max_dimension && height <= max_dimension {
        return img;
    }

    let scale = max_dimension as f32 / width.max(height) as f32;
    let new_width = (width as f32 * scale) as u32;
    let new_height = (height as f32 * scale) as u32;

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

fn encode_to_jpeg(img: &DynamicImage) -> Result<Vec<u8>, ArogyaError> {
    // JPEG has no alpha channel; PNG screenshots often do.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|e| ArogyaError::Image(format!("Failed to encode image to JPEG: {}", e)))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgba8(width, height);
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_prepare_image_rejects_too_small() {
        let err = prepare_image(&png_bytes(32, 32)).unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn test_prepare_image_rejects_invalid() {
        let err = prepare_image(b"not an image").unwrap_err();
        assert!(err.to_string().contains("Failed to load"));
    }

    #[test]
    fn test_prepare_image_produces_jpeg_base64() {
        let inline = prepare_image(&png_bytes(300, 200)).unwrap();
        assert_eq!(inline.mime_type, "image/jpeg");

        let jpeg = STANDARD.decode(&inline.data).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (300, 200));
    }

    #[test]
    fn test_resize_if_needed_keeps_small_images() {
        let img = DynamicImage::new_rgb8(500, 300);
        let resized = resize_if_needed(img, 1024);
        assert_eq!((resized.width(), resized.height()), (500, 300));
    }

    #[test]
    fn test_resize_if_needed_scales_longest_edge() {
        let resized = resize_if_needed(DynamicImage::new_rgb8(2000, 1000), 1024);
        assert_eq!((resized.width(), resized.height()), (1024, 512));

        let resized = resize_if_needed(DynamicImage::new_rgb8(1000, 2000), 1024);
        assert_eq!((resized.width(), resized.height()), (512, 1024));
    }

    #[test]
    fn test_prepare_data_url_round_trips_through_prep() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(120, 90)));
        let inline = prepare_data_url(&url).unwrap();
        assert_eq!(inline.mime_type, "image/jpeg");
    }

    #[test]
    fn test_prepare_data_url_rejects_malformed() {
        assert!(prepare_data_url("image/png;base64,AAAA").is_err());
        assert!(prepare_data_url("data:image/png;base64").is_err());
        assert!(prepare_data_url("data:text/plain,hello").is_err());
        assert!(prepare_data_url("data:image/png;base64,!!!").is_err());
    }

    #[test]
    fn test_prepare_image_file_missing() {
        let err = prepare_image_file(Path::new("/definitely/not/here.jpg")).unwrap_err();
        assert!(err.to_string().contains("Failed to read image"));
    }
}
