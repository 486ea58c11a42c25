//! Image decoding with content-based format detection.

use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::error::PipelineError;

/// Result of decoding a fetched image.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Size of the response body in bytes
    pub byte_len: u64,
}

/// Decode an image from an in-memory byte buffer on the blocking pool.
pub async fn decode_bytes(bytes: Vec<u8>, url: &str) -> Result<DecodedImage, PipelineError> {
    let url_owned = url.to_string();
    tokio::task::spawn_blocking(move || decode_bytes_sync(bytes, &url_owned))
        .await
        .map_err(|e| PipelineError::Decode {
            url: url.to_string(),
            message: format!("Task join error: {}", e),
        })?
}

/// Synchronous decode from bytes.
///
/// The format is sniffed from the content; URLs often lack an extension or
/// carry the wrong one.
pub fn decode_bytes_sync(bytes: Vec<u8>, url: &str) -> Result<DecodedImage, PipelineError> {
    use std::io::Cursor;

    let byte_len = bytes.len() as u64;
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PipelineError::Decode {
            url: url.to_string(),
            message: format!("Cannot detect image format: {}", e),
        })?;
    let format = reader.format().ok_or_else(|| PipelineError::Decode {
        url: url.to_string(),
        message: "Unrecognized image format".to_string(),
    })?;
    let image = reader.decode().map_err(|e| PipelineError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let (width, height) = image.dimensions();
    Ok(DecodedImage {
        image,
        format,
        width,
        height,
        byte_len,
    })
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        _ => "unknown".to_string(),
    }
}
