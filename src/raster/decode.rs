use std::path::Path;

use image::DynamicImage;

use crate::core::error::{PipelineError, Result};
use crate::raster::PixelBuffer;

/// Rejects payloads whose declared content type is not an image.
///
/// An undeclared type is accepted here; the decoder decides.
pub fn check_input_type(content_type: Option<&str>) -> Result<()> {
    match content_type {
        Some(declared) if !declared.trim().to_ascii_lowercase().starts_with("image/") => {
            Err(PipelineError::InvalidInputType {
                content_type: declared.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Decodes raw bytes into a three-channel colour buffer.
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer> {
    if bytes.is_empty() {
        return Err(PipelineError::invalid_image("empty payload"));
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| PipelineError::invalid_image(format!("failed to decode image: {e}")))?;

    PixelBuffer::new(DynamicImage::ImageRgb8(decoded.to_rgb8()))
}

/// Content type implied by a file extension, if any.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "json" => "application/json",
        _ => return None,
    };
    Some(content_type)
}
