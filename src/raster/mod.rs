pub mod decode;
pub mod preprocess;

pub use decode::{check_input_type, content_type_for_path, decode_image};
pub use preprocess::{DenoiseParams, ImagePreprocessor, PreprocessConfig};

use image::{DynamicImage, GrayImage, Luma};

use crate::core::error::{PipelineError, Result};
use crate::core::model::ImageDimensions;

/// A decoded, non-empty raster owned by a single request.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    image: DynamicImage,
}

impl PixelBuffer {
    pub fn new(image: DynamicImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::invalid_image(format!(
                "image has zero extent ({}x{})",
                image.width(),
                image.height()
            )));
        }
        Ok(Self { image })
    }

    pub fn from_gray(gray: GrayImage) -> Result<Self> {
        Self::new(DynamicImage::ImageLuma8(gray))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions {
            width: self.width(),
            height: self.height(),
            channels: self.channels(),
        }
    }

    /// Single-channel copy of the buffer using BT.601 luma weights.
    pub fn to_gray(&self) -> GrayImage {
        if let DynamicImage::ImageLuma8(gray) = &self.image {
            return gray.clone();
        }
        let rgb = self.image.to_rgb8();
        GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            let [r, g, b] = rgb.get_pixel(x, y).0;
            Luma([bt601_luma(r, g, b)])
        })
    }

    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }
}

/// `0.299 R + 0.587 G + 0.114 B` in 14-bit fixed point, rounded half up.
fn bt601_luma(r: u8, g: u8, b: u8) -> u8 {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;
    ((r as u32 * R + g as u32 * G + b as u32 * B + (1 << (SHIFT - 1))) >> SHIFT) as u8
}
