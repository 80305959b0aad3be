use image::{GrayImage, Luma};
use imageproc::morphology::{grayscale_open, Mask};

/// Longest structuring element a [`Mask`] can hold.
pub const MAX_LINE_LENGTH: u32 = 511;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOrientation {
    /// A `length x 1` structuring element.
    Horizontal,
    /// A `1 x length` structuring element.
    Vertical,
}

/// Straight-line mask anchored at `length / 2`.
fn line_mask(orientation: LineOrientation, length: u32) -> Mask {
    let length = length.clamp(1, MAX_LINE_LENGTH);
    let anchor = (length / 2) as u8;
    match orientation {
        LineOrientation::Horizontal => {
            Mask::from_image(&GrayImage::from_pixel(length, 1, Luma([255])), anchor, 0)
        }
        LineOrientation::Vertical => {
            Mask::from_image(&GrayImage::from_pixel(1, length, Luma([255])), 0, anchor)
        }
    }
}

/// Grayscale opening (erosion then dilation) with a straight-line element.
///
/// Samples falling outside the image are ignored by both passes.
pub fn open_line(image: &GrayImage, orientation: LineOrientation, length: u32) -> GrayImage {
    grayscale_open(image, &line_mask(orientation, length))
}

/// True when some `length`-long straight run survives opening.
pub fn has_line(image: &GrayImage, orientation: LineOrientation, length: u32) -> bool {
    open_line(image, orientation, length)
        .pixels()
        .any(|p| p.0[0] > 0)
}
