//! Recognition-oriented preprocessing: grayscale, non-local-means denoising
//! and adaptive Gaussian thresholding.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{PipelineError, Result, Stage};
use crate::raster::PixelBuffer;

/// Weights below this are treated as zero by the denoiser.
const MIN_WEIGHT: f32 = 0.001;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DenoiseParams {
    /// Filter strength; larger values remove more noise and more detail.
    pub strength: f32,
    pub template_window: u32,
    pub search_window: u32,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            strength: 3.0,
            template_window: 7,
            search_window: 21,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessConfig {
    pub denoise: DenoiseParams,
    /// Side of the Gaussian neighbourhood used by the adaptive threshold.
    pub block_size: u32,
    /// Subtracted from the neighbourhood mean before comparing.
    pub offset: i32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            denoise: DenoiseParams::default(),
            block_size: 11,
            offset: 2,
        }
    }
}

impl PreprocessConfig {
    fn validate(&self) -> Result<()> {
        let odd_at_least_3 = |v: u32| v >= 3 && v % 2 == 1;
        let check = |ok: bool, what: &str, value: u32| {
            if ok {
                Ok(())
            } else {
                Err(PipelineError::processing(
                    Stage::Preprocess,
                    format!("{what} must be odd and at least 3, got {value}"),
                ))
            }
        };
        check(odd_at_least_3(self.block_size), "block size", self.block_size)?;
        check(
            odd_at_least_3(self.denoise.template_window),
            "template window",
            self.denoise.template_window,
        )?;
        check(
            odd_at_least_3(self.denoise.search_window),
            "search window",
            self.denoise.search_window,
        )?;
        if self.denoise.strength <= 0.0 {
            return Err(PipelineError::processing(
                Stage::Preprocess,
                format!("denoise strength must be positive, got {}", self.denoise.strength),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl ImagePreprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Produces a two-valued (0/255) single-channel image.
    pub fn preprocess(&self, image: &PixelBuffer) -> Result<PixelBuffer> {
        self.config.validate()?;

        let gray = image.to_gray();
        debug!(width = gray.width(), height = gray.height(), "denoising");
        let denoised = denoise_nl_means(&gray, &self.config.denoise);
        let binary =
            adaptive_gaussian_threshold(&denoised, self.config.block_size, self.config.offset);
        PixelBuffer::from_gray(binary)
    }
}

/// Non-local means: each pixel becomes a weighted mean of the pixels in its
/// search window, weighted by how similar their template patches are.
///
/// Patch distances are box sums over a per-offset squared-difference image,
/// computed with an integral image.
fn denoise_nl_means(gray: &GrayImage, params: &DenoiseParams) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    let t = (params.template_window / 2) as usize;
    let s = (params.search_window / 2) as usize;
    let pad = t + s;
    let pw = w + 2 * pad;
    let padded = pad_reflect101(gray, pad);

    // Distance domain: every template position of every output pixel.
    let dw = w + 2 * t;
    let dh = h + 2 * t;
    let stride = dw + 1;
    let patch_len = ((2 * t + 1) * (2 * t + 1)) as f32;
    let inv_h2 = 1.0 / (params.strength * params.strength);

    let mut num = vec![0f32; w * h];
    let mut den = vec![0f32; w * h];
    let mut integral = vec![0f64; stride * (dh + 1)];
    let span = s as isize;

    for dy in -span..=span {
        for dx in -span..=span {
            for r in 0..dh {
                let mut row_sum = 0f64;
                let base = (r + s) * pw + s;
                let shifted = (((r + s) as isize + dy) as usize) * pw;
                for c in 0..dw {
                    let a = padded[base + c];
                    let b = padded[shifted + ((c + s) as isize + dx) as usize];
                    let d = (a - b) as f64;
                    row_sum += d * d;
                    integral[(r + 1) * stride + c + 1] = integral[r * stride + c + 1] + row_sum;
                }
            }

            let integral = &integral;
            let padded = &padded;
            num.par_chunks_mut(w)
                .zip(den.par_chunks_mut(w))
                .enumerate()
                .for_each(|(y, (num_row, den_row))| {
                    let (r0, r1) = (y, y + 2 * t + 1);
                    let source_row = (((y + pad) as isize + dy) as usize) * pw;
                    for x in 0..w {
                        let (c0, c1) = (x, x + 2 * t + 1);
                        let ssd = integral[r1 * stride + c1] - integral[r0 * stride + c1]
                            - integral[r1 * stride + c0]
                            + integral[r0 * stride + c0];
                        let weight = (-(ssd as f32 / patch_len) * inv_h2).exp();
                        if weight < MIN_WEIGHT {
                            continue;
                        }
                        let value = padded[source_row + ((x + pad) as isize + dx) as usize];
                        num_row[x] += weight * value;
                        den_row[x] += weight;
                    }
                });
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let i = y as usize * w + x as usize;
        Luma([(num[i] / den[i]).round().clamp(0.0, 255.0) as u8])
    })
}

/// Copies the image into a float buffer with a mirrored border that does not
/// repeat the edge pixel (`dcb|abcd|cba`).
fn pad_reflect101(gray: &GrayImage, pad: usize) -> Vec<f32> {
    let (w, h) = (gray.width() as isize, gray.height() as isize);
    let pw = w as usize + 2 * pad;
    let ph = h as usize + 2 * pad;
    let mut out = Vec::with_capacity(pw * ph);
    for py in 0..ph {
        let y = reflect101(py as isize - pad as isize, h);
        for px in 0..pw {
            let x = reflect101(px as isize - pad as isize, w);
            out.push(gray.get_pixel(x as u32, y as u32).0[0] as f32);
        }
    }
    out
}

fn reflect101(mut i: isize, n: isize) -> isize {
    if n == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i;
        }
    }
}

/// Pixel becomes 255 when it exceeds the Gaussian-weighted neighbourhood
/// mean minus `offset`, otherwise 0.
fn adaptive_gaussian_threshold(gray: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    // Filtered in f32 so the mean is rounded once, after both passes. Edge
    // pixels are replicated past the border.
    let source: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([gray.get_pixel(x, y).0[0] as f32])
        });
    let mean = separable_filter_equal(&source, &gaussian_kernel(block_size as usize));
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let src = gray.get_pixel(x, y).0[0] as i32;
        let local = mean.get_pixel(x, y).0[0].round() as i32;
        Luma([if src - local > -offset { 255 } else { 0 }])
    })
}

/// Normalised Gaussian taps for an odd kernel size, with sigma derived from
/// the size the usual way (`0.3 * ((size - 1) / 2 - 1) + 0.8`).
fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let taps: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = taps.iter().sum();
    taps.into_iter().map(|v| v / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn page_with_dark_square() -> PixelBuffer {
        let mut image = RgbImage::from_pixel(40, 40, Rgb([255, 255, 255]));
        for y in 15..25 {
            for x in 15..25 {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        PixelBuffer::new(DynamicImage::ImageRgb8(image)).unwrap()
    }

    #[test]
    fn output_is_binary_single_channel() {
        let out = ImagePreprocessor::default()
            .preprocess(&page_with_dark_square())
            .unwrap();
        assert_eq!(out.channels(), 1);
        assert_eq!((out.width(), out.height()), (40, 40));
        assert!(out.to_gray().pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn keeps_ink_dark_and_paper_white() {
        let out = ImagePreprocessor::default()
            .preprocess(&page_with_dark_square())
            .unwrap()
            .to_gray();
        assert_eq!(out.get_pixel(20, 20).0[0], 0);
        assert_eq!(out.get_pixel(3, 3).0[0], 255);
    }

    #[test]
    fn is_deterministic() {
        let input = page_with_dark_square();
        let pre = ImagePreprocessor::default();
        let a = pre.preprocess(&input).unwrap().to_gray();
        let b = pre.preprocess(&input).unwrap().to_gray();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn denoising_preserves_flat_regions() {
        let flat = GrayImage::from_pixel(9, 9, Luma([128]));
        let out = denoise_nl_means(&flat, &DenoiseParams::default());
        assert!(out.pixels().all(|p| p.0[0] == 128));
    }

    #[test]
    fn flat_region_thresholds_to_paper() {
        let flat = GrayImage::from_pixel(15, 15, Luma([90]));
        let out = adaptive_gaussian_threshold(&flat, 11, 2);
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn dark_dot_beside_paper_is_ink() {
        let mut page = GrayImage::from_pixel(15, 15, Luma([200]));
        page.put_pixel(0, 7, Luma([100]));
        let out = adaptive_gaussian_threshold(&page, 11, 2);
        assert_eq!(out.get_pixel(0, 7).0[0], 0);
        assert_eq!(out.get_pixel(14, 7).0[0], 255);
    }

    #[test]
    fn kernel_is_normalised_and_symmetric() {
        let kernel = gaussian_kernel(11);
        assert_eq!(kernel.len(), 11);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((kernel[0] - kernel[10]).abs() < 1e-7);
        assert!(kernel[5] > kernel[4]);
    }

    #[test]
    fn rejects_even_block_size() {
        let pre = ImagePreprocessor::new(PreprocessConfig {
            block_size: 10,
            ..PreprocessConfig::default()
        });
        let err = pre.preprocess(&page_with_dark_square()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ProcessingFailure {
                stage: Stage::Preprocess,
                ..
            }
        ));
    }

    #[test]
    fn reflect101_mirrors_without_edge_repeat() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-3, 1), 0);
    }
}
