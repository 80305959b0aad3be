pub mod bridge;

pub use bridge::OcrBridge;

use anyhow::Result;

use crate::core::model::TextSpan;
use crate::raster::PixelBuffer;

/// Text recognition engine consumed by the pipeline.
///
/// Spans come back in the engine's own order, which is not necessarily
/// reading order.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &PixelBuffer) -> Result<Vec<TextSpan>>;
}
