use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{threshold, ThresholdType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::block_classifier::classify_block;
use crate::core::error::{PipelineError, Result, Stage};
use crate::core::geometry::Rect;
use crate::core::model::{LayoutAnalysis, LayoutBlock};
use crate::layout::morphology::{has_line, LineOrientation, MAX_LINE_LENGTH};
use crate::raster::PixelBuffer;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Pixels at or below this intensity count as ink.
    pub ink_cutoff: u8,
    /// Blocks must be strictly wider than this.
    pub min_block_width: u32,
    /// Blocks must be strictly taller than this.
    pub min_block_height: u32,
    /// Length of the straight structuring elements used to spot table rules.
    pub rule_length: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            ink_cutoff: 150,
            min_block_width: 50,
            min_block_height: 20,
            rule_length: 40,
        }
    }
}

/// Geometry-only page layout: content regions from contours, classified by
/// shape, plus a coarse table flag.
#[derive(Debug, Clone, Default)]
pub struct LayoutAnalyzer {
    config: LayoutConfig,
}

impl LayoutAnalyzer {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, image: &PixelBuffer) -> Result<LayoutAnalysis> {
        let rule_length = self.config.rule_length;
        if rule_length == 0 || rule_length > MAX_LINE_LENGTH {
            return Err(PipelineError::processing(
                Stage::Layout,
                format!("rule length must be within 1..={MAX_LINE_LENGTH}, got {rule_length}"),
            ));
        }

        let gray = image.to_gray();
        // Ink becomes 255 and paper 0.
        let binary = threshold(&gray, self.config.ink_cutoff, ThresholdType::BinaryInverted);
        let regions = external_regions(&binary);
        debug!(regions = regions.len(), "found external contours");

        let blocks = self.blocks_from_regions(regions);
        let has_tables = self.detect_table_rules(&gray);
        Ok(LayoutAnalysis::new(blocks, has_tables))
    }

    /// Drops noise-sized regions, classifies the rest and orders them
    /// top-to-bottom, then left-to-right.
    pub fn blocks_from_regions(&self, regions: Vec<Rect>) -> Vec<LayoutBlock> {
        let mut blocks: Vec<LayoutBlock> = regions
            .into_iter()
            .filter(|r| {
                r.width > self.config.min_block_width && r.height > self.config.min_block_height
            })
            .map(|bbox| LayoutBlock {
                kind: classify_block(bbox.width, bbox.height),
                area: bbox.area(),
                bbox,
            })
            .collect();
        blocks.sort_by_key(|b| (b.bbox.y, b.bbox.x));
        blocks
    }

    /// Any long horizontal or vertical run in the grayscale image counts,
    /// whether or not it belongs to a real grid.
    fn detect_table_rules(&self, gray: &GrayImage) -> bool {
        let length = self.config.rule_length;
        has_line(gray, LineOrientation::Horizontal, length)
            || has_line(gray, LineOrientation::Vertical, length)
    }
}

/// Bounding rectangles of outermost contours only; holes and anything nested
/// inside them are skipped.
fn external_regions(binary: &GrayImage) -> Vec<Rect> {
    find_contours::<u32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| Rect::enclosing(c.points.iter().map(|p| (p.x, p.y))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::BlockType;
    use image::{DynamicImage, Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    fn fill(image: &mut RgbImage, rect: Rect, value: u8) {
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                image.put_pixel(x, y, Rgb([value, value, value]));
            }
        }
    }

    fn buffer(image: RgbImage) -> PixelBuffer {
        PixelBuffer::new(DynamicImage::ImageRgb8(image)).unwrap()
    }

    #[test]
    fn noise_filter_keeps_only_large_regions() {
        let analyzer = LayoutAnalyzer::default();
        let blocks =
            analyzer.blocks_from_regions(vec![Rect::new(0, 0, 60, 25), Rect::new(0, 0, 10, 10)]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockType::TextBlock);
        assert_eq!(blocks[0].area, 1500);
    }

    #[test]
    fn filter_bounds_are_exclusive() {
        let analyzer = LayoutAnalyzer::default();
        let blocks =
            analyzer.blocks_from_regions(vec![Rect::new(0, 0, 50, 30), Rect::new(0, 0, 80, 20)]);
        assert!(blocks.is_empty());
    }

    #[test]
    fn blocks_sorted_by_row_then_column() {
        let analyzer = LayoutAnalyzer::default();
        let blocks = analyzer.blocks_from_regions(vec![
            Rect::new(300, 100, 60, 60),
            Rect::new(10, 100, 60, 60),
            Rect::new(500, 5, 600, 30),
        ]);
        let origins: Vec<(u32, u32)> = blocks.iter().map(|b| (b.bbox.x, b.bbox.y)).collect();
        assert_eq!(origins, vec![(500, 5), (10, 100), (300, 100)]);
    }

    #[test]
    fn detects_and_classifies_filled_regions() {
        let mut page = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
        fill(&mut page, Rect::new(40, 100, 60, 60), 0);
        fill(&mut page, Rect::new(20, 20, 120, 30), 0);
        fill(&mut page, Rect::new(170, 170, 5, 5), 0);

        let layout = LayoutAnalyzer::default().analyze(&buffer(page)).unwrap();

        assert_eq!(layout.total_blocks, 2);
        assert_eq!(layout.blocks[0].bbox, Rect::new(20, 20, 120, 30));
        assert_eq!(layout.blocks[0].kind, BlockType::Paragraph);
        assert_eq!(layout.blocks[1].bbox, Rect::new(40, 100, 60, 60));
        assert_eq!(layout.blocks[1].kind, BlockType::TableCell);
    }

    #[test]
    fn saturated_green_ink_counts_as_ink() {
        let mut page = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        for y in 30..70 {
            for x in 20..180 {
                page.put_pixel(x, y, Rgb([0, 230, 0]));
            }
        }

        let layout = LayoutAnalyzer::default().analyze(&buffer(page)).unwrap();

        assert_eq!(layout.total_blocks, 1);
        assert_eq!(layout.blocks[0].bbox, Rect::new(20, 30, 160, 40));
        assert_eq!(layout.blocks[0].kind, BlockType::Paragraph);
    }

    #[test]
    fn rule_length_must_fit_a_mask() {
        let page = buffer(RgbImage::from_pixel(20, 20, Rgb([255, 255, 255])));
        for rule_length in [0, MAX_LINE_LENGTH + 1] {
            let analyzer = LayoutAnalyzer::new(LayoutConfig {
                rule_length,
                ..LayoutConfig::default()
            });
            let err = analyzer.analyze(&page).unwrap_err();
            assert!(matches!(
                err,
                PipelineError::ProcessingFailure {
                    stage: Stage::Layout,
                    ..
                }
            ));
        }
        let widest = LayoutAnalyzer::new(LayoutConfig {
            rule_length: MAX_LINE_LENGTH,
            ..LayoutConfig::default()
        });
        assert!(widest.analyze(&page).is_ok());
    }

    #[test]
    fn nested_regions_are_not_reported() {
        let mut page = RgbImage::from_pixel(300, 300, Rgb([255, 255, 255]));
        fill(&mut page, Rect::new(10, 10, 280, 280), 0);
        fill(&mut page, Rect::new(30, 30, 240, 240), 255);
        fill(&mut page, Rect::new(60, 60, 100, 40), 0);

        let layout = LayoutAnalyzer::default().analyze(&buffer(page)).unwrap();

        assert_eq!(layout.total_blocks, 1);
        assert_eq!(layout.blocks[0].bbox, Rect::new(10, 10, 280, 280));
    }

    #[test]
    fn bright_page_triggers_table_flag() {
        let page = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let layout = LayoutAnalyzer::default().analyze(&buffer(page)).unwrap();
        assert!(layout.has_tables);
        assert_eq!(layout.total_blocks, 0);
    }

    #[test]
    fn black_page_has_no_table_rules() {
        let page = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let layout = LayoutAnalyzer::default().analyze(&buffer(page)).unwrap();
        assert!(!layout.has_tables);
        assert_eq!(layout.total_blocks, 1);
        assert_eq!(layout.blocks[0].kind, BlockType::TableCell);
    }

    #[test]
    fn analysis_is_repeatable() {
        let mut page = RgbImage::from_pixel(120, 120, Rgb([255, 255, 255]));
        fill(&mut page, Rect::new(10, 10, 100, 25), 30);
        let input = buffer(page);
        let analyzer = LayoutAnalyzer::default();
        assert_eq!(
            analyzer.analyze(&input).unwrap(),
            analyzer.analyze(&input).unwrap()
        );
    }
}
