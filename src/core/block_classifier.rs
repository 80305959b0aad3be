use crate::core::geometry::aspect_ratio;
use crate::core::model::BlockType;

const HEADER_MIN_RATIO: f64 = 10.0;
const PARAGRAPH_MIN_RATIO: f64 = 3.0;
const TABLE_CELL_MAX_RATIO: f64 = 1.5;

/// Classifies a block from its rectangle shape alone.
///
/// Checks run in priority order, so ratios in `[1.5, 3]` fall through to
/// [`BlockType::TextBlock`]. A zero height yields ratio zero and therefore a
/// table cell.
pub fn classify_block(width: u32, height: u32) -> BlockType {
    let ratio = aspect_ratio(width, height);

    if ratio > HEADER_MIN_RATIO {
        BlockType::Header
    } else if ratio > PARAGRAPH_MIN_RATIO {
        BlockType::Paragraph
    } else if ratio < TABLE_CELL_MAX_RATIO {
        BlockType::TableCell
    } else {
        BlockType::TextBlock
    }
}
