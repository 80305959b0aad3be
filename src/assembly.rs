//! Merges OCR spans, layout blocks and entity sets into the final result.

use crate::core::model::{
    DocumentResult, Entities, ImageDimensions, LayoutAnalysis, OcrSummary, ResultMetadata,
    TextSpan,
};

/// Span texts joined by single spaces, in the order the engine emitted them.
pub fn join_span_text(spans: &[TextSpan]) -> String {
    spans
        .iter()
        .map(|span| span.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Arithmetic mean of span confidences, zero when there are no spans.
pub fn average_confidence(spans: &[TextSpan]) -> f64 {
    if spans.is_empty() {
        return 0.0;
    }
    spans.iter().map(|s| s.confidence as f64).sum::<f64>() / spans.len() as f64
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(
        &self,
        filename: &str,
        spans: Vec<TextSpan>,
        layout: LayoutAnalysis,
        entities: Entities,
        image_dimensions: ImageDimensions,
    ) -> DocumentResult {
        let full_text = join_span_text(&spans);
        let ocr = OcrSummary {
            average_confidence: average_confidence(&spans),
            word_count: full_text.split_whitespace().count(),
            character_count: full_text.chars().count(),
            full_text,
            text_blocks: spans,
        };
        let metadata = ResultMetadata {
            image_dimensions,
            processing_complete: true,
            total_entities_found: entities.total(),
        };

        DocumentResult {
            success: true,
            filename: filename.to_string(),
            ocr,
            layout,
            entities,
            metadata,
        }
    }
}
