use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::assembly::{join_span_text, ResultAssembler};
use crate::core::error::{PipelineError, Result as PipelineResult, Stage};
use crate::core::model::{DocumentResult, LayoutAnalysis, TextSpan};
use crate::export::{EntitiesExporter, Exporter, JsonExporter, TextExporter};
use crate::layout::{LayoutAnalyzer, LayoutConfig};
use crate::ner::{EntityExtractor, EntityRecognizer};
use crate::ocr::OcrEngine;
use crate::raster::{
    check_input_type, decode_image, ImagePreprocessor, PixelBuffer, PreprocessConfig,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// One uploaded document: its name, declared content type and raw bytes.
#[derive(Debug, Clone, Copy)]
pub struct DocumentInput<'a> {
    pub filename: &'a str,
    pub content_type: Option<&'a str>,
    pub bytes: &'a [u8],
}

/// Runs a single image through decoding, OCR, layout analysis, entity
/// extraction and assembly.
///
/// The engines are built once by the caller and shared across requests; the
/// pipeline itself holds no per-request state.
pub struct DocumentPipeline<'e> {
    preprocessor: ImagePreprocessor,
    analyzer: LayoutAnalyzer,
    ocr: &'e dyn OcrEngine,
    ner: &'e dyn EntityRecognizer,
}

impl<'e> DocumentPipeline<'e> {
    pub fn new(
        config: &PipelineConfig,
        ocr: &'e dyn OcrEngine,
        ner: &'e dyn EntityRecognizer,
    ) -> Self {
        Self {
            preprocessor: ImagePreprocessor::new(config.preprocess),
            analyzer: LayoutAnalyzer::new(config.layout),
            ocr,
            ner,
        }
    }

    /// All-or-nothing: the first failing stage aborts the request and any
    /// intermediate results are dropped.
    pub fn process(&self, input: DocumentInput<'_>) -> PipelineResult<DocumentResult> {
        info!(filename = input.filename, bytes = input.bytes.len(), "processing document");
        let outcome = self.run(input);
        match &outcome {
            Ok(result) => info!(
                filename = input.filename,
                words = result.ocr.word_count,
                blocks = result.layout.total_blocks,
                entities = result.metadata.total_entities_found,
                "processing complete"
            ),
            Err(e) => error!(filename = input.filename, kind = e.kind(), "processing failed: {e}"),
        }
        outcome
    }

    fn run(&self, input: DocumentInput<'_>) -> PipelineResult<DocumentResult> {
        check_input_type(input.content_type)?;
        let image = decode_image(input.bytes)?;

        // Layout works on the raw buffer and does not need OCR output.
        let (spans, layout) = rayon::join(|| self.recognize(&image), || self.layout(&image));
        let spans = spans?;
        let layout = layout?;

        info!("extracting entities");
        let full_text = join_span_text(&spans);
        let entities = EntityExtractor::new(self.ner).extract(&full_text)?;

        Ok(ResultAssembler::new().assemble(
            input.filename,
            spans,
            layout,
            entities,
            image.dimensions(),
        ))
    }

    fn recognize(&self, image: &PixelBuffer) -> PipelineResult<Vec<TextSpan>> {
        info!("preprocessing image");
        let binary = self.preprocessor.preprocess(image)?;

        info!("performing OCR");
        let spans = self
            .ocr
            .recognize(&binary)
            .map_err(|e| PipelineError::processing(Stage::Ocr, e))?;
        info!(spans = spans.len(), "OCR finished");
        Ok(spans)
    }

    fn layout(&self, image: &PixelBuffer) -> PipelineResult<LayoutAnalysis> {
        info!("analyzing layout");
        let layout = self.analyzer.analyze(image)?;
        info!(
            blocks = layout.total_blocks,
            has_tables = layout.has_tables,
            "layout finished"
        );
        Ok(layout)
    }
}

/// Writes the full result, the extracted text and the entity sets.
pub fn export_result(result: &DocumentResult, output: &Path) -> Result<()> {
    let exporters: [&dyn Exporter; 3] = [
        &JsonExporter::new(output.to_path_buf()),
        &TextExporter::new(output.to_path_buf()),
        &EntitiesExporter::new(output.to_path_buf()),
    ];
    for exporter in exporters {
        exporter.export(result)?;
    }
    Ok(())
}
