pub mod assembly;
pub mod core;
pub mod export;
pub mod helper;
pub mod layout;
pub mod ner;
pub mod ocr;
pub mod pipeline;
pub mod raster;

pub use crate::core::error::{PipelineError, Stage};
pub use crate::core::model::{DocumentResult, Entities, LayoutAnalysis, TextSpan};
pub use pipeline::{DocumentInput, DocumentPipeline, PipelineConfig};
