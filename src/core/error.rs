//! Error types for the document pipeline.
//!
//! Every failure aborts the whole request; there is no partial-success shape.

use thiserror::Error;

/// Pipeline stage a [`PipelineError::ProcessingFailure`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    Ocr,
    Layout,
    Ner,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Preprocess => write!(f, "preprocessing"),
            Stage::Ocr => write!(f, "text recognition"),
            Stage::Layout => write!(f, "layout analysis"),
            Stage::Ner => write!(f, "entity recognition"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The payload does not declare itself as an image.
    #[error("file must be an image, got content type '{content_type}'")]
    InvalidInputType { content_type: String },

    /// The payload could not be decoded into a pixel buffer.
    #[error("invalid image file: {reason}")]
    InvalidImage { reason: String },

    /// Any failure raised while analysing a decoded image.
    #[error("processing error during {stage}: {source}")]
    ProcessingFailure {
        stage: Stage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl PipelineError {
    pub fn invalid_image(reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            reason: reason.into(),
        }
    }

    pub fn processing(
        stage: Stage,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ProcessingFailure {
            stage,
            source: source.into(),
        }
    }

    /// Errors caused by the submitted payload rather than by the analysis.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInputType { .. } | Self::InvalidImage { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInputType { .. } => "invalid_input_type",
            Self::InvalidImage { .. } => "invalid_image",
            Self::ProcessingFailure { .. } => "processing_failure",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
