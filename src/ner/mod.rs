pub mod bridge;
pub mod entities;
pub mod patterns;

pub use bridge::NerBridge;
pub use entities::EntityExtractor;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A span of text labelled by a named-entity model (`PERSON`, `ORG`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabeledSpan {
    pub text: String,
    pub label: String,
}

impl LabeledSpan {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// Named-entity model consumed by the entity extractor.
pub trait EntityRecognizer: Send + Sync {
    fn label(&self, text: &str) -> Result<Vec<LabeledSpan>>;
}
