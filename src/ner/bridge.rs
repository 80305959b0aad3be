use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::debug;

use crate::helper::{HelperCommand, PersistentHelper};
use crate::ner::{EntityRecognizer, LabeledSpan};

#[derive(Serialize)]
struct NerRequest<'a> {
    text: &'a str,
}

/// Drives an external named-entity helper (a spaCy wrapper by default).
///
/// The helper loads `--model` once and then answers `{"text": ...}` lines with
/// a JSON array of `{text, label}` objects.
pub struct NerBridge {
    script_path: PathBuf,
    python: String,
    model: String,
    helper: OnceCell<PersistentHelper>,
}

impl NerBridge {
    pub fn new() -> Self {
        Self {
            script_path: PathBuf::from("bridge/ner_bridge.py"),
            python: "python3".to_string(),
            model: "en_core_web_sm".to_string(),
            helper: OnceCell::new(),
        }
    }

    pub fn with_script(mut self, script_path: PathBuf) -> Self {
        self.script_path = script_path;
        self
    }

    pub fn with_python(mut self, python: String) -> Self {
        self.python = python;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    fn helper(&self) -> &PersistentHelper {
        self.helper.get_or_init(|| {
            PersistentHelper::new(
                HelperCommand::new(self.python.clone(), self.script_path.clone())
                    .arg("--model")
                    .arg(self.model.clone()),
            )
        })
    }
}

impl Default for NerBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRecognizer for NerBridge {
    fn label(&self, text: &str) -> Result<Vec<LabeledSpan>> {
        let spans: Vec<LabeledSpan> = self
            .helper()
            .call(&NerRequest { text })
            .context("NER bridge failed")?;
        debug!(spans = spans.len(), "NER bridge returned");
        Ok(spans)
    }
}
