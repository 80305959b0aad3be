use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::model::DocumentResult;
use crate::export::Exporter;

/// The complete result as `document.json`.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, result: &DocumentResult) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;
        let path = self.out_dir.join("document.json");
        let data = serde_json::to_string_pretty(result)?;
        fs::write(path, data)?;
        Ok(())
    }
}

/// Only the eight entity sets, as `extracted_entities.json`.
#[derive(Debug, Clone)]
pub struct EntitiesExporter {
    out_dir: PathBuf,
}

impl EntitiesExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for EntitiesExporter {
    fn export(&self, result: &DocumentResult) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;
        let path = self.out_dir.join("extracted_entities.json");
        let data = serde_json::to_string_pretty(&result.entities)?;
        fs::write(path, data)?;
        Ok(())
    }
}
