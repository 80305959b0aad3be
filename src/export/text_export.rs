use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::model::{DocumentResult, LayoutBlock};
use crate::export::Exporter;

/// Writes the recognized text and a plain listing of layout blocks.
#[derive(Debug, Clone)]
pub struct TextExporter {
    out_dir: PathBuf,
}

impl TextExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn format_block(block: &LayoutBlock) -> String {
        let bbox = block.bbox;
        format!(
            "[{} at x:{} y:{} w:{} h:{}]",
            block.kind.as_str().to_uppercase(),
            bbox.x,
            bbox.y,
            bbox.width,
            bbox.height
        )
    }
}

impl Exporter for TextExporter {
    fn export(&self, result: &DocumentResult) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;

        fs::write(self.out_dir.join("extracted_text.txt"), &result.ocr.full_text)?;

        let mut listing = String::new();
        for block in &result.layout.blocks {
            listing.push_str(&Self::format_block(block));
            listing.push('\n');
        }
        if result.layout.has_tables {
            listing.push_str("[TABLE RULES DETECTED]\n");
        }
        fs::write(self.out_dir.join("layout.txt"), listing)?;

        Ok(())
    }
}
