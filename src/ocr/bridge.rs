use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use image::ImageFormat;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::geometry::{Point, Quad};
use crate::core::model::TextSpan;
use crate::helper::{HelperCommand, PersistentHelper};
use crate::ocr::OcrEngine;
use crate::raster::PixelBuffer;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Serialize)]
struct OcrRequest<'a> {
    image: &'a Path,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrToken {
    pub text: String,
    pub confidence: f32,
    pub bbox: Vec<[f64; 2]>,
}

impl OcrToken {
    pub fn into_span(self) -> Result<TextSpan> {
        let points: Vec<Point> = self
            .bbox
            .iter()
            .map(|[x, y]| Point::new(*x as i32, *y as i32))
            .collect();
        let quad: Quad = points.try_into().map_err(|points: Vec<Point>| {
            anyhow::anyhow!(
                "OCR region '{}' has {} corner points, expected 4",
                self.text,
                points.len()
            )
        })?;
        Ok(TextSpan {
            text: self.text,
            confidence: self.confidence.clamp(0.0, 1.0),
            bbox: quad,
        })
    }
}

/// Drives an external recognition helper (an EasyOCR wrapper by default).
///
/// The helper is started with `--lang <code>` on the first request and kept
/// alive, so the model loads once. Each request is `{"image": "<png>"}` on one
/// line; the reply is a JSON array of `{text, confidence, bbox}` with four
/// `[x, y]` corners per region.
pub struct OcrBridge {
    work_dir: PathBuf,
    script_path: PathBuf,
    python: String,
    lang: String,
    helper: OnceCell<PersistentHelper>,
}

impl OcrBridge {
    pub fn new(work_dir: PathBuf) -> Self {
        Self {
            work_dir,
            script_path: PathBuf::from("bridge/ocr_bridge.py"),
            python: "python3".to_string(),
            lang: "en".to_string(),
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

    pub fn with_lang(mut self, lang: String) -> Self {
        self.lang = lang;
        self
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    fn helper(&self) -> &PersistentHelper {
        self.helper.get_or_init(|| {
            PersistentHelper::new(
                HelperCommand::new(self.python.clone(), self.script_path.clone())
                    .arg("--lang")
                    .arg(self.lang.clone()),
            )
        })
    }

    pub fn run(&self, image_path: &Path) -> Result<Vec<OcrToken>> {
        self.helper()
            .call(&OcrRequest { image: image_path })
            .context("OCR bridge failed")
    }

    fn stage_image(&self, image: &PixelBuffer) -> Result<PathBuf> {
        fs::create_dir_all(&self.work_dir)
            .with_context(|| format!("failed to create {}", self.work_dir.display()))?;
        let id = NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed);
        let path = self
            .work_dir
            .join(format!("ocr-input-{}-{id}.png", std::process::id()));
        image
            .as_image()
            .save_with_format(&path, ImageFormat::Png)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

impl OcrEngine for OcrBridge {
    fn recognize(&self, image: &PixelBuffer) -> Result<Vec<TextSpan>> {
        let path = self.stage_image(image)?;
        let tokens = self.run(&path);
        if let Err(e) = fs::remove_file(&path) {
            warn!(path = %path.display(), "failed to remove staged OCR image: {e}");
        }

        let tokens = tokens?;
        debug!(regions = tokens.len(), "OCR bridge returned");
        tokens.into_iter().map(OcrToken::into_span).collect()
    }
}
