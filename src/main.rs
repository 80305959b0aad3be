use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use docintel::core::init_tracing;
use docintel::layout::LayoutAnalyzer;
use docintel::ner::{EntityExtractor, NerBridge};
use docintel::ocr::OcrBridge;
use docintel::pipeline::{export_result, DocumentInput, DocumentPipeline, PipelineConfig};
use docintel::raster::{content_type_for_path, decode_image};

#[derive(Parser, Debug)]
#[command(name = "docintel")]
#[command(version, about = "Document image understanding: OCR text, layout blocks and entities", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline on one document image
    Process {
        /// Input image (PNG, JPEG, BMP, TIFF)
        input: PathBuf,

        /// Output directory (default: ./<input_name>_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Where to send the result
        #[arg(long, value_enum, default_value_t = Target::Files)]
        to: Target,

        /// Pipeline tunables as a JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        engines: EngineArgs,
    },

    /// Analyze page layout only (no OCR or NER helpers needed)
    Layout {
        input: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Extract entities from a UTF-8 text file
    Entities {
        input: PathBuf,

        /// Skip the NER helper and use fixed patterns only
        #[arg(long)]
        patterns_only: bool,

        #[command(flatten)]
        engines: EngineArgs,
    },

    /// Show information about an image file
    Info { input: PathBuf },

    /// Check that the configured helper scripts are present
    Health {
        #[command(flatten)]
        engines: EngineArgs,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Target {
    /// document.json, extracted_text.txt, layout.txt and extracted_entities.json
    Files,
    /// Pretty JSON on stdout
    Stdout,
}

#[derive(Args, Debug, Clone)]
struct EngineArgs {
    /// Interpreter used to run the helper scripts
    #[arg(long, env = "DOCINTEL_PYTHON", default_value = "python3")]
    python: String,

    /// OCR helper script
    #[arg(long, env = "DOCINTEL_OCR_SCRIPT", default_value = "bridge/ocr_bridge.py")]
    ocr_script: PathBuf,

    /// NER helper script
    #[arg(long, env = "DOCINTEL_NER_SCRIPT", default_value = "bridge/ner_bridge.py")]
    ner_script: PathBuf,

    /// OCR language code
    #[arg(long, env = "DOCINTEL_LANG", default_value = "en")]
    lang: String,

    /// NER model name passed to the helper
    #[arg(long, env = "DOCINTEL_NER_MODEL", default_value = "en_core_web_sm")]
    ner_model: String,
}

impl EngineArgs {
    fn ocr_bridge(&self, work_dir: PathBuf) -> OcrBridge {
        OcrBridge::new(work_dir)
            .with_script(self.ocr_script.clone())
            .with_python(self.python.clone())
            .with_lang(self.lang.clone())
    }

    fn ner_bridge(&self) -> NerBridge {
        NerBridge::new()
            .with_script(self.ner_script.clone())
            .with_python(self.python.clone())
            .with_model(self.ner_model.clone())
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            output,
            to,
            config,
            engines,
        } => process_document(input, output, to, config, engines),
        Commands::Layout { input, config } => analyze_layout(input, config),
        Commands::Entities {
            input,
            patterns_only,
            engines,
        } => extract_entities(input, patterns_only, engines),
        Commands::Info { input } => show_info(input),
        Commands::Health { engines } => check_health(engines),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("invalid config: {}", path.display()))
}

fn require_file(input: &Path) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }
    if !input.is_file() {
        anyhow::bail!("Input is not a file: {}", input.display());
    }
    Ok(())
}

fn process_document(
    input: PathBuf,
    output: Option<PathBuf>,
    to: Target,
    config: Option<PathBuf>,
    engines: EngineArgs,
) -> Result<()> {
    require_file(&input)?;
    let config = load_config(config.as_deref())?;

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let output_dir = output.unwrap_or_else(|| PathBuf::from(format!("{stem}_output")));
    let filename = input
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let bytes = fs::read(&input).with_context(|| format!("failed to read {}", input.display()))?;

    let ocr = engines.ocr_bridge(std::env::temp_dir().join("docintel-ocr"));
    let ner = engines.ner_bridge();
    let pipeline = DocumentPipeline::new(&config, &ocr, &ner);

    let result = pipeline
        .process(DocumentInput {
            filename: &filename,
            content_type: content_type_for_path(&input),
            bytes: &bytes,
        })
        .with_context(|| format!("Failed to process image: {}", input.display()))?;

    match to {
        Target::Stdout => println!("{}", serde_json::to_string_pretty(&result)?),
        Target::Files => {
            export_result(&result, &output_dir)
                .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;
            info!(output = %output_dir.display(), "results saved");
        }
    }

    Ok(())
}

fn analyze_layout(input: PathBuf, config: Option<PathBuf>) -> Result<()> {
    require_file(&input)?;
    let config = load_config(config.as_deref())?;
    let bytes = fs::read(&input).with_context(|| format!("failed to read {}", input.display()))?;

    let image = decode_image(&bytes)?;
    let layout = LayoutAnalyzer::new(config.layout).analyze(&image)?;
    println!("{}", serde_json::to_string_pretty(&layout)?);
    Ok(())
}

fn extract_entities(input: PathBuf, patterns_only: bool, engines: EngineArgs) -> Result<()> {
    require_file(&input)?;
    let text = fs::read_to_string(&input)
        .with_context(|| format!("failed to read text from {}", input.display()))?;

    let ner = engines.ner_bridge();
    let extractor = if patterns_only {
        EntityExtractor::patterns_only()
    } else {
        EntityExtractor::new(&ner)
    };
    let entities = extractor.extract(&text)?;
    println!("{}", serde_json::to_string_pretty(&entities)?);
    Ok(())
}

fn show_info(input: PathBuf) -> Result<()> {
    require_file(&input)?;
    let bytes = fs::read(&input).with_context(|| format!("failed to read {}", input.display()))?;
    let image = decode_image(&bytes)?;
    let dims = image.dimensions();

    println!("Image Information");
    println!("=================");
    println!("File: {}", input.display());
    println!("Size: {} x {} pixels", dims.width, dims.height);
    println!("Channels: {}", dims.channels);
    Ok(())
}

fn check_health(engines: EngineArgs) -> Result<()> {
    let ocr = engines.ocr_bridge(std::env::temp_dir().join("docintel-ocr"));
    let ner = engines.ner_bridge();
    let ocr_ready = ocr.script_path().is_file();
    let ner_ready = ner.script_path().is_file();

    let status = serde_json::json!({
        "status": if ocr_ready && ner_ready { "healthy" } else { "degraded" },
        "ocr_ready": ocr_ready,
        "nlp_ready": ner_ready,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);

    if !(ocr_ready && ner_ready) {
        warn!("one or more helper scripts are missing");
        anyhow::bail!("helpers not ready");
    }
    Ok(())
}
