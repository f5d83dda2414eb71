//! OCR cleanup command-line tool.
//!
//! Prints the resulting text on stdout for the caller to capture. Progress and
//! warnings go to stderr and the log file.
//!
//! # Usage
//!
//! ```bash
//! ocr-cleanup correct "sacra quae Cronia esse iterantur" 1/32 --model model.json
//! ocr-cleanup ocr page.png --threshold 0.03 --model model.json
//! ocr-cleanup ocr page.png --engine kraken --kraken-model latin.mlmodel
//! ocr-cleanup reconstruct page.box
//! ```

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use ocr_cleanup::correction::{Completion, Corrector};
use ocr_cleanup::config::OcrEngine;
use ocr_cleanup::ocr::{parse_box_output, reconstruct_text, recognize_image};
use ocr_cleanup::{load_config, log, parse_threshold, paths, CleanupConfig, SuffixTableOracle};

#[derive(Parser)]
#[command(name = "ocr-cleanup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cleans noisy Latin OCR output", long_about = None)]
struct Cli {
    /// Configuration file (defaults to config.json next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correct OCR text with the character model
    Correct {
        /// Text to correct
        text: String,

        /// Acceptance threshold between 0 and 1, as a fraction ("1/32") or
        /// decimal ("0.03"); values outside that range are rejected
        threshold: String,

        /// Path to the model artifact
        #[arg(long, env = "OCR_CLEANUP_MODEL")]
        model: PathBuf,
    },
    /// Recognize an image with tesseract or kraken, optionally correcting the text
    Ocr {
        /// Image file to recognize
        image: PathBuf,

        /// Correct the recognized text with this threshold (between 0 and 1,
        /// as "1/32" or "0.03")
        #[arg(long)]
        threshold: Option<String>,

        /// Path to the model artifact (required with --threshold)
        #[arg(long, env = "OCR_CLEANUP_MODEL")]
        model: Option<PathBuf>,

        /// OCR engine (tesseract, kraken); overrides the config file
        #[arg(long)]
        engine: Option<String>,

        /// Kraken recognition model (overrides the config file)
        #[arg(long)]
        kraken_model: Option<String>,
    },
    /// Rebuild spaced text from a tesseract box file
    Reconstruct {
        /// Box file: `glyph left bottom right top page` per line
        boxes: PathBuf,
    },
}

fn parse_engine(name: &str) -> Result<OcrEngine> {
    match name.to_lowercase().as_str() {
        "tesseract" => Ok(OcrEngine::Tesseract),
        "kraken" => Ok(OcrEngine::Kraken),
        other => Err(anyhow!("Unknown OCR engine '{}' (expected tesseract or kraken)", other)),
    }
}

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        log(&format!("[PANIC]{} {}", location, msg));
    }));

    let cli = Cli::parse();

    if let Err(e) = paths::ensure_directories() {
        log(&format!("Warning: could not create logs directory: {}", e));
    }

    match cli.command {
        Commands::Correct {
            text,
            threshold,
            model,
        } => {
            // Validated before anything else is loaded.
            let threshold = parse_threshold(&threshold)?;
            let config = load_config(cli.config.as_deref());
            let corrected = correct_text(&text, threshold, &model, &config)?;
            println!("{}", corrected);
        }
        Commands::Ocr {
            image,
            threshold,
            model,
            engine,
            kraken_model,
        } => {
            let correction = match (threshold, model) {
                (Some(t), Some(m)) => Some((parse_threshold(&t)?, m)),
                (Some(_), None) => return Err(anyhow!("--threshold requires --model")),
                (None, _) => None,
            };
            let engine = engine.as_deref().map(parse_engine).transpose()?;
            let mut config = load_config(cli.config.as_deref());
            if let Some(engine) = engine {
                config.ocr.engine = engine;
            }
            if kraken_model.is_some() {
                config.ocr.kraken_model = kraken_model;
            }

            let bytes = fs::read(&image)
                .map_err(|e| anyhow!("Failed to read {}: {}", image.display(), e))?;
            let recognition = recognize_image(&bytes, &config.ocr)?;
            log(&format!("Recognized text via {:?}", recognition.source));

            let text = match correction {
                Some((threshold, model)) => {
                    correct_text(&recognition.text, threshold, &model, &config)?
                }
                None => recognition.text,
            };
            println!("{}", text);
        }
        Commands::Reconstruct { boxes } => {
            let contents = fs::read_to_string(&boxes)
                .map_err(|e| anyhow!("Failed to read {}: {}", boxes.display(), e))?;
            println!("{}", reconstruct_text(&parse_box_output(&contents)));
        }
    }

    Ok(())
}

/// Loads the model and runs one correction pass over `text`.
fn correct_text(
    text: &str,
    threshold: f32,
    model: &Path,
    config: &CleanupConfig,
) -> Result<String> {
    let oracle = SuffixTableOracle::load(model)?;
    log(&format!(
        "Model loaded: {} characters, window {}",
        oracle.vocabulary().size(),
        oracle.vocabulary().window_length()
    ));

    let corrector = Corrector::new(oracle.vocabulary(), &oracle, config.correction.clone());
    let result = corrector.correct(text, threshold)?;
    if result.completion != Completion::Finished {
        log(&format!(
            "Warning: correction incomplete ({:?}); output is partial",
            result.completion
        ));
    }

    Ok(result.text)
}
