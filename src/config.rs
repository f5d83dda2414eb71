//! Configuration for correction runs and the OCR collaborator.
//!
//! Loaded from a JSON file at startup and passed explicitly to the components
//! that need it. Missing fields take their defaults; an unreadable or invalid
//! file falls back to defaults entirely.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What to do when the model call fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleFailurePolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Treat the position as having no confident prediction.
    NoPrediction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionSettings {
    /// Scan limit as a multiple of the input length
    pub depth: usize,
    /// Maximum insertions made while repairing one position
    pub insertion_attempts: usize,
    /// Hard cap on oracle calls per run; `None` disables it
    pub max_oracle_calls: Option<usize>,
    /// Wall-clock limit per run in milliseconds
    pub timeout_ms: Option<u64>,
    pub oracle_failure: OracleFailurePolicy,
}

impl Default for CorrectionSettings {
    fn default() -> Self {
        Self {
            depth: 5,
            insertion_attempts: 5,
            max_oracle_calls: Some(250_000),
            timeout_ms: None,
            oracle_failure: OracleFailurePolicy::Abort,
        }
    }
}

/// Which OCR executable produces the text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngine {
    /// Two-pass tesseract recognition with box reconstruction
    #[default]
    Tesseract,
    /// Single kraken pass (baseline segmentation, then recognition)
    Kraken,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    pub engine: OcrEngine,
    /// Tesseract executable name or path
    pub tesseract: String,
    /// Tesseract language code
    pub lang: String,
    /// Page segmentation mode for the first token pass
    pub primary_psm: String,
    /// Page segmentation mode for the retry pass
    pub fallback_psm: String,
    /// Token text longer than this with no interior whitespace counts as degenerate
    pub degenerate_min_len: usize,
    /// Reconstructed text replaces token text only if at least this many times longer
    pub reconstruction_ratio: f32,
    /// Kraken executable name or path
    pub kraken: String,
    /// Recognition model passed to kraken with `-m`; kraken's default if unset
    pub kraken_model: Option<String>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            engine: OcrEngine::default(),
            tesseract: "tesseract".to_string(),
            lang: "lat".to_string(),
            primary_psm: "6".to_string(),
            fallback_psm: "11".to_string(),
            degenerate_min_len: 8,
            reconstruction_ratio: 1.1,
            kraken: "kraken".to_string(),
            kraken_model: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub correction: CorrectionSettings,
    pub ocr: OcrSettings,
}

/// Loads configuration from `explicit`, or the first existing default location.
pub fn load_config(explicit: Option<&Path>) -> CleanupConfig {
    let path: Option<PathBuf> = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => crate::paths::config_candidates()
            .into_iter()
            .find(|p| p.exists()),
    };

    let Some(path) = path else {
        crate::log("config.json not found. Using default config.");
        return CleanupConfig::default();
    };

    crate::log(&format!("Looking for config at: {}", path.display()));

    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                crate::log(&format!("Config loaded from {}", path.display()));
                config
            }
            Err(e) => {
                crate::log(&format!(
                    "Failed to parse {}: {}. Using defaults.",
                    path.display(),
                    e
                ));
                CleanupConfig::default()
            }
        },
        Err(e) => {
            crate::log(&format!(
                "Failed to read {}: {}. Using defaults.",
                path.display(),
                e
            ));
            CleanupConfig::default()
        }
    }
}
