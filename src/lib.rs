//! Latin OCR cleanup.
//!
//! Rebuilds spaced text from character boxes when token-level recognition
//! degenerates, then repairs implausible characters using a character
//! prediction model evaluated over a sliding context window.

pub mod config;
pub mod correction;
pub mod error;
pub mod model;
pub mod ocr;
pub mod paths;

pub use config::{load_config, CleanupConfig};
pub use correction::{parse_threshold, Correction, Corrector};
pub use error::CleanupError;
pub use model::{Oracle, SuffixTableOracle, Vocabulary};

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;

/// Logs a message to stderr and to the log file with timestamp.
///
/// Stdout is left alone: the binary prints corrected text there for the caller
/// to capture. The log file is only written when the logs directory exists.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    eprint!("{}", line);
    let logs_dir = paths::get_logs_dir();
    if !logs_dir.is_dir() {
        return;
    }
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs_dir.join("ocr_cleanup.log"))
    {
        let _ = file.write_all(line.as_bytes());
    }
}
