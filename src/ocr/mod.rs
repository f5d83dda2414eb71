pub mod engine;
pub mod reconstruct;

pub use engine::{
    parse_box_output, parse_kraken_output, parse_tsv_output, tokens_to_text, CharBox,
    KrakenCli, OcrToken, Recognizer, TesseractCli,
};
pub use reconstruct::reconstruct_text;

use anyhow::Result;

use crate::config::{OcrEngine, OcrSettings};

/// Where the recognized text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    PrimaryTokens,
    FallbackTokens,
    Reconstruction,
    Kraken,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    pub source: TextSource,
}

/// Recognizes `image` with the engine selected in `settings`.
pub fn recognize_image(image: &[u8], settings: &OcrSettings) -> Result<Recognition> {
    match settings.engine {
        OcrEngine::Tesseract => {
            let recognizer = TesseractCli::new(settings.clone());
            recognize_text(&recognizer, image, settings)
        }
        OcrEngine::Kraken => {
            let text = KrakenCli::new(settings.clone()).recognize_text(image)?;
            crate::log(&format!("OCR via kraken: {} lines", text.lines().count()));
            Ok(Recognition {
                text,
                source: TextSource::Kraken,
            })
        }
    }
}

/// True when token output has collapsed: one token or fewer, or a long run
/// with no interior whitespace.
pub fn is_degenerate(tokens: &[OcrToken], min_len: usize) -> bool {
    if tokens.len() <= 1 {
        return true;
    }
    let text = tokens_to_text(tokens);
    let text = text.trim();
    text.chars().count() > min_len && !text.contains(char::is_whitespace)
}

/// Whether the box reconstruction recovered materially more than the tokens.
fn prefer_reconstruction(token_text: &str, rebuilt: &str, ratio: f32) -> bool {
    let rebuilt_len = rebuilt.trim().chars().count();
    let token_len = token_text.trim().chars().count();
    rebuilt_len > 0 && rebuilt_len as f32 >= ratio * token_len as f32
}

/// Recognizes text with a two-pass token strategy and a geometric fallback.
///
/// - Pass 1: tokens under the primary segmentation mode; used if not degenerate
/// - Pass 2: tokens under the fallback mode
/// - Fallback: after a retry, character boxes are reconstructed and that text
///   replaces the token text when it is at least `reconstruction_ratio` times
///   longer
pub fn recognize_text<R: Recognizer + ?Sized>(
    recognizer: &R,
    image: &[u8],
    settings: &OcrSettings,
) -> Result<Recognition> {
    let primary = recognizer.recognize_tokens(image, &settings.primary_psm)?;
    if !is_degenerate(&primary, settings.degenerate_min_len) {
        crate::log(&format!(
            "OCR pass 1 (psm {}): {} tokens",
            settings.primary_psm,
            primary.len()
        ));
        return Ok(Recognition {
            text: tokens_to_text(&primary),
            source: TextSource::PrimaryTokens,
        });
    }

    crate::log(&format!(
        "OCR pass 1 (psm {}) degenerate with {} tokens, retrying with psm {}",
        settings.primary_psm,
        primary.len(),
        settings.fallback_psm
    ));

    let fallback = recognizer.recognize_tokens(image, &settings.fallback_psm)?;
    let primary_text = tokens_to_text(&primary);
    let fallback_text = tokens_to_text(&fallback);

    let tokens = if !is_degenerate(&fallback, settings.degenerate_min_len)
        || fallback_text.trim().chars().count() > primary_text.trim().chars().count()
    {
        Recognition {
            text: fallback_text,
            source: TextSource::FallbackTokens,
        }
    } else {
        Recognition {
            text: primary_text,
            source: TextSource::PrimaryTokens,
        }
    };

    let boxes = match recognizer.recognize_boxes(image) {
        Ok(boxes) => boxes,
        Err(e) => {
            crate::log(&format!(
                "Warning: character box recognition failed: {}. Keeping token text.",
                e
            ));
            return Ok(tokens);
        }
    };

    let rebuilt = reconstruct_text(&boxes);
    if prefer_reconstruction(&tokens.text, &rebuilt, settings.reconstruction_ratio) {
        crate::log(&format!(
            "Using box reconstruction ({} chars) over token text ({} chars)",
            rebuilt.chars().count(),
            tokens.text.chars().count()
        ));
        return Ok(Recognition {
            text: rebuilt,
            source: TextSource::Reconstruction,
        });
    }

    Ok(tokens)
}
