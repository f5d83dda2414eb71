//! Oracle backed by a JSON suffix-table model artifact.
//!
//! The artifact maps context suffixes to next-character probability vectors:
//!
//! ```json
//! { "vocabulary": " abc", "window_length": 32,
//!   "contexts": { "": [0.4, 0.2, 0.2, 0.2], "ab": [0.1, 0.1, 0.1, 0.7] } }
//! ```
//!
//! Prediction looks up the longest suffix of the decoded window present in the
//! table and backs off to shorter ones. The root context `""` is mandatory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::oracle::{Distribution, Oracle};
use super::vocabulary::Vocabulary;
use super::window::ContextWindow;
use crate::error::{CleanupError, Result};

#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
    vocabulary: String,
    window_length: usize,
    contexts: HashMap<String, Vec<f32>>,
}

#[derive(Debug, Clone)]
pub struct SuffixTableOracle {
    vocab: Vocabulary,
    contexts: HashMap<String, Vec<f32>>,
    /// Longest context key, in characters.
    max_order: usize,
}

impl SuffixTableOracle {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CleanupError::Model(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_str(json)
            .map_err(|e| CleanupError::Model(format!("failed to parse artifact: {}", e)))?;

        let vocab = Vocabulary::new(artifact.vocabulary.chars(), artifact.window_length)?;

        if !artifact.contexts.contains_key("") {
            return Err(CleanupError::Model(
                "missing root context \"\"".to_string(),
            ));
        }

        let mut contexts = HashMap::with_capacity(artifact.contexts.len());
        let mut max_order = 0;
        for (key, probs) in artifact.contexts {
            let probs = normalize(&key, probs, vocab.size())?;
            max_order = max_order.max(key.chars().count());
            contexts.insert(key, probs);
        }

        Ok(Self {
            vocab,
            contexts,
            max_order,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }
}

/// Validates one probability vector and rescales it to sum to 1.
fn normalize(key: &str, probs: Vec<f32>, size: usize) -> Result<Vec<f32>> {
    if probs.len() != size {
        return Err(CleanupError::Model(format!(
            "context {:?} has {} probabilities, vocabulary has {}",
            key,
            probs.len(),
            size
        )));
    }
    if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(CleanupError::Model(format!(
            "context {:?} has a negative or non-finite probability",
            key
        )));
    }
    let total: f32 = probs.iter().sum();
    if total <= 0.0 {
        return Err(CleanupError::Model(format!(
            "context {:?} has zero total probability",
            key
        )));
    }
    Ok(probs.into_iter().map(|p| p / total).collect())
}

impl Oracle for SuffixTableOracle {
    fn predict(&self, window: &ContextWindow) -> Result<Distribution> {
        if window.len() != self.vocab.window_length() {
            return Err(CleanupError::PredictionFailure(format!(
                "window has {} slots, model expects {}",
                window.len(),
                self.vocab.window_length()
            )));
        }

        let indices: Vec<usize> = window.indices().collect();
        let chars: Vec<char> = self
            .vocab
            .decode(&indices)
            .map_err(|e| CleanupError::PredictionFailure(e.to_string()))?
            .chars()
            .collect();

        let longest = self.max_order.min(chars.len());
        for order in (0..=longest).rev() {
            let suffix: String = chars[chars.len() - order..].iter().collect();
            if let Some(probs) = self.contexts.get(&suffix) {
                return Ok(Distribution::new(probs.clone()));
            }
        }

        // Root presence is checked at load time.
        Err(CleanupError::PredictionFailure(
            "no context matched the window".to_string(),
        ))
    }
}
