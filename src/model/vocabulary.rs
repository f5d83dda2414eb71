use std::collections::HashMap;

use crate::error::{CleanupError, Result};

/// Character used to left-pad context windows. Every vocabulary must contain it.
pub const PAD_CHAR: char = ' ';

/// Closed, ordered alphabet with a bijective character to index mapping.
///
/// Built once from the model artifact and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    chars: Vec<char>,
    index: HashMap<char, usize>,
    pad_index: usize,
    window_length: usize,
}

impl Vocabulary {
    /// Builds a vocabulary from an ordered character list.
    ///
    /// Rejects duplicates (the mapping would no longer be bijective), a
    /// missing pad character, and a zero window length.
    pub fn new(chars: impl IntoIterator<Item = char>, window_length: usize) -> Result<Self> {
        if window_length == 0 {
            return Err(CleanupError::InvalidVocabulary(
                "window length must be at least 1".to_string(),
            ));
        }

        let chars: Vec<char> = chars.into_iter().collect();
        let mut index = HashMap::with_capacity(chars.len());
        for (i, &c) in chars.iter().enumerate() {
            if index.insert(c, i).is_some() {
                return Err(CleanupError::InvalidVocabulary(format!(
                    "duplicate character {:?}",
                    c
                )));
            }
        }

        let Some(&pad_index) = index.get(&PAD_CHAR) else {
            return Err(CleanupError::InvalidVocabulary(
                "the space character is required for padding".to_string(),
            ));
        };

        Ok(Self {
            chars,
            index,
            pad_index,
            window_length,
        })
    }

    pub fn index_of(&self, c: char) -> Option<usize> {
        self.index.get(&c).copied()
    }

    pub fn char_at(&self, index: usize) -> Result<char> {
        self.chars
            .get(index)
            .copied()
            .ok_or(CleanupError::IndexOutOfRange {
                index,
                size: self.chars.len(),
            })
    }

    pub fn size(&self) -> usize {
        self.chars.len()
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn pad_index(&self) -> usize {
        self.pad_index
    }

    /// Encodes text, silently dropping characters outside the vocabulary.
    pub fn encode(&self, text: &str) -> Vec<usize> {
        text.chars().filter_map(|c| self.index_of(c)).collect()
    }

    pub fn decode(&self, indices: &[usize]) -> Result<String> {
        indices.iter().map(|&i| self.char_at(i)).collect()
    }
}
