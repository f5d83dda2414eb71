use super::vocabulary::Vocabulary;
use crate::error::{CleanupError, Result};

/// One slot of a context window: encoded character and its position value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub index: usize,
    pub position: f32,
}

/// Fixed-size, left-padded, position-annotated window of preceding characters.
///
/// Always holds exactly `window_length` slots. Positions are spaced linearly
/// from -1.0 (slot 0) to 1.0 (last slot).
#[derive(Debug, Clone, PartialEq)]
pub struct ContextWindow {
    slots: Vec<Slot>,
}

/// Linearly spaced positions over `len` slots, endpoints exact.
fn positions(len: usize) -> impl Iterator<Item = f32> {
    (0..len).map(move |k| {
        if len == 1 {
            -1.0
        } else {
            -1.0 + 2.0 * k as f32 / (len - 1) as f32
        }
    })
}

impl ContextWindow {
    /// Builds the window for `fragment`.
    ///
    /// Characters outside the vocabulary are dropped first. A filtered fragment
    /// longer than the window length is a contract violation; it is never
    /// truncated.
    pub fn build(vocab: &Vocabulary, fragment: &str) -> Result<Self> {
        let encoded = vocab.encode(fragment);
        let window = vocab.window_length();
        if encoded.len() > window {
            return Err(CleanupError::ContractViolation {
                length: encoded.len(),
                window,
            });
        }

        let pad = vocab.pad_index();
        let indices = std::iter::repeat_n(pad, window - encoded.len()).chain(encoded);
        let slots = indices
            .zip(positions(window))
            .map(|(index, position)| Slot { index, position })
            .collect();

        Ok(Self { slots })
    }

    /// Returns a new window with the oldest slot dropped and `index` appended.
    pub fn shifted(&self, index: usize) -> Self {
        let indices = self
            .slots
            .iter()
            .skip(1)
            .map(|s| s.index)
            .chain(std::iter::once(index));
        let slots = indices
            .zip(positions(self.slots.len()))
            .map(|(index, position)| Slot { index, position })
            .collect();
        Self { slots }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().map(|s| s.index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
