use crate::error::{CleanupError, Result};

/// Mutable text under correction, indexed by character.
///
/// Each edit returns how far a cursor sitting on `pos` must move to keep
/// pointing at the same original character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    chars: Vec<char>,
}

impl TextBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<char> {
        self.chars.get(pos).copied()
    }

    /// Up to `max` characters immediately preceding `pos`.
    pub fn preceding(&self, pos: usize, max: usize) -> String {
        let end = pos.min(self.chars.len());
        self.chars[end.saturating_sub(max)..end].iter().collect()
    }

    /// Inserts `chars` before `pos`. The original character moves right by
    /// the number of characters inserted.
    pub fn insert_before(&mut self, pos: usize, chars: &[char]) -> Result<usize> {
        self.check(pos, self.chars.len() + 1)?;
        self.chars.splice(pos..pos, chars.iter().copied());
        Ok(chars.len())
    }

    /// Removes the character at `pos`. The next character slides into `pos`,
    /// so the cursor stays put.
    pub fn delete_at(&mut self, pos: usize) -> Result<usize> {
        self.check(pos, self.chars.len())?;
        self.chars.remove(pos);
        Ok(0)
    }

    pub fn replace_at(&mut self, pos: usize, c: char) -> Result<usize> {
        self.check(pos, self.chars.len())?;
        self.chars[pos] = c;
        Ok(0)
    }

    fn check(&self, pos: usize, size: usize) -> Result<()> {
        if pos < size {
            Ok(())
        } else {
            Err(CleanupError::IndexOutOfRange { index: pos, size })
        }
    }
}

impl std::fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in &self.chars {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}
