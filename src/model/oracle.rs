use super::window::ContextWindow;
use crate::error::Result;

/// Probability of each vocabulary index being the character that follows a window.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    probs: Vec<f32>,
}

impl Distribution {
    pub fn new(probs: Vec<f32>) -> Self {
        Self { probs }
    }

    pub fn probs(&self) -> &[f32] {
        &self.probs
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Indices with probability at or above `threshold`, most probable first.
    /// Ties keep vocabulary order.
    pub fn candidates(&self, threshold: f32) -> CandidateSet {
        let mut entries: Vec<(usize, f32)> = self
            .probs
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, p)| p >= threshold)
            .collect();
        // Stable sort keeps index order among equal probabilities.
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        CandidateSet { entries }
    }
}

/// Characters judged plausible at one text position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    entries: Vec<(usize, f32)>,
}

impl CandidateSet {
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|&(i, _)| i)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.iter().any(|&(i, _)| i == index)
    }

    pub fn top(&self) -> Option<usize> {
        self.entries.first().map(|&(i, _)| i)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Trained character-prediction model.
///
/// `predict` returns the model's belief about the character immediately
/// following the window (offset +1). Models trained to predict one position
/// further must not be plugged in unchanged. Implementations are expected to
/// be deterministic for fixed weights; they take `&self` so one model can be
/// shared read-only across concurrent runs.
pub trait Oracle {
    fn predict(&self, window: &ContextWindow) -> Result<Distribution>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_filtered_and_sorted() {
        let dist = Distribution::new(vec![0.05, 0.2, 0.6, 0.15]);
        let set = dist.candidates(0.1);
        assert_eq!(set.indices().collect::<Vec<_>>(), vec![2, 1, 3]);
        assert_eq!(set.top(), Some(2));
        assert!(!set.contains(0));
    }

    #[test]
    fn test_candidates_threshold_inclusive() {
        let dist = Distribution::new(vec![0.25, 0.75]);
        let set = dist.candidates(0.25);
        assert_eq!(set.indices().collect::<Vec<_>>(), vec![1, 0]);
    }

    #[test]
    fn test_candidate_ties_keep_index_order() {
        let dist = Distribution::new(vec![0.1, 0.3, 0.3, 0.3]);
        let set = dist.candidates(0.2);
        assert_eq!(set.indices().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_candidate_set() {
        let dist = Distribution::new(vec![0.5, 0.5]);
        let set = dist.candidates(0.9);
        assert!(set.is_empty());
        assert_eq!(set.top(), None);
    }

    #[test]
    fn test_zero_threshold_accepts_everything() {
        let dist = Distribution::new(vec![0.0, 1.0, 0.0]);
        assert_eq!(dist.candidates(0.0).len(), 3);
    }
}
