//! Position-by-position correction of OCR text.
//!
//! At each position the preceding characters form a context window. If the
//! oracle considers the observed character implausible, the engine tries, in
//! order: substituting a candidate, deleting the character, and an insertion
//! chain of up to `insertion_attempts` model-proposed characters. Only an
//! empty candidate set leaves the character as it was.

use std::time::Duration;

use super::budget::{CancelToken, Halt, RetryBudget, RunBudget};
use super::buffer::TextBuffer;
use crate::config::{CorrectionSettings, OracleFailurePolicy};
use crate::error::{CleanupError, Result};
use crate::model::{CandidateSet, ContextWindow, Oracle, Vocabulary};

/// How a correction run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Finished,
    CallBudgetExhausted,
    Cancelled,
    TimedOut,
}

impl From<Halt> for Completion {
    fn from(halt: Halt) -> Self {
        match halt {
            Halt::CallBudgetExhausted => Completion::CallBudgetExhausted,
            Halt::Cancelled => Completion::Cancelled,
            Halt::TimedOut => Completion::TimedOut,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionStats {
    pub accepted: usize,
    pub substitutions: usize,
    pub deletions: usize,
    /// Characters inserted, not insertion events.
    pub insertions: usize,
    /// Implausible characters no repair could fix.
    pub unchanged: usize,
    /// Characters outside the vocabulary, passed through untouched.
    pub skipped: usize,
    pub oracle_calls: usize,
    /// Failed oracle calls treated as "no prediction".
    pub oracle_failures: usize,
}

/// Result of a correction run. `text` is partial unless `completion` is `Finished`.
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub text: String,
    pub stats: CorrectionStats,
    pub completion: Completion,
}

/// Early exit from a position.
enum Stop {
    Halt(Halt),
    Failed(CleanupError),
}

impl From<CleanupError> for Stop {
    fn from(e: CleanupError) -> Self {
        Stop::Failed(e)
    }
}

/// State owned by one run.
struct Run {
    buf: TextBuffer,
    cursor: usize,
    threshold: f32,
    budget: RunBudget,
    stats: CorrectionStats,
}

pub struct Corrector<'a, O: Oracle> {
    vocab: &'a Vocabulary,
    oracle: &'a O,
    settings: CorrectionSettings,
    cancel: Option<CancelToken>,
}

impl<'a, O: Oracle> Corrector<'a, O> {
    pub fn new(vocab: &'a Vocabulary, oracle: &'a O, settings: CorrectionSettings) -> Self {
        Self {
            vocab,
            oracle,
            settings,
            cancel: None,
        }
    }

    /// Attaches a token checked before every oracle call.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Corrects `text` with acceptance threshold `threshold`.
    ///
    /// Budget exhaustion, cancellation and timeout return the partial buffer.
    /// Oracle failures abort the run unless the settings ask to treat them as
    /// "no prediction".
    pub fn correct(&self, text: &str, threshold: f32) -> Result<Correction> {
        let mut run = Run {
            buf: TextBuffer::new(text),
            cursor: 0,
            threshold,
            budget: RunBudget::new(
                self.settings.max_oracle_calls,
                self.settings.timeout_ms.map(Duration::from_millis),
                self.cancel.clone(),
            ),
            stats: CorrectionStats::default(),
        };

        let scan_limit = run.buf.len().saturating_mul(self.settings.depth);
        let mut completion = Completion::Finished;

        // The last character is never examined: every repair needs a follower.
        while run.cursor + 1 < run.buf.len() && run.cursor < scan_limit {
            match self.step(&mut run) {
                Ok(()) => {}
                Err(Stop::Halt(halt)) => {
                    crate::log(&format!(
                        "Warning: correction stopped at position {} of {}: {}. Returning partial text.",
                        run.cursor,
                        run.buf.len(),
                        halt
                    ));
                    completion = halt.into();
                    break;
                }
                Err(Stop::Failed(e)) => return Err(e),
            }
        }

        run.stats.oracle_calls = run.budget.calls();
        if run.stats.oracle_failures > 0 {
            crate::log(&format!(
                "Warning: {} oracle calls failed and were treated as no prediction",
                run.stats.oracle_failures
            ));
        }
        crate::log(&format!(
            "Correction done: {} substitutions, {} deletions, {} insertions, {} unchanged ({} oracle calls)",
            run.stats.substitutions,
            run.stats.deletions,
            run.stats.insertions,
            run.stats.unchanged,
            run.stats.oracle_calls
        ));

        Ok(Correction {
            text: run.buf.to_string(),
            stats: run.stats,
            completion,
        })
    }

    /// Examines the character under the cursor and advances or repairs.
    fn step(&self, run: &mut Run) -> std::result::Result<(), Stop> {
        let pos = run.cursor;
        let Some(current) = run.buf.get(pos).and_then(|c| self.vocab.index_of(c)) else {
            run.stats.skipped += 1;
            run.cursor += 1;
            return Ok(());
        };

        let window = self.window_at(&run.buf, pos)?;
        let candidates = self.query(run, &window, pos)?;

        if candidates.contains(current) {
            run.stats.accepted += 1;
            run.cursor += 1;
            return Ok(());
        }
        if candidates.is_empty() {
            run.stats.unchanged += 1;
            run.cursor += 1;
            return Ok(());
        }

        let next = run.buf.get(pos + 1).and_then(|c| self.vocab.index_of(c));
        if let Some(next) = next {
            for candidate in candidates.indices() {
                let trial = window.shifted(candidate);
                if self.query(run, &trial, pos + 1)?.contains(next) {
                    run.cursor += run.buf.replace_at(pos, self.vocab.char_at(candidate)?)?;
                    run.cursor += 1;
                    run.stats.substitutions += 1;
                    return Ok(());
                }
            }

            if candidates.contains(next) {
                run.cursor += run.buf.delete_at(pos)?;
                run.stats.deletions += 1;
                return Ok(());
            }
        }

        self.insert_chain(run, window, &candidates, current)
    }

    /// Inserts the top guess before the cursor and checks whether the
    /// displaced character now fits. If it does not, that character is
    /// overwritten with the model's next guess and the chain moves on to the
    /// following character, for at most `insertion_attempts` insertions.
    fn insert_chain(
        &self,
        run: &mut Run,
        mut window: ContextWindow,
        candidates: &CandidateSet,
        original: usize,
    ) -> std::result::Result<(), Stop> {
        let mut retries = RetryBudget::new(self.settings.insertion_attempts);
        let mut target = original;
        let mut guess = candidates.top();

        while retries.try_take() {
            let Some(g) = guess else {
                break;
            };
            run.cursor += run.buf.insert_before(run.cursor, &[self.vocab.char_at(g)?])?;
            run.stats.insertions += 1;
            window = window.shifted(g);

            // The cursor now sits on the displaced character.
            let after = self.query(run, &window, run.cursor)?;
            if after.contains(target) {
                run.cursor += 1;
                return Ok(());
            }
            let Some(top) = after.top() else {
                run.cursor += 1;
                return Ok(());
            };
            run.cursor += run.buf.replace_at(run.cursor, self.vocab.char_at(top)?)?;
            run.stats.substitutions += 1;
            window = window.shifted(top);
            run.cursor += 1;

            let Some(next) = run.buf.get(run.cursor).and_then(|c| self.vocab.index_of(c)) else {
                return Ok(());
            };
            let following = self.query(run, &window, run.cursor)?;
            if following.contains(next) {
                return Ok(());
            }
            target = next;
            guess = following.top();
        }

        // Attempts used up with the cursor on a character that still does not fit.
        run.stats.unchanged += 1;
        run.cursor += 1;
        Ok(())
    }

    fn window_at(&self, buf: &TextBuffer, pos: usize) -> Result<ContextWindow> {
        ContextWindow::build(self.vocab, &buf.preceding(pos, self.vocab.window_length()))
    }

    /// Acceptance threshold for `pos`; relaxed linearly while context is thin.
    fn threshold_at(&self, base: f32, pos: usize) -> f32 {
        let window = self.vocab.window_length();
        if pos < window {
            base * pos as f32 / window as f32
        } else {
            base
        }
    }

    /// One charged oracle call, reduced to the candidate set for `pos`.
    fn query(
        &self,
        run: &mut Run,
        window: &ContextWindow,
        pos: usize,
    ) -> std::result::Result<CandidateSet, Stop> {
        run.budget.charge().map_err(Stop::Halt)?;

        let prediction = self.oracle.predict(window).and_then(|dist| {
            if dist.len() == self.vocab.size() {
                Ok(dist)
            } else {
                Err(CleanupError::PredictionFailure(format!(
                    "distribution has {} entries, vocabulary has {}",
                    dist.len(),
                    self.vocab.size()
                )))
            }
        });

        match prediction {
            Ok(dist) => Ok(dist.candidates(self.threshold_at(run.threshold, pos))),
            Err(e) => match self.settings.oracle_failure {
                OracleFailurePolicy::Abort => Err(Stop::Failed(e)),
                OracleFailurePolicy::NoPrediction => {
                    run.stats.oracle_failures += 1;
                    Ok(CandidateSet::default())
                }
            },
        }
    }
}
