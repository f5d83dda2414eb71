//! Cost limits for a correction run.
//!
//! Every oracle call is charged against a `RunBudget`, which also carries the
//! cancellation flag and deadline. Repair strategies that retry draw from a
//! `RetryBudget`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared abort flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests abort of any run holding this token.
    pub fn request_abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Why a run stopped before the scan completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    CallBudgetExhausted,
    Cancelled,
    TimedOut,
}

impl std::fmt::Display for Halt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Halt::CallBudgetExhausted => write!(f, "oracle call budget exhausted"),
            Halt::Cancelled => write!(f, "cancelled"),
            Halt::TimedOut => write!(f, "timed out"),
        }
    }
}

#[derive(Debug)]
pub struct RunBudget {
    max_calls: Option<usize>,
    calls: usize,
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl RunBudget {
    pub fn new(
        max_calls: Option<usize>,
        timeout: Option<Duration>,
        cancel: Option<CancelToken>,
    ) -> Self {
        Self {
            max_calls,
            calls: 0,
            deadline: timeout.map(|t| Instant::now() + t),
            cancel,
        }
    }

    /// Charges one oracle call. Checked before the call is made.
    pub fn charge(&mut self) -> Result<(), Halt> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(Halt::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Halt::TimedOut);
        }
        if self.max_calls.is_some_and(|max| self.calls >= max) {
            return Err(Halt::CallBudgetExhausted);
        }
        self.calls += 1;
        Ok(())
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

/// Attempt counter for a single retrying strategy.
#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    remaining: usize,
}

impl RetryBudget {
    pub fn new(attempts: usize) -> Self {
        Self {
            remaining: attempts,
        }
    }

    /// Consumes one attempt; false once the budget is spent.
    pub fn try_take(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}
