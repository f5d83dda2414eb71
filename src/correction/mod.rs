//! Model-driven repair of OCR text.

pub mod budget;
pub mod buffer;
pub mod engine;
pub mod threshold;

pub use budget::{CancelToken, Halt, RetryBudget, RunBudget};
pub use buffer::TextBuffer;
pub use engine::{Completion, Correction, CorrectionStats, Corrector};
pub use threshold::parse_threshold;
