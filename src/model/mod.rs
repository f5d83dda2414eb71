//! Character model: vocabulary, context windows and the prediction oracle.

pub mod oracle;
pub mod table;
pub mod vocabulary;
pub mod window;

pub use oracle::{CandidateSet, Distribution, Oracle};
pub use table::SuffixTableOracle;
pub use vocabulary::{Vocabulary, PAD_CHAR};
pub use window::{ContextWindow, Slot};
