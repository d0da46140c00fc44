//! Undo/redo history for documents edited through JSON patches.
//!
//! The history is a JSON document in its own right, so every history operation
//! returns *patches* instead of mutating anything: one for the subject and one
//! for the history. Both go through the same patch engine, which means the
//! history can be stored or replicated exactly like the subject.
//!
//! ```ignore
//! use patch_history::{initialize_history, record, undo, JsonPatchEngine};
//!
//! let mut subject = json!({ "a": 1 });
//! let mut history = initialize_history();
//!
//! let result = record(&subject, &history, &patch)?;
//! (subject, history) = result.apply(&JsonPatchEngine, &subject, &history)?;
//!
//! let result = undo(&history);
//! (subject, history) = result.apply(&JsonPatchEngine, &subject, &history)?;
//! ```

pub mod config;
pub mod engine;
pub mod history;
pub mod manager;

pub use config::{
  EmptyPatches,
  HistoryConfig,
};
pub use engine::{
  JsonPatchEngine,
  PatchEngine,
};
pub use history::{
  History,
  HistoryError,
  PatchHistoryResult,
  Result,
  Stack,
};
pub use manager::HistoryManager;
pub use patch_engine::{
  Operation,
  Patch,
  PatchError,
  Pointer,
};
use serde_json::Value;

/// A history with empty stacks.
pub fn initialize_history() -> History {
  History::new()
}

/// Prepare recording `patch` against `subject` (its state before the patch).
/// See [`History::record`].
pub fn record(subject: &Value, history: &History, patch: &Patch) -> Result<PatchHistoryResult> {
  history.record(&JsonPatchEngine, subject, patch)
}

/// Prepare undoing the most recent patch. See [`History::undo`].
pub fn undo(history: &History) -> PatchHistoryResult {
  history.undo()
}

/// Prepare redoing the most recently undone patch. See [`History::redo`].
pub fn redo(subject: &Value, history: &History) -> Result<PatchHistoryResult> {
  history.redo(&JsonPatchEngine, subject)
}

pub fn undo_steps(history: &History, steps: usize) -> PatchHistoryResult {
  history.undo_steps(steps)
}

pub fn redo_steps(subject: &Value, history: &History, steps: usize) -> Result<PatchHistoryResult> {
  history.redo_steps(&JsonPatchEngine, subject, steps)
}
