use patch_engine::{
  Operation,
  Patch,
  PatchError,
  Pointer,
};
use serde::{
  Deserialize,
  Serialize,
};
use serde_json::Value;
use thiserror::Error;

use crate::engine::PatchEngine;

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Errors that can occur during history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
  #[error("patch error: {0}")]
  Patch(#[from] PatchError),
  #[error("malformed history document: {0}")]
  Document(#[from] serde_json::Error),
  #[error("invalid history config: {0}")]
  Config(#[from] toml::de::Error),
  #[error("patchStack has {patches} entries but undoStack has {inverses}")]
  UnpairedStacks { patches: usize, inverses: usize },
}

/// One of the three stacks of a [`History`], addressed by its field name in
/// the history document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stack {
  Patch,
  Undo,
  Redo,
}

impl Stack {
  pub const fn field(self) -> &'static str {
    match self {
      Stack::Patch => "patchStack",
      Stack::Undo => "undoStack",
      Stack::Redo => "redoStack",
    }
  }

  /// Pointer to the whole stack, e.g. `/redoStack`.
  pub fn pointer(self) -> Pointer {
    Pointer::from_tokens([self.field()])
  }

  /// Pointer to the entry at `index`, e.g. `/undoStack/3`.
  pub fn at(self, index: usize) -> Pointer {
    self.pointer().join(index.to_string())
  }
}

/// Undo/redo log of a subject document.
///
/// The history is itself a JSON document with three arrays:
///
/// - `patchStack`: every recorded patch, oldest first.
/// - `undoStack`: `undoStack[i]` reverts `patchStack[i]`. It is computed when
///   the patch is recorded, against the subject as it was right before.
/// - `redoStack`: patches that were undone and can be reapplied.
///
/// A `History` is never changed in place by the operations below. [`record`],
/// [`undo`] and [`redo`] return a [`PatchHistoryResult`] holding one patch for
/// the subject and one for the history document; the caller applies both to
/// move forward. `patchStack` and `undoStack` always have the same length,
/// and every history patch addresses stack entries by explicit index computed
/// from the stack lengths of the `History` it was derived from.
///
/// [`record`]: History::record
/// [`undo`]: History::undo
/// [`redo`]: History::redo
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
  patch_stack: Vec<Patch>,
  undo_stack:  Vec<Patch>,
  redo_stack:  Vec<Patch>,
}

/// The two patches produced by a history operation.
///
/// An empty result means there was nothing to do (undo or redo on an empty
/// stack).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchHistoryResult {
  /// Patch moving the subject to its next state.
  pub subject_patches: Patch,
  /// Patch moving the history document to its next state.
  pub history_patches: Patch,
}

impl PatchHistoryResult {
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.subject_patches.is_empty() && self.history_patches.is_empty()
  }

  /// Chains `other` after `self`. Applying the composed result is equivalent
  /// to applying `self` and then `other`.
  pub fn compose(self, other: Self) -> Self {
    Self {
      subject_patches: self.subject_patches.concat(other.subject_patches),
      history_patches: self.history_patches.concat(other.history_patches),
    }
  }

  /// Applies both patches, returning the next subject and history. The
  /// inputs are left untouched.
  pub fn apply<E: PatchEngine + ?Sized>(
    &self,
    engine: &E,
    subject: &Value,
    history: &History,
  ) -> Result<(Value, History)> {
    let subject = engine.apply(subject, &self.subject_patches)?;
    let history = history.apply(engine, &self.history_patches)?;
    Ok((subject, history))
  }
}

impl History {
  /// A history with all three stacks empty.
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn patch_stack(&self) -> &[Patch] {
    &self.patch_stack
  }

  #[inline]
  pub fn undo_stack(&self) -> &[Patch] {
    &self.undo_stack
  }

  #[inline]
  pub fn redo_stack(&self) -> &[Patch] {
    &self.redo_stack
  }

  /// Number of recorded patches that can be undone.
  #[inline]
  pub fn depth(&self) -> usize {
    self.undo_stack.len()
  }

  /// Number of undone patches that can be redone.
  #[inline]
  pub fn redo_depth(&self) -> usize {
    self.redo_stack.len()
  }

  #[inline]
  pub fn can_undo(&self) -> bool {
    !self.undo_stack.is_empty()
  }

  #[inline]
  pub fn can_redo(&self) -> bool {
    !self.redo_stack.is_empty()
  }

  /// The JSON document the history patches address.
  pub fn to_value(&self) -> Result<Value> {
    Ok(serde_json::to_value(self)?)
  }

  /// Reads a history back from its JSON document form.
  ///
  /// # Errors
  /// Fails if the document does not have the three stacks or an entry is not
  /// a valid patch, and with [`HistoryError::UnpairedStacks`] if `patchStack`
  /// and `undoStack` differ in length.
  pub fn from_value(value: Value) -> Result<Self> {
    let history: Self = serde_json::from_value(value)?;
    if history.patch_stack.len() != history.undo_stack.len() {
      return Err(HistoryError::UnpairedStacks {
        patches:  history.patch_stack.len(),
        inverses: history.undo_stack.len(),
      });
    }
    Ok(history)
  }

  /// Applies a history patch produced by one of the operations below.
  pub fn apply<E: PatchEngine + ?Sized>(&self, engine: &E, patches: &Patch) -> Result<History> {
    if patches.is_empty() {
      return Ok(self.clone());
    }
    let value = engine.apply(&self.to_value()?, patches)?;
    Self::from_value(value)
  }

  /// Prepare recording `patch` as a new mutation of `subject`.
  ///
  /// `subject` must be the state before `patch` is applied; the inverse is
  /// computed against it. The returned history patch appends `patch` and its
  /// inverse and empties `redoStack`.
  ///
  /// # Errors
  /// Propagates the engine error if `patch` cannot be inverted against
  /// `subject`.
  pub fn record<E: PatchEngine + ?Sized>(
    &self,
    engine: &E,
    subject: &Value,
    patch: &Patch,
  ) -> Result<PatchHistoryResult> {
    let mut result = self.push_entry(
      engine,
      subject,
      patch,
      self.patch_stack.len(),
      self.undo_stack.len(),
    )?;
    result.history_patches.push(Operation::Replace {
      path:  Stack::Redo.pointer(),
      value: Value::Array(Vec::new()),
    });

    tracing::debug!(
      operations = patch.len(),
      depth = self.depth() + 1,
      "recorded patch"
    );
    Ok(result)
  }

  /// Prepare an undo of the most recent patch.
  ///
  /// Returns an empty result if there is nothing to undo. The subject patch is
  /// the stored inverse; the history patch pops `patchStack` and `undoStack`
  /// and pushes the popped patch onto `redoStack`.
  pub fn undo(&self) -> PatchHistoryResult {
    if !self.can_undo() {
      tracing::trace!("nothing to undo");
      return PatchHistoryResult::default();
    }

    let result = self.pop_entry(
      self.patch_stack.len() - 1,
      self.undo_stack.len() - 1,
      self.redo_stack.len(),
    );
    tracing::debug!(depth = self.depth() - 1, "undo");
    result
  }

  /// Prepare a redo of the most recently undone patch.
  ///
  /// Returns an empty result if there is nothing to redo. The top of
  /// `redoStack` is recorded again against `subject` exactly like a fresh
  /// [`History::record`], except that only that entry is removed from
  /// `redoStack`; entries below it are kept.
  ///
  /// # Errors
  /// Propagates the engine error if the patch cannot be inverted against
  /// `subject`.
  pub fn redo<E: PatchEngine + ?Sized>(
    &self,
    engine: &E,
    subject: &Value,
  ) -> Result<PatchHistoryResult> {
    let Some(patch) = self.redo_stack.last() else {
      tracing::trace!("nothing to redo");
      return Ok(PatchHistoryResult::default());
    };

    let mut result = self.push_entry(
      engine,
      subject,
      patch,
      self.patch_stack.len(),
      self.undo_stack.len(),
    )?;
    result.history_patches.push(Operation::Remove {
      path: Stack::Redo.at(self.redo_stack.len() - 1),
    });

    tracing::debug!(redo_depth = self.redo_depth() - 1, "redo");
    Ok(result)
  }

  /// Prepare up to `steps` consecutive undos as a single result.
  ///
  /// The step count is clamped to [`History::depth`]. Applying the returned
  /// patches is equivalent to applying each single [`History::undo`] result in
  /// turn.
  pub fn undo_steps(&self, steps: usize) -> PatchHistoryResult {
    let steps = steps.min(self.depth());
    let (patches, inverses, redos) = (
      self.patch_stack.len(),
      self.undo_stack.len(),
      self.redo_stack.len(),
    );

    let result = (0..steps).fold(PatchHistoryResult::default(), |acc, step| {
      acc.compose(self.pop_entry(patches - 1 - step, inverses - 1 - step, redos + step))
    });
    if steps > 0 {
      tracing::debug!(steps, depth = self.depth() - steps, "undo steps");
    }
    result
  }

  /// Prepare up to `steps` consecutive redos as a single result.
  ///
  /// The step count is clamped to [`History::redo_depth`]. Each inverse is
  /// computed against the subject state left by the previous step; the engine
  /// advances a scratch copy of `subject` to get there.
  ///
  /// # Errors
  /// Propagates the first engine error; nothing is returned in that case.
  pub fn redo_steps<E: PatchEngine + ?Sized>(
    &self,
    engine: &E,
    subject: &Value,
    steps: usize,
  ) -> Result<PatchHistoryResult> {
    let steps = steps.min(self.redo_depth());
    let (patches, inverses, redos) = (
      self.patch_stack.len(),
      self.undo_stack.len(),
      self.redo_stack.len(),
    );

    let mut result = PatchHistoryResult::default();
    let mut scratch: Option<Value> = None;
    for step in 0..steps {
      let current = scratch.as_ref().unwrap_or(subject);
      let patch = &self.redo_stack[redos - 1 - step];

      let mut next = self.push_entry(engine, current, patch, patches + step, inverses + step)?;
      next.history_patches.push(Operation::Remove {
        path: Stack::Redo.at(redos - 1 - step),
      });

      if step + 1 < steps {
        scratch = Some(engine.apply(current, patch)?);
      }
      result = result.compose(next);
    }

    if steps > 0 {
      tracing::debug!(steps, redo_depth = redos - steps, "redo steps");
    }
    Ok(result)
  }

  /// Appends `patch` and its inverse at the given stack positions. Shared by
  /// record and redo; neither touches `redoStack` here.
  fn push_entry<E: PatchEngine + ?Sized>(
    &self,
    engine: &E,
    subject: &Value,
    patch: &Patch,
    patch_index: usize,
    undo_index: usize,
  ) -> Result<PatchHistoryResult> {
    let inverse = engine.invert(subject, patch)?;

    let history_patches = Patch::from(vec![
      Operation::Add {
        path:  Stack::Patch.at(patch_index),
        value: patch.to_value(),
      },
      Operation::Add {
        path:  Stack::Undo.at(undo_index),
        value: inverse.to_value(),
      },
    ]);

    Ok(PatchHistoryResult {
      subject_patches: patch.clone(),
      history_patches,
    })
  }

  /// Pops the entries at `patch_index`/`undo_index` and pushes the popped
  /// patch at `redo_index`. The entry is read from this snapshot, so
  /// `patch_index` must refer to an existing position here.
  fn pop_entry(
    &self,
    patch_index: usize,
    undo_index: usize,
    redo_index: usize,
  ) -> PatchHistoryResult {
    let history_patches = Patch::from(vec![
      Operation::Remove {
        path: Stack::Patch.at(patch_index),
      },
      Operation::Remove {
        path: Stack::Undo.at(undo_index),
      },
      Operation::Add {
        path:  Stack::Redo.at(redo_index),
        value: self.patch_stack[patch_index].to_value(),
      },
    ]);

    PatchHistoryResult {
      subject_patches: self.undo_stack[undo_index].clone(),
      history_patches,
    }
  }
}
