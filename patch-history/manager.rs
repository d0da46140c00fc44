use patch_engine::Patch;
use serde_json::Value;

use crate::{
  config::{
    EmptyPatches,
    HistoryConfig,
  },
  engine::{
    JsonPatchEngine,
    PatchEngine,
  },
  history::{
    History,
    PatchHistoryResult,
    Result,
  },
};

/// Bundles a [`PatchEngine`] with a [`HistoryConfig`].
///
/// Holds no history state of its own; every call takes the current subject
/// and [`History`] and returns the patches to apply to them.
#[derive(Debug, Clone, Default)]
pub struct HistoryManager<E = JsonPatchEngine> {
  engine: E,
  config: HistoryConfig,
}

impl HistoryManager {
  pub fn new() -> Self {
    Self::default()
  }
}

impl<E: PatchEngine> HistoryManager<E> {
  pub fn with_engine(engine: E) -> Self {
    Self {
      engine,
      config: HistoryConfig::default(),
    }
  }

  pub fn with_config(mut self, config: HistoryConfig) -> Self {
    self.config = config;
    self
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }

  pub fn config(&self) -> &HistoryConfig {
    &self.config
  }

  pub fn initialize(&self) -> History {
    History::new()
  }

  pub fn record(
    &self,
    subject: &Value,
    history: &History,
    patch: &Patch,
  ) -> Result<PatchHistoryResult> {
    if patch.is_empty() && self.config.empty_patches == EmptyPatches::Skip {
      tracing::trace!("skipping empty patch");
      return Ok(PatchHistoryResult::default());
    }
    history.record(&self.engine, subject, patch)
  }

  pub fn undo(&self, history: &History) -> PatchHistoryResult {
    history.undo()
  }

  pub fn redo(&self, subject: &Value, history: &History) -> Result<PatchHistoryResult> {
    history.redo(&self.engine, subject)
  }

  pub fn undo_steps(&self, history: &History, steps: usize) -> PatchHistoryResult {
    history.undo_steps(self.config.clamp_steps(steps))
  }

  pub fn redo_steps(
    &self,
    subject: &Value,
    history: &History,
    steps: usize,
  ) -> Result<PatchHistoryResult> {
    history.redo_steps(&self.engine, subject, self.config.clamp_steps(steps))
  }

  /// Applies `result` to `subject` and `history` with this manager's engine.
  pub fn apply(
    &self,
    result: &PatchHistoryResult,
    subject: &Value,
    history: &History,
  ) -> Result<(Value, History)> {
    result.apply(&self.engine, subject, history)
  }
}
