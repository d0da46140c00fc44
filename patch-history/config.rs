use serde::{
  Deserialize,
  Serialize,
};

use crate::history::Result;

/// What recording an empty patch does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyPatches {
  /// Record it like any other patch. Undoing it is a no-op on the subject.
  #[default]
  Record,
  /// Return an empty result; the history is left as is.
  Skip,
}

/// History manager settings.
///
/// ```toml
/// empty-patches = "skip"
/// max-steps = 50
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct HistoryConfig {
  pub empty_patches: EmptyPatches,
  /// Upper bound for multi-step undo/redo requests. Unbounded when unset.
  pub max_steps:     Option<usize>,
}

impl HistoryConfig {
  pub fn from_toml(contents: &str) -> Result<Self> {
    Ok(toml::from_str(contents)?)
  }

  pub fn clamp_steps(&self, steps: usize) -> usize {
    self.max_steps.map_or(steps, |max| steps.min(max))
  }
}
