//! The patch engine seam.
//!
//! The history manager only needs two things from an engine: applying a patch
//! to a document and inverting a patch against the document it will be applied
//! to. [`JsonPatchEngine`] provides both through `patch-engine`.

use std::sync::Arc;

use patch_engine::{
  Patch,
  Result,
};
use serde_json::Value;

pub trait PatchEngine {
  /// Applies `patch` to `document`, returning the new document. `document`
  /// itself is not modified.
  fn apply(&self, document: &Value, patch: &Patch) -> Result<Value>;

  /// Computes the patch reverting `patch`, relative to `document` as it is
  /// before `patch` is applied.
  fn invert(&self, document: &Value, patch: &Patch) -> Result<Patch>;
}

/// Default engine backed by [`patch_engine::Patch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPatchEngine;

impl PatchEngine for JsonPatchEngine {
  fn apply(&self, document: &Value, patch: &Patch) -> Result<Value> {
    patch.apply_to(document)
  }

  fn invert(&self, document: &Value, patch: &Patch) -> Result<Patch> {
    patch.invert(document)
  }
}

impl<E: PatchEngine + ?Sized> PatchEngine for &E {
  fn apply(&self, document: &Value, patch: &Patch) -> Result<Value> {
    (**self).apply(document, patch)
  }

  fn invert(&self, document: &Value, patch: &Patch) -> Result<Patch> {
    (**self).invert(document, patch)
  }
}

impl<E: PatchEngine + ?Sized> PatchEngine for Arc<E> {
  fn apply(&self, document: &Value, patch: &Patch) -> Result<Value> {
    (**self).apply(document, patch)
  }

  fn invert(&self, document: &Value, patch: &Patch) -> Result<Patch> {
    (**self).invert(document, patch)
  }
}
