//! Patch operations (RFC 6902) and their application.
//!
//! A [`Patch`] is an ordered list of [`Operation`]s applied atomically: if any
//! operation fails the document is left untouched.
//!
//! ```ignore
//! use patch_engine::{Operation, Patch, Pointer};
//! use serde_json::json;
//!
//! let doc = json!({ "a": 1 });
//! let patch = Patch::from(vec![Operation::Replace {
//!   path:  "/a".parse()?,
//!   value: json!(2),
//! }]);
//!
//! let undo = patch.invert(&doc)?;
//! let next = patch.apply_to(&doc)?;
//! assert_eq!(undo.apply_to(&next)?, doc);
//! ```

use serde::{
  Deserialize,
  Serialize,
  Serializer,
};
use serde_json::{
  Map,
  Value,
};

use crate::{
  error::{
    PatchError,
    Result,
  },
  invert,
  pointer::{
    END_OF_ARRAY,
    Pointer,
  },
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
  Add { path: Pointer, value: Value },
  Remove { path: Pointer },
  Replace { path: Pointer, value: Value },
  Move { from: Pointer, path: Pointer },
  Copy { from: Pointer, path: Pointer },
  Test { path: Pointer, value: Value },
}

impl Operation {
  /// The `op` name used on the wire.
  pub fn name(&self) -> &'static str {
    match self {
      Operation::Add { .. } => "add",
      Operation::Remove { .. } => "remove",
      Operation::Replace { .. } => "replace",
      Operation::Move { .. } => "move",
      Operation::Copy { .. } => "copy",
      Operation::Test { .. } => "test",
    }
  }

  /// The target location of this operation.
  pub fn path(&self) -> &Pointer {
    match self {
      Operation::Add { path, .. }
      | Operation::Remove { path }
      | Operation::Replace { path, .. }
      | Operation::Move { path, .. }
      | Operation::Copy { path, .. }
      | Operation::Test { path, .. } => path,
    }
  }

  /// The JSON form of this operation. [`Serialize`] goes through this too, so
  /// both always agree.
  pub fn to_value(&self) -> Value {
    let mut map = Map::with_capacity(3);
    map.insert("op".into(), Value::from(self.name()));
    match self {
      Operation::Add { path, value }
      | Operation::Replace { path, value }
      | Operation::Test { path, value } => {
        map.insert("path".into(), Value::from(path.to_string()));
        map.insert("value".into(), value.clone());
      },
      Operation::Remove { path } => {
        map.insert("path".into(), Value::from(path.to_string()));
      },
      Operation::Move { from, path } | Operation::Copy { from, path } => {
        map.insert("from".into(), Value::from(from.to_string()));
        map.insert("path".into(), Value::from(path.to_string()));
      },
    }
    Value::Object(map)
  }

  /// Apply this operation in place. On error `document` may be partially
  /// modified; [`Patch::apply`] guards against that.
  pub(crate) fn apply(&self, document: &mut Value) -> Result<()> {
    match self {
      Operation::Add { path, value } => add(document, path, value.clone()),
      Operation::Remove { path } => remove(document, path).map(drop),
      Operation::Replace { path, value } => {
        *path.get_mut(document)? = value.clone();
        Ok(())
      },
      Operation::Move { from, path } => {
        if from == path {
          return from.get(document).map(drop);
        }
        if from.is_proper_prefix_of(path) {
          return Err(PatchError::MoveIntoChild {
            from: from.to_string(),
            path: path.to_string(),
          });
        }
        let value = remove(document, from)?;
        add(document, path, value)
      },
      Operation::Copy { from, path } => {
        let value = from.get(document)?.clone();
        add(document, path, value)
      },
      Operation::Test { path, value } => {
        if path.get(document)? == value {
          Ok(())
        } else {
          Err(PatchError::TestFailed {
            path: path.to_string(),
          })
        }
      },
    }
  }
}

impl Serialize for Operation {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    self.to_value().serialize(serializer)
  }
}

/// Resolves the position an `add` at `path` writes to. A trailing `-` is
/// replaced by the concrete array index.
pub(crate) fn resolve_insert(document: &Value, path: &Pointer) -> Result<Pointer> {
  let Some((parent, last)) = path.split_last() else {
    return Ok(Pointer::root());
  };
  match parent.get(document)? {
    Value::Array(items) if last == END_OF_ARRAY => Ok(parent.join(items.len().to_string())),
    Value::Array(items) => {
      let index = path.parse_index(last)?;
      if index > items.len() {
        return Err(PatchError::IndexOutOfBounds {
          path: path.to_string(),
          index,
          len: items.len(),
        });
      }
      Ok(path.clone())
    },
    Value::Object(_) => Ok(path.clone()),
    _ => {
      Err(PatchError::NotAContainer {
        path: parent.to_string(),
      })
    },
  }
}

fn add(document: &mut Value, path: &Pointer, value: Value) -> Result<()> {
  let Some((parent, last)) = path.split_last() else {
    *document = value;
    return Ok(());
  };

  match parent.get_mut(document)? {
    Value::Object(map) => {
      map.insert(last.to_owned(), value);
      Ok(())
    },
    Value::Array(items) => {
      let index = if last == END_OF_ARRAY {
        items.len()
      } else {
        path.parse_index(last)?
      };
      if index > items.len() {
        return Err(PatchError::IndexOutOfBounds {
          path: path.to_string(),
          index,
          len: items.len(),
        });
      }
      items.insert(index, value);
      Ok(())
    },
    _ => {
      Err(PatchError::NotAContainer {
        path: parent.to_string(),
      })
    },
  }
}

fn remove(document: &mut Value, path: &Pointer) -> Result<Value> {
  let Some((parent, last)) = path.split_last() else {
    return Err(PatchError::RemoveRoot);
  };

  match parent.get_mut(document)? {
    Value::Object(map) => map.remove(last).ok_or_else(|| path.not_found()),
    Value::Array(items) => {
      let index = path.parse_index(last)?;
      if index >= items.len() {
        return Err(PatchError::IndexOutOfBounds {
          path: path.to_string(),
          index,
          len: items.len(),
        });
      }
      Ok(items.remove(index))
    },
    _ => {
      Err(PatchError::NotAContainer {
        path: parent.to_string(),
      })
    },
  }
}

/// An ordered, atomically applied list of operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
  operations: Vec<Operation>,
}

impl Patch {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      operations: Vec::with_capacity(capacity),
    }
  }

  #[inline]
  pub fn operations(&self) -> &[Operation] {
    &self.operations
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.operations.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.operations.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
    self.operations.iter()
  }

  pub fn push(&mut self, operation: Operation) {
    self.operations.push(operation);
  }

  /// Appends the operations of `other` after this patch's operations.
  pub fn concat(mut self, other: Patch) -> Self {
    self.operations.extend(other.operations);
    self
  }

  pub fn into_operations(self) -> Vec<Operation> {
    self.operations
  }

  /// JSON array form of this patch, as stored inside other documents.
  pub fn to_value(&self) -> Value {
    Value::Array(self.operations.iter().map(Operation::to_value).collect())
  }

  /// Apply this patch in place. The document is only replaced once every
  /// operation succeeded.
  pub fn apply(&self, document: &mut Value) -> Result<()> {
    *document = self.apply_to(document)?;
    Ok(())
  }

  /// Apply this patch and return the updated document.
  pub fn apply_to(&self, document: &Value) -> Result<Value> {
    let mut next = document.clone();
    for operation in &self.operations {
      operation.apply(&mut next)?;
    }
    Ok(next)
  }

  /// Returns a patch that reverts this one. `original` must be the document
  /// before this patch is applied.
  pub fn invert(&self, original: &Value) -> Result<Patch> {
    invert::invert(self, original)
  }
}

impl From<Vec<Operation>> for Patch {
  fn from(operations: Vec<Operation>) -> Self {
    Self { operations }
  }
}

impl From<Operation> for Patch {
  fn from(operation: Operation) -> Self {
    Self {
      operations: vec![operation],
    }
  }
}

impl FromIterator<Operation> for Patch {
  fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
    Self {
      operations: iter.into_iter().collect(),
    }
  }
}

impl Extend<Operation> for Patch {
  fn extend<I: IntoIterator<Item = Operation>>(&mut self, iter: I) {
    self.operations.extend(iter);
  }
}

impl IntoIterator for Patch {
  type IntoIter = std::vec::IntoIter<Operation>;
  type Item = Operation;

  fn into_iter(self) -> Self::IntoIter {
    self.operations.into_iter()
  }
}

impl<'a> IntoIterator for &'a Patch {
  type IntoIter = std::slice::Iter<'a, Operation>;
  type Item = &'a Operation;

  fn into_iter(self) -> Self::IntoIter {
    self.operations.iter()
  }
}

#[cfg(test)]
mod test {
  use serde_json::json;

  use super::*;

  fn ptr(s: &str) -> Pointer {
    s.parse().unwrap()
  }

  fn patch(value: Value) -> Patch {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn wire_format() {
    let p = patch(json!([
      { "op": "add", "path": "/a", "value": 1 },
      { "op": "remove", "path": "/b" },
      { "op": "move", "from": "/c", "path": "/d" },
    ]));
    assert_eq!(p.operations()[0], Operation::Add {
      path:  ptr("/a"),
      value: json!(1),
    });
    assert_eq!(p.operations()[2], Operation::Move {
      from: ptr("/c"),
      path: ptr("/d"),
    });

    let round_trip: Patch = serde_json::from_str(&serde_json::to_string(&p).unwrap()).unwrap();
    assert_eq!(round_trip, p);
    assert!(serde_json::from_value::<Patch>(json!([{ "op": "frobnicate", "path": "" }])).is_err());
  }

  #[test]
  fn add_object_and_array() {
    let doc = json!({ "a": [1, 3] });
    let p = patch(json!([
      { "op": "add", "path": "/a/1", "value": 2 },
      { "op": "add", "path": "/a/-", "value": 4 },
      { "op": "add", "path": "/b", "value": "x" },
    ]));
    assert_eq!(p.apply_to(&doc).unwrap(), json!({ "a": [1, 2, 3, 4], "b": "x" }));

    let past_end = patch(json!([{ "op": "add", "path": "/a/5", "value": 0 }]));
    assert!(matches!(
      past_end.apply_to(&doc),
      Err(PatchError::IndexOutOfBounds { index: 5, .. })
    ));
  }

  #[test]
  fn add_root_replaces_document() {
    let p = patch(json!([{ "op": "add", "path": "", "value": [1] }]));
    assert_eq!(p.apply_to(&json!({ "a": 1 })).unwrap(), json!([1]));
  }

  #[test]
  fn remove_and_replace() {
    let doc = json!({ "a": 1, "b": [1, 2, 3] });
    let p = patch(json!([
      { "op": "remove", "path": "/a" },
      { "op": "remove", "path": "/b/0" },
      { "op": "replace", "path": "/b/1", "value": 9 },
    ]));
    assert_eq!(p.apply_to(&doc).unwrap(), json!({ "b": [2, 9] }));

    let missing = patch(json!([{ "op": "replace", "path": "/zzz", "value": 0 }]));
    assert_eq!(
      missing.apply_to(&doc),
      Err(PatchError::PathNotFound {
        path: "/zzz".into(),
      })
    );

    let root = patch(json!([{ "op": "remove", "path": "" }]));
    assert_eq!(root.apply_to(&doc), Err(PatchError::RemoveRoot));
  }

  #[test]
  fn move_and_copy() {
    let doc = json!({ "a": { "x": 1 }, "b": [1, 2] });
    let p = patch(json!([
      { "op": "copy", "from": "/a", "path": "/c" },
      { "op": "move", "from": "/b/0", "path": "/b/-" },
      { "op": "move", "from": "/a/x", "path": "/y" },
    ]));
    assert_eq!(
      p.apply_to(&doc).unwrap(),
      json!({ "a": {}, "b": [2, 1], "c": { "x": 1 }, "y": 1 })
    );

    let into_child = patch(json!([{ "op": "move", "from": "/a", "path": "/a/x" }]));
    assert!(matches!(
      into_child.apply_to(&doc),
      Err(PatchError::MoveIntoChild { .. })
    ));
  }

  #[test]
  fn failed_patch_leaves_document_untouched() {
    let mut doc = json!({ "a": 1 });
    let p = patch(json!([
      { "op": "replace", "path": "/a", "value": 2 },
      { "op": "test", "path": "/a", "value": 3 },
    ]));
    assert_eq!(
      p.apply(&mut doc),
      Err(PatchError::TestFailed { path: "/a".into() })
    );
    assert_eq!(doc, json!({ "a": 1 }));
  }

  #[test]
  fn resolves_end_of_array() {
    let doc = json!({ "a": [0, 1] });
    assert_eq!(resolve_insert(&doc, &ptr("/a/-")).unwrap(), ptr("/a/2"));
    assert_eq!(resolve_insert(&doc, &ptr("/a/1")).unwrap(), ptr("/a/1"));
    assert_eq!(resolve_insert(&doc, &ptr("/b")).unwrap(), ptr("/b"));
    assert!(resolve_insert(&doc, &ptr("/a/3")).is_err());
  }
}
