//! Inverse computation.
//!
//! Every operation is inverted against the document state produced by the
//! operations before it. The inverse groups are emitted last-first so that the
//! resulting patch unwinds the original one step at a time.

use serde_json::Value;
use smallvec::{
  SmallVec,
  smallvec,
};

use crate::{
  error::{
    PatchError,
    Result,
  },
  patch::{
    Operation,
    Patch,
    resolve_insert,
  },
  pointer::Pointer,
};

type Reverted = SmallVec<[Operation; 2]>;

pub(crate) fn invert(patch: &Patch, original: &Value) -> Result<Patch> {
  if patch.is_empty() {
    return Ok(Patch::new());
  }

  let mut document = original.clone();
  let mut groups: Vec<Reverted> = Vec::with_capacity(patch.len());

  for operation in patch {
    let reverted = revert(&document, operation)?;
    tracing::trace!(
      op = operation.name(),
      path = %operation.path(),
      reverted = reverted.len(),
      "inverted patch operation"
    );
    operation.apply(&mut document)?;
    groups.push(reverted);
  }

  Ok(groups.into_iter().rev().flatten().collect())
}

fn revert(document: &Value, operation: &Operation) -> Result<Reverted> {
  let reverted = match operation {
    Operation::Add { path, .. } => revert_add(document, path)?,
    Operation::Copy { from, path } => {
      from.get(document)?;
      revert_add(document, path)?
    },
    Operation::Remove { path } => {
      if path.is_root() {
        return Err(PatchError::RemoveRoot);
      }
      smallvec![Operation::Add {
        path:  path.clone(),
        value: path.get(document)?.clone(),
      }]
    },
    Operation::Replace { path, .. } => {
      smallvec![Operation::Replace {
        path:  path.clone(),
        value: path.get(document)?.clone(),
      }]
    },
    Operation::Move { from, path } => revert_move(document, from, path)?,
    Operation::Test { .. } => SmallVec::new(),
  };
  Ok(reverted)
}

/// Existing value an insert at `target` would overwrite. Array inserts shift
/// elements instead of overwriting them.
fn overwritten<'a>(document: &'a Value, target: &Pointer) -> Result<Option<&'a Value>> {
  let Some((parent, last)) = target.split_last() else {
    return Ok(Some(document));
  };
  Ok(match parent.get(document)? {
    Value::Object(map) => map.get(last),
    _ => None,
  })
}

fn revert_add(document: &Value, path: &Pointer) -> Result<Reverted> {
  let target = resolve_insert(document, path)?;
  let reverted = match overwritten(document, &target)? {
    Some(previous) => {
      smallvec![Operation::Replace {
        value: previous.clone(),
        path:  target,
      }]
    },
    None => smallvec![Operation::Remove { path: target }],
  };
  Ok(reverted)
}

fn revert_move(document: &Value, from: &Pointer, path: &Pointer) -> Result<Reverted> {
  from.get(document)?;

  if from == path {
    return Ok(SmallVec::new());
  }

  // A descendant replacing its ancestor. Inside an array the ancestor is
  // shifted right rather than overwritten, so drop the inserted value first.
  if path.is_proper_prefix_of(from) {
    let original = path.get(document)?.clone();
    let inserted = match path.split_last() {
      Some((parent, _)) => matches!(parent.get(document)?, Value::Array(_)),
      None => false,
    };
    let mut reverted = Reverted::new();
    if inserted {
      reverted.push(Operation::Remove { path: path.clone() });
    }
    reverted.push(Operation::Replace {
      path:  path.clone(),
      value: original,
    });
    return Ok(reverted);
  }

  if from.is_proper_prefix_of(path) {
    return Err(PatchError::MoveIntoChild {
      from: from.to_string(),
      path: path.to_string(),
    });
  }

  // The destination is evaluated after the source was removed.
  let mut detached = document.clone();
  Operation::Remove { path: from.clone() }.apply(&mut detached)?;
  let target = resolve_insert(&detached, path)?;
  let previous = overwritten(&detached, &target)?.cloned();

  let mut reverted: Reverted = smallvec![Operation::Move {
    from: target.clone(),
    path: from.clone(),
  }];
  if let Some(value) = previous {
    // Runs after `from` is back in place.
    reverted.push(Operation::Add {
      path: reattached(document, from, &target)?,
      value,
    });
  }
  Ok(reverted)
}

/// Maps `pointer`, valid while `removed` is detached from `document`, onto
/// `document` itself. Only a removal from an array that `pointer` descends
/// through shifts anything.
fn reattached(document: &Value, removed: &Pointer, pointer: &Pointer) -> Result<Pointer> {
  let Some((parent, last)) = removed.split_last() else {
    return Ok(pointer.clone());
  };
  if !parent.is_proper_prefix_of(pointer) || !matches!(parent.get(document)?, Value::Array(_)) {
    return Ok(pointer.clone());
  }

  let removed_index = removed.parse_index(last)?;
  let depth = parent.len();
  match pointer.parse_index(&pointer.tokens()[depth]) {
    Ok(index) if index >= removed_index => {
      Ok(Pointer::from_tokens(pointer.tokens().iter().enumerate().map(
        |(i, token)| {
          if i == depth {
            (index + 1).to_string()
          } else {
            token.clone()
          }
        },
      )))
    },
    _ => Ok(pointer.clone()),
  }
}

#[cfg(test)]
mod test {
  use serde_json::json;

  use super::*;

  fn patch(value: Value) -> Patch {
    serde_json::from_value(value).unwrap()
  }

  fn assert_round_trip(doc: Value, p: Value) -> Patch {
    let p = patch(p);
    let revert = p.invert(&doc).unwrap();
    let after = p.apply_to(&doc).unwrap();
    assert_eq!(revert.apply_to(&after).unwrap(), doc);
    revert
  }

  #[test]
  fn replace() {
    let revert = assert_round_trip(
      json!({ "a": 1, "b": "hello" }),
      json!([{ "op": "replace", "path": "/a", "value": 2 }]),
    );
    assert_eq!(
      revert,
      patch(json!([{ "op": "replace", "path": "/a", "value": 1 }]))
    );
  }

  #[test]
  fn add_new_key_and_overwrite() {
    let revert = assert_round_trip(
      json!({ "a": 1 }),
      json!([
        { "op": "add", "path": "/b", "value": 2 },
        { "op": "add", "path": "/a", "value": 3 },
      ]),
    );
    assert_eq!(
      revert,
      patch(json!([
        { "op": "replace", "path": "/a", "value": 1 },
        { "op": "remove", "path": "/b" },
      ]))
    );
  }

  #[test]
  fn add_to_array_end_resolves_index() {
    let revert = assert_round_trip(
      json!({ "l": [1, 2] }),
      json!([{ "op": "add", "path": "/l/-", "value": 3 }]),
    );
    assert_eq!(revert, patch(json!([{ "op": "remove", "path": "/l/2" }])));
  }

  #[test]
  fn remove_array_element() {
    assert_round_trip(
      json!({ "l": [1, 2, 3] }),
      json!([
        { "op": "remove", "path": "/l/0" },
        { "op": "remove", "path": "/l/0" },
      ]),
    );
  }

  #[test]
  fn move_within_array() {
    assert_round_trip(
      json!(["x", "y", "z"]),
      json!([{ "op": "move", "from": "/0", "path": "/2" }]),
    );
    assert_round_trip(
      json!(["x", "y", "z"]),
      json!([{ "op": "move", "from": "/2", "path": "/-" }]),
    );
  }

  #[test]
  fn move_over_existing_key() {
    let revert = assert_round_trip(
      json!({ "a": 1, "b": 2 }),
      json!([{ "op": "move", "from": "/a", "path": "/b" }]),
    );
    assert_eq!(
      revert,
      patch(json!([
        { "op": "move", "from": "/b", "path": "/a" },
        { "op": "add", "path": "/b", "value": 2 },
      ]))
    );
  }

  #[test]
  fn move_child_over_parent() {
    assert_round_trip(
      json!({ "o": { "x": { "deep": true } } }),
      json!([{ "op": "move", "from": "/o/x", "path": "/o" }]),
    );
    assert_round_trip(
      json!({ "o": { "x": 1 } }),
      json!([{ "op": "move", "from": "/o/x", "path": "" }]),
    );
  }

  #[test]
  fn move_child_over_array_element() {
    let revert = assert_round_trip(
      json!({ "l": [{ "x": 2 }, 3] }),
      json!([{ "op": "move", "from": "/l/0/x", "path": "/l/0" }]),
    );
    assert_eq!(
      revert,
      patch(json!([
        { "op": "remove", "path": "/l/0" },
        { "op": "replace", "path": "/l/0", "value": { "x": 2 } },
      ]))
    );
  }

  #[test]
  fn move_over_key_behind_earlier_sibling() {
    let revert = assert_round_trip(
      json!({ "l": [7, { "x": 1 }, { "x": 9 }] }),
      json!([{ "op": "move", "from": "/l/0", "path": "/l/1/x" }]),
    );
    assert_eq!(
      revert,
      patch(json!([
        { "op": "move", "from": "/l/1/x", "path": "/l/0" },
        { "op": "add", "path": "/l/2/x", "value": 9 },
      ]))
    );

    // A later sibling does not shift the destination.
    assert_round_trip(
      json!({ "l": [{ "x": 1 }, 7] }),
      json!([{ "op": "move", "from": "/l/1", "path": "/l/0/x" }]),
    );
  }

  #[test]
  fn copy_and_test() {
    let revert = assert_round_trip(
      json!({ "a": [1], "b": {} }),
      json!([
        { "op": "test", "path": "/a/0", "value": 1 },
        { "op": "copy", "from": "/a", "path": "/b/c" },
        { "op": "copy", "from": "/a/0", "path": "/a/0" },
      ]),
    );
    assert_eq!(revert.len(), 2);
  }

  #[test]
  fn root_operations() {
    assert_round_trip(
      json!({ "a": 1 }),
      json!([{ "op": "replace", "path": "", "value": [1, 2] }]),
    );
    assert_round_trip(
      json!({ "a": 1 }),
      json!([{ "op": "add", "path": "", "value": null }]),
    );
  }

  #[test]
  fn empty_patch_inverts_to_empty() {
    assert!(Patch::new().invert(&json!(null)).unwrap().is_empty());
  }

  #[test]
  fn inapplicable_patch_fails() {
    let doc = json!({ "a": 1 });
    assert_eq!(
      patch(json!([{ "op": "replace", "path": "/missing", "value": 0 }])).invert(&doc),
      Err(PatchError::PathNotFound {
        path: "/missing".into(),
      })
    );
    assert_eq!(
      patch(json!([{ "op": "remove", "path": "" }])).invert(&doc),
      Err(PatchError::RemoveRoot)
    );
    assert!(matches!(
      patch(json!([{ "op": "test", "path": "/a", "value": 2 }])).invert(&doc),
      Err(PatchError::TestFailed { .. })
    ));
  }

  const PATHS: &[&str] = &[
    "", "/a", "/b", "/l", "/l/0", "/l/1", "/l/2", "/l/-", "/l/0/x", "/l/1/x", "/l/1/0", "/l/1/-",
    "/o", "/o/x", "/o/x/0",
  ];

  fn operation(kind: u8, a: u8, b: u8) -> Operation {
    let pick = |n: u8| Pointer::parse(PATHS[n as usize % PATHS.len()]).unwrap();
    let value = match b % 4 {
      0 => json!(b),
      1 => json!({ "x": b }),
      2 => json!([b, { "x": b }]),
      _ => json!(null),
    };
    match kind % 6 {
      0 => {
        Operation::Add {
          path: pick(a),
          value,
        }
      },
      1 => Operation::Remove { path: pick(a) },
      2 => {
        Operation::Replace {
          path: pick(a),
          value,
        }
      },
      3 => {
        Operation::Move {
          from: pick(a),
          path: pick(b),
        }
      },
      4 => {
        Operation::Copy {
          from: pick(a),
          path: pick(b),
        }
      },
      _ => {
        Operation::Test {
          path: pick(a),
          value,
        }
      },
    }
  }

  quickcheck::quickcheck! {
      fn inverse_restores_original(ops: Vec<(u8, u8, u8)>) -> bool {
          let doc = json!({
              "a": 1,
              "l": [{ "x": 2 }, [3, { "x": 4 }], 5],
              "o": { "x": [0] },
          });
          let patch: Patch = ops.into_iter().map(|(k, a, b)| operation(k, a, b)).collect();
          match (patch.apply_to(&doc), patch.invert(&doc)) {
              (Ok(after), Ok(revert)) => revert.apply_to(&after) == Ok(doc),
              (Err(_), Err(_)) => true,
              _ => false,
          }
      }
  }
}
