use thiserror::Error;

pub type Result<T> = std::result::Result<T, PatchError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PatchError {
  #[error("invalid pointer {pointer:?}: {reason}")]
  InvalidPointer {
    pointer: String,
    reason:  &'static str,
  },
  #[error("path {path} does not exist")]
  PathNotFound { path: String },
  #[error("invalid array index {token:?} in {path}")]
  InvalidIndex { path: String, token: String },
  #[error("array index {index} in {path} is out of bounds for length {len}")]
  IndexOutOfBounds {
    path:  String,
    index: usize,
    len:   usize,
  },
  #[error("value at {path} is neither an object nor an array")]
  NotAContainer { path: String },
  #[error("the document root cannot be removed")]
  RemoveRoot,
  #[error("cannot move {from} into its own child {path}")]
  MoveIntoChild { from: String, path: String },
  #[error("test failed: value at {path} does not match")]
  TestFailed { path: String },
}
