//! JSON document patching.
//!
//! [`Patch`] applies RFC 6902 operations to `serde_json` documents and
//! computes their inverses against a given document state. Application never
//! mutates its input on failure.

pub mod error;
mod invert;
pub mod patch;
pub mod pointer;

pub use error::{
  PatchError,
  Result,
};
pub use patch::{
  Operation,
  Patch,
};
pub use pointer::Pointer;
