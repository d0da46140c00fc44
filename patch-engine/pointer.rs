//! JSON Pointers (RFC 6901).
//!
//! A [`Pointer`] is a parsed sequence of reference tokens. The empty pointer
//! addresses the whole document. Tokens are kept unescaped; `~0`/`~1` only
//! appear in the string form.
//!
//! ```ignore
//! let ptr: Pointer = "/a~1b/0".parse()?;
//! assert_eq!(ptr.tokens(), ["a/b", "0"]);
//! assert_eq!(ptr.to_string(), "/a~1b/0");
//! ```

use std::{
  fmt,
  str::FromStr,
};

use serde::{
  Deserialize,
  Serialize,
};
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::{
  PatchError,
  Result,
};

/// Array token addressing the slot one past the last element.
pub const END_OF_ARRAY: &str = "-";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pointer {
  tokens: SmallVec<[String; 4]>,
}

impl Pointer {
  /// The pointer to the whole document.
  pub fn root() -> Self {
    Self::default()
  }

  pub fn from_tokens<I, T>(tokens: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    Self {
      tokens: tokens.into_iter().map(Into::into).collect(),
    }
  }

  pub fn parse(input: &str) -> Result<Self> {
    if input.is_empty() {
      return Ok(Self::root());
    }

    let Some(rest) = input.strip_prefix('/') else {
      return Err(PatchError::InvalidPointer {
        pointer: input.to_owned(),
        reason:  "must be empty or start with '/'",
      });
    };

    let tokens = rest
      .split('/')
      .map(|token| unescape(input, token))
      .collect::<Result<SmallVec<_>>>()?;

    Ok(Self { tokens })
  }

  #[inline]
  pub fn is_root(&self) -> bool {
    self.tokens.is_empty()
  }

  #[inline]
  pub fn tokens(&self) -> &[String] {
    &self.tokens
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  pub fn last(&self) -> Option<&str> {
    self.tokens.last().map(String::as_str)
  }

  /// Splits off the final token, returning the parent pointer alongside it.
  /// Returns `None` for the root.
  pub fn split_last(&self) -> Option<(Pointer, &str)> {
    let (last, parent) = self.tokens.split_last()?;
    Some((Pointer::from_tokens(parent.iter().cloned()), last.as_str()))
  }

  pub fn push(&mut self, token: impl Into<String>) {
    self.tokens.push(token.into());
  }

  pub fn join(mut self, token: impl Into<String>) -> Self {
    self.push(token);
    self
  }

  pub fn starts_with(&self, prefix: &Pointer) -> bool {
    self.tokens.starts_with(&prefix.tokens)
  }

  /// True when `self` addresses a strict ancestor of `other`.
  pub fn is_proper_prefix_of(&self, other: &Pointer) -> bool {
    other.len() > self.len() && other.starts_with(self)
  }

  fn prefix(&self, depth: usize) -> Pointer {
    Pointer::from_tokens(self.tokens[..depth].iter().cloned())
  }

  /// Parses an array index token. Leading zeros and the `-` token are
  /// rejected here; callers that accept `-` check for it first.
  pub(crate) fn parse_index(&self, token: &str) -> Result<usize> {
    let canonical = !token.is_empty()
      && token.bytes().all(|b| b.is_ascii_digit())
      && (token == "0" || !token.starts_with('0'));

    canonical
      .then(|| token.parse::<usize>().ok())
      .flatten()
      .ok_or_else(|| PatchError::InvalidIndex {
        path:  self.to_string(),
        token: token.to_owned(),
      })
  }

  pub(crate) fn not_found(&self) -> PatchError {
    PatchError::PathNotFound {
      path: self.to_string(),
    }
  }

  /// Looks up the value this pointer addresses.
  pub fn get<'a>(&self, document: &'a Value) -> Result<&'a Value> {
    let mut current = document;
    for (depth, token) in self.tokens.iter().enumerate() {
      current = match current {
        Value::Object(map) => map.get(token.as_str()).ok_or_else(|| self.not_found())?,
        Value::Array(items) => {
          let index = self.parse_index(token)?;
          items.get(index).ok_or_else(|| PatchError::IndexOutOfBounds {
            path: self.to_string(),
            index,
            len: items.len(),
          })?
        },
        _ => {
          return Err(PatchError::NotAContainer {
            path: self.prefix(depth).to_string(),
          });
        },
      };
    }
    Ok(current)
  }

  /// Mutable counterpart of [`Pointer::get`].
  pub fn get_mut<'a>(&self, document: &'a mut Value) -> Result<&'a mut Value> {
    let mut current = document;
    for (depth, token) in self.tokens.iter().enumerate() {
      current = match current {
        Value::Object(map) => map
          .get_mut(token.as_str())
          .ok_or_else(|| self.not_found())?,
        Value::Array(items) => {
          let index = self.parse_index(token)?;
          let len = items.len();
          items
            .get_mut(index)
            .ok_or_else(|| PatchError::IndexOutOfBounds {
              path: self.to_string(),
              index,
              len,
            })?
        },
        _ => {
          return Err(PatchError::NotAContainer {
            path: self.prefix(depth).to_string(),
          });
        },
      };
    }
    Ok(current)
  }
}

fn unescape(pointer: &str, token: &str) -> Result<String> {
  if !token.contains('~') {
    return Ok(token.to_owned());
  }

  let mut out = String::with_capacity(token.len());
  let mut chars = token.chars();
  while let Some(c) = chars.next() {
    if c != '~' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some('0') => out.push('~'),
      Some('1') => out.push('/'),
      _ => {
        return Err(PatchError::InvalidPointer {
          pointer: pointer.to_owned(),
          reason:  "'~' must be followed by '0' or '1'",
        });
      },
    }
  }
  Ok(out)
}

impl fmt::Display for Pointer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    use fmt::Write;

    for token in &self.tokens {
      f.write_char('/')?;
      for c in token.chars() {
        match c {
          '~' => f.write_str("~0")?,
          '/' => f.write_str("~1")?,
          c => f.write_char(c)?,
        }
      }
    }
    Ok(())
  }
}

impl FromStr for Pointer {
  type Err = PatchError;

  fn from_str(s: &str) -> Result<Self> {
    Self::parse(s)
  }
}

impl TryFrom<String> for Pointer {
  type Error = PatchError;

  fn try_from(value: String) -> Result<Self> {
    Self::parse(&value)
  }
}

impl From<Pointer> for String {
  fn from(pointer: Pointer) -> Self {
    pointer.to_string()
  }
}
