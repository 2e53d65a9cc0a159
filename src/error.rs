//! Error types.
//!
//! Every error is fatal to the component that raised it: these are programming or configuration
//! mistakes, not transient conditions. A cycle that fails has not mutated any state.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
  /// Unsupported option or combination of options, raised when the component is built.
  #[error("configuration error: {0}")]
  Config(String),

  /// An externally supplied tensor disagrees with the declared shape.
  #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
  ShapeMismatch {
    expected: Vec<usize>,
    actual: Vec<usize>,
  },

  /// A per-cycle precondition was violated (e.g. a MUX select out of range).
  #[error("precondition violated: {0}")]
  Precondition(String),

  /// Per-lane state cannot be broadcast to the shape of the incoming batch.
  #[error("cannot fit lane state of shape {state:?} to input of shape {input:?}")]
  BatchResize {
    state: Vec<usize>,
    input: Vec<usize>,
  },
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
  pub(crate) fn config(msg: impl Into<String>) -> Self {
    Self::Config(msg.into())
  }

  pub(crate) fn shape(expected: &[usize], actual: &[usize]) -> Self {
    Self::ShapeMismatch { expected: expected.to_vec(), actual: actual.to_vec() }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display() {
    assert_eq!(
      Error::shape(&[2, 3], &[3, 2]).to_string(),
      "shape mismatch: expected [2, 3], got [3, 2]",
    );
    assert_eq!(
      Error::config("bad depth").to_string(),
      "configuration error: bad depth",
    );
  }
}
