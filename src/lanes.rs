//! Per-lane state registers with one-time batch expansion.
//!
//! A component creates its counters, accumulators and shift registers at its native shape,
//! usually with a leading batch axis of size 1. The first time it sees a larger batch, the state
//! is broadcast to the incoming shape (every new lane starts as a copy of the lane it was
//! broadcast from), and from then on the shape is fixed. An incoming shape the state cannot be
//! broadcast to (a smaller batch, for instance) is an [`Error::BatchResize`].

use crate::{Error, Result};
use ndarray::{ArrayD, IxDyn};

#[derive(Clone, Debug)]
pub(crate) struct Lanes<T> {
  data: ArrayD<T>,
}

impl<T: Clone> Lanes<T> {
  pub(crate) fn new(data: ArrayD<T>) -> Self {
    Self { data }
  }

  /// A lane state of the given shape, with every element `value`.
  pub(crate) fn filled(shape: &[usize], value: T) -> Self {
    Self::new(ArrayD::from_elem(IxDyn(shape), value))
  }

  /// Checks that the state can serve an input of shape `shape`, without changing anything.
  pub(crate) fn check(&self, shape: &[usize]) -> Result<()> {
    if self.data.shape() == shape || self.data.broadcast(IxDyn(shape)).is_some() {
      Ok(())
    } else {
      Err(Error::BatchResize { state: self.data.shape().to_vec(), input: shape.to_vec() })
    }
  }

  /// Resize the state to `shape` if needed, and return it.
  pub(crate) fn fit(&mut self, shape: &[usize]) -> Result<&mut ArrayD<T>> {
    if self.data.shape() != shape {
      let grown = match self.data.broadcast(IxDyn(shape)) {
        Some(view) => view.to_owned(),
        None => return Err(Error::BatchResize {
          state: self.data.shape().to_vec(),
          input: shape.to_vec(),
        }),
      };
      log::debug!("expanding lane state from {:?} to {:?}", self.data.shape(), shape);
      self.data = grown;
    }
    Ok(&mut self.data)
  }

  pub(crate) fn get(&self) -> &ArrayD<T> {
    &self.data
  }
}
