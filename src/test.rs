//! Shared [proptest](proptest) strategies.

use core::ops::Range;
use ndarray::{Array1, Array2, ArrayD};
use proptest::prelude::*;

/// A vector of `len` random bits.
pub(crate) fn bits(len: usize) -> impl Strategy<Value = ArrayD<u8>> {
  proptest::collection::vec(0 ..= 1u8, len).prop_map(|v| Array1::from(v).into_dyn())
}

/// A sequence of per-cycle bit vectors, all with the same number of lanes.
pub(crate) fn bit_history(
  lanes: Range<usize>,
  cycles: Range<usize>,
) -> impl Strategy<Value = Vec<ArrayD<u8>>> {
  (lanes, cycles).prop_flat_map(|(lanes, cycles)| proptest::collection::vec(bits(lanes), cycles))
}

/// A `rows × cols` matrix with entries in `range`.
pub(crate) fn matrix(rows: usize, cols: usize, range: Range<f64>) -> impl Strategy<Value = Array2<f64>> {
  proptest::collection::vec(range, rows * cols)
    .prop_map(move |v| Array2::from_shape_vec((rows, cols), v).unwrap())
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::strategy::ValueTree;
  use proptest::test_runner::TestRunner;

  #[test]
  fn history_lanes_are_uniform() {
    let mut runner = TestRunner::deterministic();
    for _ in 0 .. 32 {
      let history = bit_history(1 .. 6, 1 .. 10).new_tree(&mut runner).unwrap().current();
      assert!(!history.is_empty());
      assert!(history.iter().all(|h| h.len() == history[0].len()));
      assert!(history.iter().flatten().all(|&b| b <= 1));
    }
  }
}
