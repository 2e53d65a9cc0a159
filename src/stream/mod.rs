//! Bitstream generation: turning a static magnitude into the bit emitted at a given cycle.
//!
//! A magnitude `v` is first mapped to an integer *level* `l ∈ [0, P]` (see [`source_level`]);
//! then, at each cycle, a lane emits `1` iff `seq[counter mod P] < l`. Over one period, a lane
//! whose counter visits every position once emits exactly `l` ones, since the sequence is a
//! permutation of `0 .. P`.

use crate::{Error, Mode, Result, Sequence};
use ndarray::{ArrayD, IxDyn, Zip};

/// Map a magnitude to its level in `0 ..= 2^bitwidth`, rounding ties to even.
///
///   - Unipolar: `v · 2^bitwidth`.
///   - Bipolar: `(v + 1) / 2 · 2^bitwidth`.
///
/// Values outside the representable range saturate.
///
/// # Example
///
/// ```
/// # use unary_arith::{source_level, Mode};
/// assert_eq!(source_level(0.25, Mode::Unipolar, 4), 4.);
/// assert_eq!(source_level(0., Mode::Bipolar, 4), 8.);
/// assert_eq!(source_level(-3., Mode::Bipolar, 4), 0.);
/// ```
pub fn source_level(value: f64, mode: Mode, bitwidth: u32) -> f64 {
  let period = (1u64 << bitwidth) as f64;
  let prob = match mode {
    Mode::Unipolar => value,
    Mode::Bipolar => (value + 1.) / 2.,
  };
  (prob * period).round_ties_even().clamp(0., period)
}

/// A bank of bitstream generators, one per element of a static magnitude tensor, all sharing one
/// index [`Sequence`].
///
/// The generator itself is stateless; callers own the per-lane counters and decide when they
/// advance.
#[derive(Clone, Debug)]
pub struct BitstreamGenerator {
  levels: ArrayD<f64>,
  sequence: Sequence,
}

impl BitstreamGenerator {
  /// Generators for every element of `magnitude`, in `mode`, with the width of `sequence`.
  pub fn new(magnitude: &ArrayD<f64>, mode: Mode, sequence: Sequence) -> Self {
    let bitwidth = sequence.bitwidth();
    let levels = magnitude.mapv(|v| source_level(v, mode, bitwidth));
    Self { levels, sequence }
  }

  /// Generators for already-quantised levels (each in `0 ..= 2^bitwidth`).
  pub fn from_levels(levels: ArrayD<f64>, sequence: Sequence) -> Self {
    Self { levels, sequence }
  }

  pub fn levels(&self) -> &ArrayD<f64> {
    &self.levels
  }

  pub fn sequence(&self) -> &Sequence {
    &self.sequence
  }

  pub fn shape(&self) -> &[usize] {
    self.levels.shape()
  }

  /// The bit of every lane at the sequence positions given by `counters`.
  ///
  /// `counters` may have extra leading (batch) axes, or size-1 axes, relative to the magnitude:
  /// the levels are broadcast against it, and the result has the broadcast shape.
  ///
  /// # Example
  ///
  /// ```
  /// # use unary_arith::*;
  /// # use ndarray::{array, ArrayD};
  /// let seq = Sequence::new(SequenceKind::Race, 2, 1).unwrap();  // 0, 1, 2, 3
  /// let bsg = BitstreamGenerator::new(&array![0.5, 1.0].into_dyn(), Mode::Unipolar, seq);
  /// let counters = array![[0, 0], [2, 3]].into_dyn();
  /// assert_eq!(bsg.generate(&counters).unwrap(), array![[1, 1], [0, 1]].into_dyn());
  /// ```
  pub fn generate(&self, counters: &ArrayD<usize>) -> Result<ArrayD<u8>> {
    let shape = broadcast_shape(self.levels.shape(), counters.shape())
      .ok_or_else(|| Error::shape(self.levels.shape(), counters.shape()))?;
    // Both broadcasts are infallible now that `shape` is known to be compatible.
    let (Some(levels), Some(counters)) = (
      self.levels.broadcast(IxDyn(&shape)),
      counters.broadcast(IxDyn(&shape)),
    ) else {
      return Err(Error::shape(self.levels.shape(), &shape))
    };
    Ok(Zip::from(counters).and(levels).map_collect(|&c, &l| {
      u8::from((self.sequence.get(c) as f64) < l)
    }))
  }
}

/// The numpy-style broadcast of two shapes, or `None` if they are incompatible.
pub(crate) fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
  let n = a.len().max(b.len());
  let dim = |s: &[usize], i: usize| if i + s.len() < n { 1 } else { s[i + s.len() - n] };
  (0 .. n).map(|i| {
    match (dim(a, i), dim(b, i)) {
      (x, y) if x == y => Some(x),
      (1, y) => Some(y),
      (x, 1) => Some(x),
      _ => None,
    }
  }).collect()
}
