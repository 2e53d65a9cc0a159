//! Fully-connected layers over bitstreams.
//!
//! [`Linear`] is the cycle-accurate one: every cycle it regenerates the weight (and bias) bits,
//! ANDs them with the input bits, counts the products per output neuron (the *parallel counter*),
//! and feeds the counts to an [`Accumulator`].
//!
//! [`GainesLinear`] is its gate-level sibling: weight bits from one sequence per input column,
//! advancing every cycle, and the products added by gates or by the same accumulator.
//!
//! [`HubLinear`] and [`FxpLinear`] skip the simulation and compute, on real-valued inputs, what
//! such hardware would produce over a whole period: the former through a product lookup table
//! derived from the very same index sequences, the latter as a plain fixed-point multiply. Both
//! use the straight-through gradient of [`linear_grad`] for training.

use super::*;
use crate::kernel::add::Accumulator;
use crate::{Coding, KeepRes, LinearAdder, MoreRes, Rounding};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The bit-serial layer.
mod exact;

/// The gate-level layer.
mod gaines;

/// The lookup-table fast path.
mod hub;

/// The fixed-point fast path.
mod fxp;

/// Gradients.
mod grad;

pub use exact::{Linear, LinearConfig};
pub use fxp::{FxpConfig, FxpLinear, FxpWidth};
pub use gaines::{GainesLinear, GainesLinearConfig, MAX_COUNTER_DEPTH};
pub use grad::{LinearGrad, linear_grad};
pub use hub::{HubConfig, HubLinear};

/// The power-of-two shift amounts used by a fast-path forward pass: values are divided by
/// `2^input` and `2^weight` before quantisation, and the integer result by `2^output`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shifts {
  pub input: f64,
  pub weight: f64,
  pub output: f64,
}

/// Take the supplied weight and bias, checking their shapes, or draw them uniformly from
/// `±1/√in_features` like a freshly initialised dense layer.
fn init_params(
  in_features: usize,
  out_features: usize,
  has_bias: bool,
  seed: u64,
  weight: Option<Array2<f64>>,
  bias: Option<Array1<f64>>,
) -> Result<(Array2<f64>, Option<Array1<f64>>)> {
  if in_features == 0 || out_features == 0 {
    return Err(Error::config(format!(
      "layer must have at least one input and one output, got {in_features} → {out_features}"
    )))
  }
  let mut rng = StdRng::seed_from_u64(seed);
  let bound = 1. / (in_features as f64).sqrt();
  let weight = match weight {
    Some(w) if w.dim() != (out_features, in_features) => {
      return Err(Error::shape(&[out_features, in_features], w.shape()))
    }
    Some(w) => w,
    None => Array2::from_shape_simple_fn((out_features, in_features), || rng.gen_range(-bound ..= bound)),
  };
  let bias = match (has_bias, bias) {
    (false, Some(_)) => {
      log::warn!("bias supplied to a layer configured without one; ignoring it");
      None
    }
    (false, None) => None,
    (true, Some(b)) if b.len() != out_features => return Err(Error::shape(&[out_features], b.shape())),
    (true, Some(b)) => Some(b),
    (true, None) => Some(Array1::from_shape_simple_fn(out_features, || rng.gen_range(-bound ..= bound))),
  };
  Ok((weight, bias))
}

/// Checks that `input` is `(batch, in_features)`, and returns `batch`.
fn batch_of(input: &[usize], in_features: usize) -> Result<usize> {
  match *input {
    [batch, n] if n == in_features => Ok(batch),
    _ => Err(Error::shape(&[input.first().copied().unwrap_or(1), in_features], input)),
  }
}

/// `log2` of the largest magnitude in `values`, rounded. An all-zero tensor has exponent 0.
fn max_exponent<'a>(values: impl IntoIterator<Item = &'a f64>, rounding: Rounding) -> f64 {
  let max = values.into_iter().fold(0f64, |m, &v| m.max(v.abs()));
  if max > 0. { rounding.apply(max.log2()) } else { 0. }
}

/// Sign as `-1`, `0` or `1`.
fn sign(x: f64) -> f64 {
  if x > 0. { 1. } else if x < 0. { -1. } else { 0. }
}

/// Add `bias` to every row of `output`.
fn add_bias(mut output: Array2<f64>, bias: Option<&Array1<f64>>) -> Array2<f64> {
  if let Some(bias) = bias {
    output += bias;
  }
  output
}
