//! The arithmetic kernels. Each one is a component stepped once per simulated cycle, carrying its
//! own registers (counters, accumulators, shift registers) from one cycle to the next.
//!
//! All kernels share the same ordering rule: the output of cycle `t` is computed from the state
//! as of the end of cycle `t - 1` and the inputs of cycle `t`, and only then is the state
//! updated. A step that fails does so before touching any state.

use crate::lanes::Lanes;
use crate::stream::{broadcast_shape, BitstreamGenerator};
use crate::{Error, Mode, Result, Sequence, SequenceKind};
use ndarray::{ArrayD, Axis, IxDyn, Zip};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Multipliers: logic gates, and conditional sampling of a static operand.
pub mod mul;

/// Adders: counter-based (scaled and rate-limited) and single-gate (MUX / OR).
pub mod add;

/// Fully-connected layers: bit-serial, plus the lookup-table and fixed-point fast paths.
pub mod linear;

/// ReLU against bipolar zero, for rate- and temporal-coded streams.
pub mod relu;

/// `a` broadcast to `shape`, or a shape mismatch.
fn broadcast_to<'a, T>(a: &'a ArrayD<T>, shape: &[usize]) -> Result<ndarray::ArrayViewD<'a, T>> {
  a.broadcast(IxDyn(shape)).ok_or_else(|| Error::shape(shape, a.shape()))
}
