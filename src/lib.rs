//! This crate provides a cycle-accurate software model of *stochastic* (or *unary*) arithmetic
//! hardware: circuits that compute on bitstreams whose density of 1s encodes a value.
//!
//! # Introduction
//!
//! In stochastic computing a value `v` is carried by a stream of bits, one per clock cycle. In
//! **unipolar** coding the probability of a 1 is `v ∈ [0, 1]`; in **bipolar** coding it is
//! `(v + 1) / 2`, for `v ∈ [-1, 1]`. Arithmetic then reduces to very small circuits: an AND gate
//! multiplies two unipolar streams, a counter adds them, and so on. The price is latency: a
//! `w`-bit result needs on the order of `2^w` cycles.
//!
//! This crate simulates such circuits one cycle at a time, over whole batches of lanes at once,
//! with the same registers (counters, accumulators, shift registers) the hardware would have, so
//! that its outputs are bit-exact with what the hardware would produce for the same index
//! sequences.
//!
//! # Components
//!
//!   - [`Sequence`]: the per-cycle comparison values (Sobol, LFSR, ramp, random permutation).
//!   - [`BitstreamGenerator`]: static magnitude → bit, for a given counter.
//!   - [`GainesMul`], [`StaticMul`]: multipliers.
//!   - [`UnaryAdd`], [`GainesAdd`]: adders.
//!   - [`Linear`]: a bit-serial fully-connected layer, with the [`HubLinear`] (lookup table) and
//!     [`FxpLinear`] (fixed point) fast paths and their [`linear_grad`] gradient.
//!   - [`GainesLinear`]: the same layer built from gates, with gate or counter addition.
//!   - [`Relu`]: rate- and temporal-coded ReLU.
//!
//! Every component is stepped explicitly, once per cycle; the output of a cycle depends on the
//! state left by the previous cycles and on the current inputs only.
//!
//! # Usage
//!
//! ```
//! use unary_arith::*;
//! use ndarray::array;
//!
//! // Multiply a live bipolar stream by a static -0.5, over one 8-bit period.
//! let mut mul = StaticMul::new(MulConfig::new(8, Mode::Bipolar), &array![-0.5].into_dyn())?;
//! let input = BitstreamGenerator::new(
//!   &array![0.5].into_dyn(),
//!   Mode::Bipolar,
//!   Sequence::new(SequenceKind::Sobol, 8, 2)?,
//! );
//! let mut ones = 0u32;
//! for t in 0 .. 256 {
//!   let bit = input.generate(&array![t].into_dyn())?;
//!   ones += u32::from(mul.step(&bit)?[[0]]);
//! }
//! // 0.5 · -0.5 = -0.25, i.e. probability 0.375.
//! assert!((f64::from(ones) / 256. - 0.375).abs() < 0.02);
//! # Ok::<(), unary_arith::Error>(())
//! ```
//!
//! # Logging
//!
//! Components log through the [`log`](https://docs.rs/log) facade: their derived parameters on
//! construction and lane-state expansion at `debug`, fast-path shift amounts at `trace`. Install
//! any logger to see them.

mod error;
mod config;
mod lanes;
mod sequence;
mod stream;
mod kernel;

#[cfg(test)]
mod test;

pub use error::{Error, Result};
pub use config::{Coding, KeepRes, LinearAdder, Mode, MoreRes, Rounding};
pub use sequence::{MAX_BITWIDTH, Sequence, SequenceKind, SequenceSource};
pub use stream::{BitstreamGenerator, source_level};
pub use kernel::mul::{GainesMul, MulConfig, StaticMul};
pub use kernel::add::{Accumulator, AddConfig, GainesAdd, GainesAddConfig, UnaryAdd};
pub use kernel::linear::{
  FxpConfig, FxpLinear, FxpWidth, GainesLinear, GainesLinearConfig, HubConfig, HubLinear, Linear,
  LinearConfig, LinearGrad, MAX_COUNTER_DEPTH, Shifts, linear_grad,
};
pub use kernel::relu::{MAX_DEPTH, MAX_SHIFT_REG_DEPTH, Relu, ReluConfig, ShiftRegister};

#[cfg(test)]
const PROPTEST_CASES: u32 = if cfg!(debug_assertions) {0x100} else {0x1000};
