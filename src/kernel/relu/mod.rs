//! ReLU on bipolar streams: the output must carry `max(v, 0)`, i.e. never drop below probability
//! ½. Each variant keeps a running estimate of the value emitted so far and forces 1s whenever
//! that estimate falls below zero.

use super::*;
use crate::Coding;

/// The shift-register history used by the smoothed variant.
mod shift_reg;

pub use shift_reg::ShiftRegister;

/// Largest accumulator depth of the rate-coded variant.
pub const MAX_DEPTH: u32 = 62;

/// Largest history length of the shift-register variant.
pub const MAX_SHIFT_REG_DEPTH: u32 = 127;

/// Configuration of a [`Relu`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReluConfig {
  /// Width of the saturating accumulator, or length of the shift register.
  pub depth: u32,
  /// Width of the temporal code; the stream crosses zero after `2^(bitwidth - 1)` cycles.
  pub bitwidth: u32,
  pub encode: Coding,
  /// Use a shift register of the last `depth` outputs instead of an accumulator.
  pub shift_reg: bool,
}

impl ReluConfig {
  pub fn new(encode: Coding) -> Self {
    Self { depth: 8, bitwidth: 8, encode, shift_reg: false }
  }

  pub fn validate(&self) -> Result<()> {
    match (self.encode, self.shift_reg) {
      (Coding::Rate, false) if !(1 ..= MAX_DEPTH).contains(&self.depth) => Err(Error::config(format!(
        "accumulator depth must be in 1..={MAX_DEPTH}, got {}", self.depth
      ))),
      (Coding::Rate, true) if !(1 ..= MAX_SHIFT_REG_DEPTH).contains(&self.depth) => Err(Error::config(format!(
        "shift register depth must be in 1..={MAX_SHIFT_REG_DEPTH}, got {}", self.depth
      ))),
      (Coding::Temporal, true) => Err(Error::config("temporal-coded ReLU has no shift register form")),
      (Coding::Temporal, false) if !(1 ..= MAX_DEPTH).contains(&self.bitwidth) => Err(Error::config(format!(
        "temporal bitwidth must be in 1..={MAX_DEPTH}, got {}", self.bitwidth
      ))),
      _ => Ok(()),
    }
  }
}

#[derive(Clone, Debug)]
enum State {
  /// Saturating up/down counter in `[0, max]`, starting at `half`.
  Rate { acc: Lanes<u64>, half: u64, max: u64 },
  /// The last `depth` outputs. The very first cycle emits 1s.
  Smoothed { reg: ShiftRegister, half: f64, first: bool },
  /// Cycles elapsed (shared by all lanes) and per-lane count of input 1s.
  Temporal { cycle: u64, acc: Lanes<u64>, threshold: u64 },
}

/// Stochastic ReLU on bipolar bitstreams.
///
///   - **Rate**: out = `x | (acc < half)`, then `acc += 2·out - 1`, saturating. The counter
///     tracks the running bipolar sum of the output; while that sum is negative, 1s are forced.
///   - **Rate, shift register**: out = `x | (count < depth / 2)` over the last `depth` outputs.
///   - **Temporal**: the input is a thermometer code whose zero crossing is at cycle
///     `threshold = 2^(bitwidth - 1)`. Counting the current cycle and bit, during the first half
///     out = `cycle ≥ ones`; afterwards out = `x` if `ones > threshold`, else 0.
#[derive(Clone, Debug)]
pub struct Relu {
  config: ReluConfig,
  state: State,
}

impl Relu {
  pub fn new(config: ReluConfig) -> Result<Self> {
    config.validate()?;
    let state = match (config.encode, config.shift_reg) {
      (Coding::Rate, false) => {
        let half = 1u64 << (config.depth - 1);
        State::Rate { acc: Lanes::filled(&[], half), half, max: (1u64 << config.depth) - 1 }
      }
      (Coding::Rate, true) => State::Smoothed {
        reg: ShiftRegister::new(config.depth as usize)?,
        half: f64::from(config.depth) / 2.,
        first: true,
      },
      (Coding::Temporal, _) => State::Temporal {
        cycle: 0,
        acc: Lanes::filled(&[], 0),
        threshold: 1u64 << (config.bitwidth - 1),
      },
    };
    log::debug!(
      "relu: {} coded, depth {}, bitwidth {}, shift register {}",
      config.encode, config.depth, config.bitwidth, config.shift_reg,
    );
    Ok(Self { config, state })
  }

  pub fn config(&self) -> &ReluConfig {
    &self.config
  }

  /// The per-lane accumulator, for the rate-coded and temporal variants.
  pub fn accumulator(&self) -> Option<&ArrayD<u64>> {
    match &self.state {
      State::Rate { acc, .. } | State::Temporal { acc, .. } => Some(acc.get()),
      State::Smoothed { .. } => None,
    }
  }

  pub fn shift_register(&self) -> Option<&ShiftRegister> {
    match &self.state {
      State::Smoothed { reg, .. } => Some(reg),
      _ => None,
    }
  }

  /// The output bits of one cycle, with the input's shape.
  ///
  /// # Example
  ///
  /// ```
  /// # use unary_arith::{Coding, Relu, ReluConfig};
  /// # use ndarray::array;
  /// let mut relu = Relu::new(ReluConfig::new(Coding::Rate)).unwrap();
  /// // A run of 0s (i.e. -1s) is clamped to alternating bits (i.e. around 0).
  /// let out: Vec<u8> = (0 .. 6).map(|_| relu.step(&array![0].into_dyn()).unwrap()[[0]]).collect();
  /// assert_eq!(out, [0, 1, 0, 1, 0, 1]);
  /// ```
  pub fn step(&mut self, input: &ArrayD<u8>) -> Result<ArrayD<u8>> {
    let shape = input.shape();
    match &mut self.state {
      State::Rate { acc, half, max } => {
        let (half, max) = (*half, *max);
        let acc = acc.fit(shape)?;
        let output = Zip::from(input).and(&*acc).map_collect(|&x, &a| (x & 1) | u8::from(a < half));
        Zip::from(acc).and(&output).for_each(|a, &o| {
          *a = if o == 1 { (*a + 1).min(max) } else { a.saturating_sub(1) };
        });
        Ok(output)
      }
      State::Smoothed { reg, half, first } => {
        reg.check(shape)?;
        let output = if *first {
          ArrayD::ones(IxDyn(shape))
        } else {
          let count = reg.count();
          let count = broadcast_to(count, shape)?;
          Zip::from(input).and(count).map_collect(|&x, &c| (x & 1) | u8::from(f64::from(c) < *half))
        };
        reg.push(&output)?;
        *first = false;
        Ok(output)
      }
      State::Temporal { cycle, acc, threshold } => {
        let threshold = *threshold;
        let acc = acc.fit(shape)?;
        *cycle += 1;
        let second_half = *cycle > threshold;
        let cycle = *cycle;
        Zip::from(&mut *acc).and(input).for_each(|a, &x| *a += u64::from(x & 1));
        Ok(Zip::from(input).and(&*acc).map_collect(|&x, &a| {
          if second_half { u8::from(a > threshold) & x } else { u8::from(cycle >= a) }
        }))
      }
    }
  }
}
