use super::*;

/// The counting register behind every counter-based adder (and behind the bit-serial linear
/// layer): per output lane, an accumulator, plus an out-accumulator in non-scaled mode.
///
/// Each cycle, the lane's input count `s` is added to the accumulator, then:
///
///   - **Scaled**: output `1` iff `acc ≥ bound`, then `acc -= bound · out`. The output rate is
///     exactly `Σs / bound` in the long run, with a residual `acc ∈ [0, bound)` at every cycle
///     (provided `s ≤ bound`).
///   - **Non-scaled**: `acc -= offset`, output `1` iff `acc > out_acc`, then `out_acc += out`. The
///     number of 1s emitted tracks the offset-compensated running sum; the output is not a
///     probability in itself, callers rescale downstream.
#[derive(Clone, Debug)]
pub struct Accumulator {
  scaled: bool,
  acc: Lanes<f64>,
  out_acc: Lanes<f64>,
}

impl Accumulator {
  pub fn new(scaled: bool) -> Self {
    Self {
      scaled,
      acc: Lanes::filled(&[], 0.),
      out_acc: Lanes::filled(&[], 0.),
    }
  }

  pub fn scaled(&self) -> bool {
    self.scaled
  }

  pub fn value(&self) -> &ArrayD<f64> {
    self.acc.get()
  }

  /// The number of 1s emitted so far (non-scaled mode only; zero otherwise).
  pub fn out_value(&self) -> &ArrayD<f64> {
    self.out_acc.get()
  }

  pub(crate) fn check(&self, shape: &[usize]) -> Result<()> {
    self.acc.check(shape)?;
    self.out_acc.check(shape)
  }

  /// Accumulate one cycle of per-lane counts `sum`, and emit the output bits.
  pub fn step(&mut self, sum: &ArrayD<f64>, bound: f64, offset: f64) -> Result<ArrayD<u8>> {
    let shape = sum.shape();
    self.check(shape)?;
    let acc = self.acc.fit(shape)?;
    *acc += sum;
    if self.scaled {
      let output = acc.mapv(|a| u8::from(a >= bound));
      Zip::from(acc).and(&output).for_each(|a, &o| *a -= bound * f64::from(o));
      Ok(output)
    } else {
      let out_acc = self.out_acc.fit(shape)?;
      acc.mapv_inplace(|a| a - offset);
      let output = Zip::from(&*acc).and(&*out_acc).map_collect(|&a, &o| u8::from(a > o));
      Zip::from(out_acc).and(&output).for_each(|o, &b| *o += f64::from(b));
      Ok(output)
    }
  }
}

/// Configuration of a [`UnaryAdd`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AddConfig {
  pub mode: Mode,
  pub scaled: bool,
  /// The axis to reduce.
  pub acc_dim: usize,
  /// Overrides the scaling bound, which is otherwise the size of the reduced axis.
  pub scale: Option<f64>,
}

impl AddConfig {
  pub fn new(mode: Mode, scaled: bool, acc_dim: usize) -> Self {
    Self { mode, scaled, acc_dim, scale: None }
  }

  pub fn validate(&self) -> Result<()> {
    match self.scale {
      Some(scale) if !(scale > 0.) => Err(Error::config(format!("scale must be positive, got {scale}"))),
      _ => Ok(()),
    }
  }
}

/// Checks that `axis` exists in `shape` and is not empty, and returns its length.
fn reduced_len(shape: &[usize], axis: usize) -> Result<usize> {
  match shape.get(axis) {
    Some(&n) if n > 0 => Ok(n),
    _ => Err(Error::Precondition(format!("cannot reduce axis {axis} of an input of shape {shape:?}"))),
  }
}

/// Counter-based stochastic adder, reducing one axis of the input per cycle.
///
/// With `n` entries on the reduced axis, the bound is `n` (or the configured `scale`) and, in
/// bipolar mode, the offset is `(n - 1) / 2`: the sum of `n` bipolar values `v_i` has
/// `Σ P_i = (Σ v_i + n) / 2`, so the zero point of the sum sits `(n - 1) / 2` above a single
/// stream's.
#[derive(Clone, Debug)]
pub struct UnaryAdd {
  config: AddConfig,
  acc: Accumulator,
}

impl UnaryAdd {
  pub fn new(config: AddConfig) -> Result<Self> {
    config.validate()?;
    log::debug!(
      "unary adder: {} mode, scaled={}, reducing axis {}",
      config.mode, config.scaled, config.acc_dim,
    );
    let acc = Accumulator::new(config.scaled);
    Ok(Self { config, acc })
  }

  pub fn config(&self) -> &AddConfig {
    &self.config
  }

  pub fn accumulator(&self) -> &Accumulator {
    &self.acc
  }

  /// The sum bits of one cycle; the result has the input's shape with `acc_dim` removed.
  ///
  /// # Example
  ///
  /// ```
  /// # use unary_arith::{AddConfig, Mode, UnaryAdd};
  /// # use ndarray::array;
  /// let mut add = UnaryAdd::new(AddConfig::new(Mode::Unipolar, true, 0)).unwrap();
  /// assert_eq!(add.step(&array![1, 1, 0, 0].into_dyn()).unwrap()[[]], 0);
  /// assert_eq!(add.step(&array![1, 0, 1, 1].into_dyn()).unwrap()[[]], 1);
  /// assert_eq!(add.accumulator().value()[[]], 1.);
  /// ```
  pub fn step(&mut self, input: &ArrayD<u8>) -> Result<ArrayD<u8>> {
    let axis = self.config.acc_dim;
    let entries = reduced_len(input.shape(), axis)? as f64;
    let bound = self.config.scale.unwrap_or(entries);
    let offset = match self.config.mode {
      Mode::Unipolar => 0.,
      Mode::Bipolar => (entries - 1.) / 2.,
    };
    let sum = input.mapv(f64::from).sum_axis(Axis(axis));
    self.acc.step(&sum, bound, offset)
  }
}

/// Configuration of a [`GainesAdd`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GainesAddConfig {
  pub mode: Mode,
  pub scaled: bool,
  pub acc_dim: usize,
  /// Sequence driving the MUX select line; its values must stay below the reduced axis' size.
  pub rng: SequenceKind,
  pub dim: usize,
  pub bitwidth: u32,
}

impl GainesAddConfig {
  pub fn new(mode: Mode, scaled: bool, acc_dim: usize) -> Self {
    Self {
      mode,
      scaled,
      acc_dim,
      rng: SequenceKind::Sobol,
      dim: 5,
      bitwidth: 8,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.mode == Mode::Bipolar && !self.scaled {
      return Err(Error::config("non-scaled addition of bipolar streams has no single-gate form"))
    }
    Ok(())
  }
}

/// Single-gate stochastic adder.
///
///   - **Scaled**: a MUX. Each cycle, one entry of the reduced axis is selected by the next value
///     of an index sequence, and passed through. The result is the mean of the inputs.
///   - **Non-scaled** (unipolar only): an OR gate, which approximates the sum when the inputs are
///     sparse.
#[derive(Clone, Debug)]
pub struct GainesAdd {
  config: GainesAddConfig,
  sequence: Sequence,
  index: usize,
}

impl GainesAdd {
  pub fn new(config: GainesAddConfig) -> Result<Self> {
    config.validate()?;
    let sequence = Sequence::new(config.rng, config.bitwidth, config.dim)?;
    Self::with_sequence(config, sequence)
  }

  /// Build with an explicit select sequence.
  pub fn with_sequence(config: GainesAddConfig, sequence: Sequence) -> Result<Self> {
    config.validate()?;
    log::debug!(
      "gaines adder: {} mode, scaled={}, reducing axis {}, {}-bit select",
      config.mode, config.scaled, config.acc_dim, sequence.bitwidth(),
    );
    Ok(Self { config, sequence, index: 0 })
  }

  /// The select sequence of the MUX.
  pub fn sequence(&self) -> &Sequence {
    &self.sequence
  }

  pub fn config(&self) -> &GainesAddConfig {
    &self.config
  }

  pub fn step(&mut self, input: &ArrayD<u8>) -> Result<ArrayD<u8>> {
    let axis = self.config.acc_dim;
    let entries = reduced_len(input.shape(), axis)?;
    if self.config.scaled {
      let select = self.sequence.get(self.index) as usize;
      if select >= entries {
        return Err(Error::Precondition(format!(
          "MUX select {select} out of range for {entries} entries on axis {axis}"
        )))
      }
      self.index = (self.index + 1) % self.sequence.period();
      Ok(input.index_axis(Axis(axis), select).to_owned())
    } else {
      Ok(input.fold_axis(Axis(axis), 0, |&a, &b| a | b))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::array;
  use proptest::prelude::*;

  #[test]
  fn scaled_carry() {
    // Bring the accumulator to 2, then add [1, 0, 1, 1]: 2 + 3 = 5 ≥ 4, so emit 1 and keep 1.
    let mut add = UnaryAdd::new(AddConfig::new(Mode::Unipolar, true, 0)).unwrap();
    assert_eq!(add.step(&array![0, 1, 1, 0].into_dyn()).unwrap()[[]], 0);
    assert_eq!(add.accumulator().value()[[]], 2.);
    let out = add.step(&array![1, 0, 1, 1].into_dyn()).unwrap();
    assert_eq!(out[[]], 1);
    assert_eq!(add.accumulator().value()[[]], 1.);
  }

  #[test]
  fn non_scaled_bipolar() {
    // Two bipolar inputs at +1 (always 1), offset (2 - 1) / 2: the accumulator grows by 1.5 per
    // cycle, always ahead of the out-accumulator.
    let mut add = UnaryAdd::new(AddConfig::new(Mode::Bipolar, false, 1)).unwrap();
    let mut ones = 0;
    for _ in 0 .. 8 {
      ones += add.step(&array![[1, 1]].into_dyn()).unwrap()[[0]];
    }
    assert_eq!(ones, 8);
    assert_eq!(add.accumulator().out_value()[[0]], 8.);
    assert_eq!(add.accumulator().value()[[0]], 12.);
  }

  #[test]
  fn non_scaled_tracks_density() {
    // Unipolar 0.25 + 0.25: half the cycles should emit a 1.
    let mut add = UnaryAdd::new(AddConfig::new(Mode::Unipolar, false, 0)).unwrap();
    let ones: u32 = (0 .. 16)
      .map(|t| {
        let a = u8::from(t % 4 == 0);
        let b = u8::from(t % 4 == 2);
        add.step(&array![a, b].into_dyn()).unwrap()[[]] as u32
      })
      .sum();
    assert_eq!(ones, 8);
  }

  #[test]
  fn scale_override() {
    let mut config = AddConfig::new(Mode::Unipolar, true, 0);
    config.scale = Some(2.);
    let mut add = UnaryAdd::new(config).unwrap();
    assert_eq!(add.step(&array![1, 1, 0].into_dyn()).unwrap()[[]], 1);
    config = AddConfig::new(Mode::Unipolar, true, 0);
    config.scale = Some(0.);
    assert!(UnaryAdd::new(config).is_err());
  }

  #[test]
  fn bad_axis() {
    let mut add = UnaryAdd::new(AddConfig::new(Mode::Unipolar, true, 2)).unwrap();
    assert!(matches!(add.step(&array![[1, 0]].into_dyn()), Err(Error::Precondition(_))));
  }

  #[test]
  fn gaines_mux() {
    let seq = Sequence::from_values(2, vec![0, 2, 3, 1]).unwrap();
    let mut add = GainesAdd::with_sequence(GainesAddConfig::new(Mode::Bipolar, true, 1), seq).unwrap();
    let input = array![[1, 0, 0, 1], [0, 1, 1, 0]].into_dyn();
    let outs: Vec<_> = (0 .. 5).map(|_| add.step(&input).unwrap()).collect();
    assert_eq!(outs[0], array![1, 0].into_dyn());
    assert_eq!(outs[1], array![0, 1].into_dyn());
    assert_eq!(outs[2], array![1, 0].into_dyn());
    assert_eq!(outs[3], array![0, 1].into_dyn());
    // Wrapped around to select 0 again.
    assert_eq!(outs[4], outs[0]);
  }

  #[test]
  fn gaines_constructors_agree() {
    // `new` builds its select sequence and goes through `with_sequence`.
    let config = GainesAddConfig::new(Mode::Unipolar, true, 0);
    let built = GainesAdd::new(config.clone()).unwrap();
    let seq = Sequence::new(config.rng, config.bitwidth, config.dim).unwrap();
    let given = GainesAdd::with_sequence(config.clone(), seq.clone()).unwrap();
    assert_eq!(built.sequence(), &seq);
    assert_eq!(given.sequence(), &seq);
    assert_eq!(built.config(), given.config());
  }

  #[test]
  fn gaines_mux_out_of_range() {
    let seq = Sequence::from_values(2, vec![0, 3, 1, 2]).unwrap();
    let mut add = GainesAdd::with_sequence(GainesAddConfig::new(Mode::Unipolar, true, 0), seq).unwrap();
    let input = array![1, 0, 1].into_dyn();
    assert!(add.step(&input).is_ok());
    assert!(matches!(add.step(&input), Err(Error::Precondition(_))));
    // The failing cycle did not advance the select sequence.
    assert!(matches!(add.step(&input), Err(Error::Precondition(_))));
  }

  #[test]
  fn gaines_or() {
    let mut add = GainesAdd::new(GainesAddConfig::new(Mode::Unipolar, false, 0)).unwrap();
    let input = array![[0, 1, 0], [0, 0, 0], [0, 1, 1]].into_dyn();
    assert_eq!(add.step(&input).unwrap(), array![0, 1, 1].into_dyn());
  }

  #[test]
  fn gaines_bipolar_non_scaled_unsupported() {
    assert!(matches!(
      GainesAdd::new(GainesAddConfig::new(Mode::Bipolar, false, 0)),
      Err(Error::Config(_)),
    ));
  }

  proptest!{
    #![proptest_config(ProptestConfig::with_cases(crate::PROPTEST_CASES))]
    /// Over any window, the bits that went in equal the accumulator delta plus `bound` times the
    /// bits that came out; and the accumulator stays in `[0, bound)`.
    #[test]
    fn scaled_conservation(history in crate::test::bit_history(1 .. 8, 1 .. 64)) {
      let lanes = history[0].len() as f64;
      let mut add = UnaryAdd::new(AddConfig::new(Mode::Bipolar, true, 0)).unwrap();
      let mut bits_in = 0.;
      let mut bits_out = 0.;
      for input in &history {
        bits_in += input.iter().map(|&b| f64::from(b)).sum::<f64>();
        bits_out += f64::from(add.step(input).unwrap()[[]]);
        let acc = add.accumulator().value()[[]];
        prop_assert!((0. .. lanes).contains(&acc));
      }
      let acc = add.accumulator().value()[[]];
      prop_assert_eq!(bits_in, acc + lanes * bits_out);
    }
  }
}
