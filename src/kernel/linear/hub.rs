use super::*;

/// Largest supported `cycle`; the product table has `cycle²` entries.
const MAX_CYCLE: usize = 1 << 12;

/// Configuration of a [`HubLinear`] layer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HubConfig {
  pub in_features: usize,
  pub out_features: usize,
  pub bias: bool,
  /// Length of one unipolar multiply, a power of two. The bitwidth of the quantised magnitudes is
  /// `log2(cycle)`.
  pub cycle: usize,
  /// Sequence of the input streams. The weight streams always use a Sobol sequence.
  pub rng: SequenceKind,
  pub rounding: Rounding,
  pub seed: u64,
}

impl HubConfig {
  pub fn new(in_features: usize, out_features: usize) -> Self {
    Self {
      in_features,
      out_features,
      bias: true,
      cycle: 128,
      rng: SequenceKind::Sobol,
      rounding: Rounding::Round,
      seed: 0,
    }
  }

  pub fn bitwidth(&self) -> u32 {
    self.cycle.trailing_zeros()
  }

  pub fn validate(&self) -> Result<()> {
    if !self.cycle.is_power_of_two() || !(2 ..= MAX_CYCLE).contains(&self.cycle) {
      return Err(Error::config(format!(
        "cycle must be a power of two in 2..={MAX_CYCLE}, got {}", self.cycle
      )))
    }
    Ok(())
  }
}

/// Fully-connected layer computing, in one shot, what the bit-serial layer would count over one
/// period.
///
/// At construction a product table is derived from the input and weight sequences: entry
/// `[x][w]` is the number of 1s a unipolar rate-coded multiply of input level `x` by weight level
/// `w` emits over `cycle` cycles. A forward pass quantises the magnitudes of the input and the
/// weight to levels in `0 .. cycle` with a dynamic power-of-two shift, looks up every product,
/// applies the signs, sums, and shifts back.
#[derive(Clone, Debug)]
pub struct HubLinear {
  config: HubConfig,
  weight: Array2<f64>,
  bias: Option<Array1<f64>>,
  table: Array2<u32>,
  shifts: Option<Shifts>,
}

impl HubLinear {
  pub fn new(config: HubConfig, weight: Option<Array2<f64>>, bias: Option<Array1<f64>>) -> Result<Self> {
    config.validate()?;
    let (weight, bias) = init_params(
      config.in_features,
      config.out_features,
      config.bias,
      config.seed,
      weight,
      bias,
    )?;
    let bitwidth = config.bitwidth();
    let irng = Sequence::new(config.rng, bitwidth, 1)?;
    let wrng = Sequence::new(SequenceKind::Sobol, bitwidth, 1)?;
    let table = product_table(&irng, &wrng);
    log::debug!(
      "hub linear {} → {}: cycle {}, {} input sequence, {} rounding",
      config.in_features, config.out_features, config.cycle, config.rng, config.rounding,
    );
    Ok(Self { config, weight, bias, table, shifts: None })
  }

  pub fn config(&self) -> &HubConfig {
    &self.config
  }

  pub fn weight(&self) -> &Array2<f64> {
    &self.weight
  }

  pub fn bias(&self) -> Option<&Array1<f64>> {
    self.bias.as_ref()
  }

  /// The product table, indexed `[input_level, weight_level]`.
  pub fn table(&self) -> &Array2<u32> {
    &self.table
  }

  /// The shifts of the last forward pass, if any.
  pub fn shifts(&self) -> Option<Shifts> {
    self.shifts
  }

  /// The layer output for a real-valued `(batch, in_features)` input.
  pub fn forward(&mut self, input: &Array2<f64>) -> Result<Array2<f64>> {
    batch_of(input.shape(), self.config.in_features)?;
    let bitwidth = f64::from(self.config.bitwidth());
    let input_exp = max_exponent(input, self.config.rounding);
    let weight_exp = max_exponent(&self.weight, self.config.rounding);
    let shifts = Shifts {
      input: input_exp - bitwidth,
      weight: weight_exp - bitwidth,
      output: bitwidth - input_exp - weight_exp,
    };
    log::trace!("hub shifts: {shifts:?}");

    let top = (self.config.cycle - 1) as f64;
    let level = |v: f64, shift: f64| (v.abs() / shift.exp2()).trunc().clamp(0., top) as usize;
    let qx = input.mapv(|v| level(v, shifts.input));
    let qw = self.weight.mapv(|v| level(v, shifts.weight));

    let scale = shifts.output.exp2();
    let output = Array2::from_shape_fn((input.nrows(), self.config.out_features), |(b, o)| {
      let sum: f64 = (0 .. self.config.in_features)
        .map(|i| {
          let product = f64::from(self.table[[qx[[b, i]], qw[[o, i]]]]);
          sign(input[[b, i]]) * sign(self.weight[[o, i]]) * product
        })
        .sum();
      sum / scale
    });
    self.shifts = Some(shifts);
    Ok(add_bias(output, self.bias.as_ref()))
  }

  /// Straight-through gradients for `grad_output`, given the `input` of the forward pass.
  pub fn backward(&self, grad_output: &Array2<f64>, input: &Array2<f64>) -> Result<LinearGrad> {
    linear_grad(grad_output, input, &self.weight, self.bias.is_some())
  }
}

/// `table[x][w]`: an input stream of level `x` (compared against `irng`) has `k` ones over a
/// period; a weight stream of level `w` sampled on exactly those cycles (compared against the
/// first `k` values of `wrng`) yields `table[x][w]` ones.
fn product_table(irng: &Sequence, wrng: &Sequence) -> Array2<u32> {
  let cycle = irng.period();
  let mut table = Array2::zeros((cycle, cycle));
  let mut hist = vec![0u32; cycle];
  for (x, mut row) in table.outer_iter_mut().enumerate() {
    let ones = irng.values().iter().filter(|&&r| (r as usize) < x).count();
    hist.fill(0);
    for &r in &wrng.values()[.. ones] {
      hist[r as usize] += 1;
    }
    let mut below = 0;
    for (cell, &n) in row.iter_mut().zip(&hist) {
      *cell = below;
      below += n;
    }
  }
  table
}
