use super::*;

/// Largest width of the saturating output counter.
pub const MAX_COUNTER_DEPTH: u32 = 62;

/// Configuration of a [`GainesLinear`] layer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GainesLinearConfig {
  pub in_features: usize,
  pub out_features: usize,
  pub bias: bool,
  /// Width of the weight and bias sequences.
  pub bitwidth: u32,
  pub mode: Mode,
  pub scaled: bool,
  /// Width of the saturating counter (non-scaled bipolar, gate-style adder).
  pub depth: u32,
  /// Sequence kind of the weight, bias and scaling sequences.
  pub rng: SequenceKind,
  /// Selects the scaling sequence, which uses dimension `dim + 5`.
  pub dim: usize,
  pub adder: LinearAdder,
  /// Seed for the default weight and bias initialisation.
  pub seed: u64,
}

impl GainesLinearConfig {
  pub fn new(in_features: usize, out_features: usize) -> Self {
    Self {
      in_features,
      out_features,
      bias: true,
      bitwidth: 8,
      mode: Mode::Bipolar,
      scaled: true,
      depth: 8,
      rng: SequenceKind::Sobol,
      dim: 1,
      adder: LinearAdder::Gaines,
      seed: 0,
    }
  }

  /// Number of counted entries per output neuron: the inputs, plus the bias.
  pub fn entries(&self) -> usize {
    self.in_features + usize::from(self.bias)
  }

  /// Width of the sequence the product count is compared against in scaled mode:
  /// `log2(entries)`, rounded, and at least 1.
  pub fn scale_bitwidth(&self) -> u32 {
    ((self.entries() as f64).log2().round_ties_even() as u32).max(1)
  }

  pub fn validate(&self) -> Result<()> {
    if !(1 ..= MAX_COUNTER_DEPTH).contains(&self.depth) {
      return Err(Error::config(format!(
        "counter depth must be in 1..={MAX_COUNTER_DEPTH}, got {}", self.depth
      )))
    }
    Ok(())
  }
}

#[derive(Clone, Debug)]
enum Adder {
  /// Output 1 iff the product count reaches the next value of `sequence`.
  Compare { sequence: Sequence, index: usize },
  /// Output 1 iff any product is 1.
  Or,
  /// Up/down counter in `[0, max]`, starting at `half`, moved by `2·count - entries`.
  Saturating { counter: Lanes<i64>, half: i64, max: i64, entries: i64 },
  /// The unary adder's accumulator.
  Unary { acc: Accumulator, bound: f64, offset: f64 },
}

/// Fully-connected layer built from Gaines-style gates: each product is an AND (or XNOR) of the
/// input bit with a weight bit, and the products are added either by gates or by the unary
/// accumulator.
///
/// Unlike [`Linear`], every input column draws its weight bits from a sequence of its own (input
/// `i` uses dimension `i + 1`, the bias dimension `in_features + 1`), and all weight and bias
/// streams advance every cycle, whatever the input.
///
/// With the gate-style adder:
///
///   - **Scaled**: output 1 iff the count is at least the next value of a `scale_bitwidth`-bit
///     sequence.
///   - **Non-scaled, unipolar**: an OR of the products.
///   - **Non-scaled, bipolar**: a saturating counter moved by `2·count - entries`, output 1 while
///     it is above its midpoint.
///
/// With the unary adder, the counts feed an [`Accumulator`] with bound `entries` and, in bipolar
/// mode, offset `(entries - 1) / 2`.
#[derive(Clone, Debug)]
pub struct GainesLinear {
  config: GainesLinearConfig,
  weight: Array2<f64>,
  bias: Option<Array1<f64>>,
  weight_bsg: Vec<BitstreamGenerator>,
  bias_bsg: Option<BitstreamGenerator>,
  index: usize,
  adder: Adder,
}

impl GainesLinear {
  pub fn new(config: GainesLinearConfig, weight: Option<Array2<f64>>, bias: Option<Array1<f64>>) -> Result<Self> {
    config.validate()?;
    let (weight, bias) = init_params(
      config.in_features,
      config.out_features,
      config.bias,
      config.seed,
      weight,
      bias,
    )?;

    let sequences = Sequence::lanes(config.rng, config.bitwidth, config.in_features, 1)?;
    let weight_bsg = sequences.into_iter()
      .zip(weight.columns())
      .map(|(sequence, column)| BitstreamGenerator::new(&column.to_owned().into_dyn(), config.mode, sequence))
      .collect();
    let bias_bsg = match &bias {
      Some(bias) => {
        let sequence = Sequence::new(config.rng, config.bitwidth, config.in_features + 1)?;
        Some(BitstreamGenerator::new(&bias.clone().into_dyn(), config.mode, sequence))
      }
      None => None,
    };

    let entries = config.entries();
    let adder = match (config.adder, config.scaled, config.mode) {
      (LinearAdder::Gaines, true, _) => Adder::Compare {
        sequence: Sequence::new(config.rng, config.scale_bitwidth(), config.dim + 5)?,
        index: 0,
      },
      (LinearAdder::Gaines, false, Mode::Unipolar) => Adder::Or,
      (LinearAdder::Gaines, false, Mode::Bipolar) => {
        let half = 1i64 << (config.depth - 1);
        Adder::Saturating {
          counter: Lanes::filled(&[], half),
          half,
          max: (1i64 << config.depth) - 1,
          entries: entries as i64,
        }
      }
      (LinearAdder::Unary, scaled, mode) => Adder::Unary {
        acc: Accumulator::new(scaled),
        bound: entries as f64,
        offset: match mode {
          Mode::Unipolar => 0.,
          Mode::Bipolar => (entries as f64 - 1.) / 2.,
        },
      },
    };
    log::debug!(
      "gaines linear {} → {}: {} mode, {}-bit {} weights, {} adder, scaled={}",
      config.in_features, config.out_features, config.mode, config.bitwidth, config.rng,
      config.adder, config.scaled,
    );

    Ok(Self { config, weight, bias, weight_bsg, bias_bsg, index: 0, adder })
  }

  pub fn config(&self) -> &GainesLinearConfig {
    &self.config
  }

  pub fn weight(&self) -> &Array2<f64> {
    &self.weight
  }

  pub fn bias(&self) -> Option<&Array1<f64>> {
    self.bias.as_ref()
  }

  /// The position of the weight and bias streams in their sequences.
  pub fn index(&self) -> usize {
    self.index
  }

  /// The saturating counter, for the non-scaled bipolar gate-style layer.
  pub fn counter(&self) -> Option<&ArrayD<i64>> {
    match &self.adder {
      Adder::Saturating { counter, .. } => Some(counter.get()),
      _ => None,
    }
  }

  /// The accumulator, for the unary-adder layer.
  pub fn accumulator(&self) -> Option<&Accumulator> {
    match &self.adder {
      Adder::Unary { acc, .. } => Some(acc),
      _ => None,
    }
  }

  fn check(&self, batch: usize) -> Result<()> {
    let shape = [batch, self.config.out_features];
    match &self.adder {
      Adder::Saturating { counter, .. } => counter.check(&shape),
      Adder::Unary { acc, .. } => acc.check(&shape),
      Adder::Compare { .. } | Adder::Or => Ok(()),
    }
  }

  /// One cycle of the products: for every batch lane and output neuron, the number of 1s among
  /// the input/weight products and the bias bit, as a `(batch, out_features)` tensor.
  ///
  /// This advances the weight and bias streams but not the adder.
  pub fn step_pc(&mut self, input: &ArrayD<u8>) -> Result<ArrayD<f64>> {
    let batch = batch_of(input.shape(), self.config.in_features)?;
    self.check(batch)?;
    self.count(input)
  }

  /// One cycle of the whole layer: the output bits, as a `(batch, out_features)` tensor.
  pub fn step(&mut self, input: &ArrayD<u8>) -> Result<ArrayD<u8>> {
    let batch = batch_of(input.shape(), self.config.in_features)?;
    self.check(batch)?;
    let count = self.count(input)?;
    match &mut self.adder {
      Adder::Compare { sequence, index } => {
        let threshold = f64::from(sequence.get(*index));
        *index = (*index + 1) % sequence.period();
        Ok(count.mapv(|c| u8::from(c >= threshold)))
      }
      Adder::Or => Ok(count.mapv(|c| u8::from(c > 0.))),
      Adder::Saturating { counter, half, max, entries } => {
        let (half, max, entries) = (*half, *max, *entries);
        let counter = counter.fit(count.shape())?;
        Zip::from(&mut *counter).and(&count).for_each(|n, &c| {
          *n = (*n + 2 * c as i64 - entries).clamp(0, max);
        });
        Ok(counter.mapv(|n| u8::from(n > half)))
      }
      Adder::Unary { acc, bound, offset } => acc.step(&count, *bound, *offset),
    }
  }

  fn count(&mut self, input: &ArrayD<u8>) -> Result<ArrayD<f64>> {
    let shape = [self.config.out_features, self.config.in_features];
    let at = ndarray::arr0(self.index).into_dyn();
    let mut wbits = ArrayD::<f64>::zeros(IxDyn(&shape));
    for (i, bsg) in self.weight_bsg.iter().enumerate() {
      let column = bsg.generate(&at)?;
      wbits.index_axis_mut(Axis(1), i).assign(&column.mapv(f64::from));
    }
    // (batch, 1, in), to broadcast against the weights.
    let xf = input.view().insert_axis(Axis(1)).mapv(f64::from);
    let mut count = (&wbits * &xf).sum_axis(Axis(2));

    if let Some(bias_bsg) = &self.bias_bsg {
      count += &bias_bsg.generate(&at)?.mapv(f64::from);
    }
    if self.config.mode == Mode::Bipolar {
      let wbits_inv = wbits.mapv(|b| 1. - b);
      let xf_inv = xf.mapv(|b| 1. - b);
      count += &(&wbits_inv * &xf_inv).sum_axis(Axis(2));
    }

    self.index = (self.index + 1) % (1usize << self.config.bitwidth);
    Ok(count)
  }
}
