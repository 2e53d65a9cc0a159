use super::*;

/// Configuration of a [`Linear`] layer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinearConfig {
  pub in_features: usize,
  pub out_features: usize,
  pub bias: bool,
  /// Width of the weight and bias sequences.
  pub bitwidth: u32,
  pub mode: Mode,
  pub scaled: bool,
  /// Sequence of the weight streams. The bias streams always use a Sobol sequence.
  pub rng: SequenceKind,
  pub dim: usize,
  /// How the weight counters advance.
  ///
  ///   - [`Coding::Rate`]: by the input bit, so a weight stream stalls while its input is 0.
  ///   - [`Coding::Temporal`]: every cycle.
  pub weight_coding: Coding,
  /// Overrides the accumulator bound, which is otherwise `in_features + bias`.
  pub scale: Option<f64>,
  /// Seed for the default weight and bias initialisation.
  pub seed: u64,
}

impl LinearConfig {
  pub fn new(in_features: usize, out_features: usize) -> Self {
    Self {
      in_features,
      out_features,
      bias: true,
      bitwidth: 8,
      mode: Mode::Bipolar,
      scaled: true,
      rng: SequenceKind::Sobol,
      dim: 1,
      weight_coding: Coding::Rate,
      scale: None,
      seed: 0,
    }
  }

  /// Set the weight sequence, and the weight coding that goes with it: temporal for
  /// [`SequenceKind::Race`], rate for everything else.
  pub fn with_rng(mut self, rng: SequenceKind) -> Self {
    self.rng = rng;
    self.weight_coding = match rng {
      SequenceKind::Race => Coding::Temporal,
      _ => Coding::Rate,
    };
    self
  }

  /// Number of counted entries per output neuron: the inputs, plus the bias.
  pub fn entries(&self) -> usize {
    self.in_features + usize::from(self.bias)
  }

  pub fn validate(&self) -> Result<()> {
    match self.scale {
      Some(scale) if !(scale > 0.) => Err(Error::config(format!("scale must be positive, got {scale}"))),
      _ => Ok(()),
    }
  }
}

/// Bit-serial fully-connected layer.
///
/// Input bits come in as a `(batch, in_features)` tensor, one cycle per call. The weight counters
/// are per batch lane, shape `(batch, out_features, in_features)`, starting with a batch of 1.
///
/// In bipolar mode the XNOR product is split into two AND passes that are summed: the input
/// against the weight bits, plus the inverted input against the inverted weight bits. With rate
/// coding the second pass has its own counters, advanced on input 0s; with temporal coding it
/// reuses the first pass's weight bits.
#[derive(Clone, Debug)]
pub struct Linear {
  config: LinearConfig,
  weight: Array2<f64>,
  bias: Option<Array1<f64>>,
  weight_bsg: BitstreamGenerator,
  index: Lanes<usize>,
  index_inv: Option<Lanes<usize>>,
  bias_bsg: Option<BitstreamGenerator>,
  bias_index: usize,
  acc: Accumulator,
  bound: f64,
  offset: f64,
}

impl Linear {
  /// Build a layer from `config`, with the given weight (`out_features × in_features`) and bias
  /// (`out_features`), or default-initialised ones.
  pub fn new(config: LinearConfig, weight: Option<Array2<f64>>, bias: Option<Array1<f64>>) -> Result<Self> {
    config.validate()?;
    let (weight, bias) = init_params(
      config.in_features,
      config.out_features,
      config.bias,
      config.seed,
      weight,
      bias,
    )?;

    let sequence = Sequence::new(config.rng, config.bitwidth, config.dim)?;
    let weight_bsg = BitstreamGenerator::new(&weight.clone().into_dyn(), config.mode, sequence);
    let index = Lanes::filled(&[1, config.out_features, config.in_features], 0);
    let index_inv = (config.mode == Mode::Bipolar && config.weight_coding == Coding::Rate)
      .then(|| index.clone());
    let bias_bsg = match &bias {
      Some(bias) => {
        let sequence = Sequence::new(SequenceKind::Sobol, config.bitwidth, config.dim)?;
        Some(BitstreamGenerator::new(&bias.clone().into_dyn(), config.mode, sequence))
      }
      None => None,
    };

    let entries = config.entries() as f64;
    let bound = config.scale.unwrap_or(entries);
    let offset = match config.mode {
      Mode::Unipolar => 0.,
      Mode::Bipolar => (entries - 1.) / 2.,
    };
    log::debug!(
      "linear {} → {}: {} mode, {}-bit {} weights ({} coded), bound {bound}, offset {offset}",
      config.in_features, config.out_features, config.mode, config.bitwidth, config.rng,
      config.weight_coding,
    );

    Ok(Self {
      acc: Accumulator::new(config.scaled),
      config,
      weight,
      bias,
      weight_bsg,
      index,
      index_inv,
      bias_bsg,
      bias_index: 0,
      bound,
      offset,
    })
  }

  pub fn config(&self) -> &LinearConfig {
    &self.config
  }

  pub fn weight(&self) -> &Array2<f64> {
    &self.weight
  }

  pub fn bias(&self) -> Option<&Array1<f64>> {
    self.bias.as_ref()
  }

  pub fn accumulator(&self) -> &Accumulator {
    &self.acc
  }

  /// The weight counters of the first pass.
  pub fn index(&self) -> &ArrayD<usize> {
    self.index.get()
  }

  pub fn bound(&self) -> f64 {
    self.bound
  }

  pub fn offset(&self) -> f64 {
    self.offset
  }

  /// Checks all per-lane state against an input of `batch` rows.
  fn check(&self, batch: usize) -> Result<()> {
    let shape = [batch, self.config.out_features, self.config.in_features];
    self.index.check(&shape)?;
    if let Some(index_inv) = &self.index_inv {
      index_inv.check(&shape)?;
    }
    self.acc.check(&[batch, self.config.out_features])
  }

  /// One cycle of the parallel counter: for every batch lane and output neuron, the number of
  /// 1s among the input/weight products and the bias bit, as a `(batch, out_features)` tensor.
  ///
  /// This advances the weight and bias counters but not the accumulator.
  pub fn step_pc(&mut self, input: &ArrayD<u8>) -> Result<ArrayD<f64>> {
    let batch = batch_of(input.shape(), self.config.in_features)?;
    self.check(batch)?;
    self.count(input, batch)
  }

  /// One cycle of the whole layer: the output bits, as a `(batch, out_features)` tensor.
  pub fn step(&mut self, input: &ArrayD<u8>) -> Result<ArrayD<u8>> {
    let batch = batch_of(input.shape(), self.config.in_features)?;
    self.check(batch)?;
    let count = self.count(input, batch)?;
    self.acc.step(&count, self.bound, self.offset)
  }

  fn count(&mut self, input: &ArrayD<u8>, batch: usize) -> Result<ArrayD<f64>> {
    let shape = [batch, self.config.out_features, self.config.in_features];
    let period = self.weight_bsg.sequence().period();
    // (batch, 1, in), to broadcast against the weights.
    let x = input.view().insert_axis(Axis(1));
    let xf = x.mapv(f64::from);

    let index = self.index.fit(&shape)?;
    let wbits = self.weight_bsg.generate(index)?.mapv(f64::from);
    let mut count = (&wbits * &xf).sum_axis(Axis(2));
    match self.config.weight_coding {
      Coding::Rate => {
        Zip::from(index).and_broadcast(&x).for_each(|c, &b| *c = (*c + usize::from(b)) % period);
      }
      Coding::Temporal => index.mapv_inplace(|c| (c + 1) % period),
    }

    if let Some(bias_bsg) = &self.bias_bsg {
      let bbits = bias_bsg.generate(&ndarray::arr0(self.bias_index).into_dyn())?;
      count += &bbits.mapv(f64::from);
      self.bias_index = (self.bias_index + 1) % bias_bsg.sequence().period();
    }

    if self.config.mode == Mode::Bipolar {
      let xf_inv = xf.mapv(|b| 1. - b);
      let wbits_inv = match &mut self.index_inv {
        Some(index_inv) => {
          let index_inv = index_inv.fit(&shape)?;
          let wbits_inv = self.weight_bsg.generate(index_inv)?.mapv(|b| 1. - f64::from(b));
          Zip::from(index_inv).and_broadcast(&x).for_each(|c, &b| *c = (*c + usize::from(1 - b)) % period);
          wbits_inv
        }
        None => wbits.mapv(|b| 1. - b),
      };
      count += &(&wbits_inv * &xf_inv).sum_axis(Axis(2));
    }
    Ok(count)
  }
}
