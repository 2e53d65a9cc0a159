use super::*;

/// Gate-level stochastic multiplier: AND for unipolar streams, XNOR for bipolar ones.
///
/// Accurate only when the two input streams are uncorrelated.
#[derive(Clone, Copy, Debug)]
pub struct GainesMul {
  mode: Mode,
  gate: fn(u8, u8) -> u8,
}

impl GainesMul {
  pub fn new(mode: Mode) -> Self {
    let gate: fn(u8, u8) -> u8 = match mode {
      Mode::Unipolar => |a, b| a & b,
      Mode::Bipolar => |a, b| 1 - (a ^ b),
    };
    Self { mode, gate }
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  /// The product bits of one cycle. `a` and `b` are broadcast against each other.
  ///
  /// # Example
  ///
  /// ```
  /// # use unary_arith::{GainesMul, Mode};
  /// # use ndarray::array;
  /// let mul = GainesMul::new(Mode::Bipolar);
  /// let out = mul.step(&array![1, 1, 0, 0].into_dyn(), &array![1, 0, 1, 0].into_dyn()).unwrap();
  /// assert_eq!(out, array![1, 0, 0, 1].into_dyn());
  /// ```
  pub fn step(&self, a: &ArrayD<u8>, b: &ArrayD<u8>) -> Result<ArrayD<u8>> {
    let shape = broadcast_shape(a.shape(), b.shape())
      .ok_or_else(|| Error::shape(a.shape(), b.shape()))?;
    let gate = self.gate;
    Ok(Zip::from(broadcast_to(a, &shape)?)
      .and(broadcast_to(b, &shape)?)
      .map_collect(|&a, &b| gate(a & 1, b & 1)))
  }
}

/// Configuration of a [`StaticMul`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MulConfig {
  /// Width of the index sequence; the static operand is quantised to `2^bitwidth` levels.
  pub bitwidth: u32,
  pub mode: Mode,
  /// Whether the second operand is a static magnitude. Only `true` is supported.
  pub static_mode: bool,
  pub rng: SequenceKind,
  pub dim: usize,
}

impl MulConfig {
  pub fn new(bitwidth: u32, mode: Mode) -> Self {
    Self {
      bitwidth,
      mode,
      static_mode: true,
      rng: SequenceKind::Sobol,
      dim: 1,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if !self.static_mode {
      return Err(Error::config("in-stream (non-static) multiplication is not supported"))
    }
    Ok(())
  }
}

/// Multiplier of a live stream by a static magnitude.
///
/// The static operand is regenerated every cycle from its own bitstream generator, whose counter
/// is *enabled only on cycles where the live bit is 1*. The product stream therefore contains,
/// over any window, as many 1s as the static operand's stream has among its first `k` bits,
/// where `k` is the number of 1s on the live input: this is conditional sampling, and realises
/// `P(a) · P(b)` without needing the two streams to be uncorrelated.
///
/// In bipolar mode a second counter samples the *complement* of the static operand on cycles
/// where the live bit is 0, and the two paths are ORed (they are never both active).
#[derive(Clone, Debug)]
pub struct StaticMul {
  config: MulConfig,
  bsg: BitstreamGenerator,
  index: Lanes<usize>,
  index_inv: Option<Lanes<usize>>,
}

impl StaticMul {
  /// `magnitude` is the static operand; the live operand's shape must broadcast against it.
  pub fn new(config: MulConfig, magnitude: &ArrayD<f64>) -> Result<Self> {
    config.validate()?;
    let sequence = Sequence::new(config.rng, config.bitwidth, config.dim)?;
    let bsg = BitstreamGenerator::new(magnitude, config.mode, sequence);
    let index = Lanes::filled(magnitude.shape(), 0);
    let index_inv = match config.mode {
      Mode::Unipolar => None,
      Mode::Bipolar => Some(index.clone()),
    };
    log::debug!(
      "static multiplier: {} mode, {}-bit {} sequence, operand shape {:?}",
      config.mode, config.bitwidth, config.rng, magnitude.shape(),
    );
    Ok(Self { config, bsg, index, index_inv })
  }

  pub fn config(&self) -> &MulConfig {
    &self.config
  }

  /// The counter of the direct path (advanced on live 1s).
  pub fn index(&self) -> &ArrayD<usize> {
    self.index.get()
  }

  /// The product bits of one cycle.
  pub fn step(&mut self, input: &ArrayD<u8>) -> Result<ArrayD<u8>> {
    let shape = broadcast_shape(self.bsg.shape(), input.shape())
      .ok_or_else(|| Error::shape(self.bsg.shape(), input.shape()))?;
    let input = broadcast_to(input, &shape)?;
    self.index.check(&shape)?;
    if let Some(index_inv) = &self.index_inv {
      index_inv.check(&shape)?;
    }

    let period = self.bsg.sequence().period();
    let index = self.index.fit(&shape)?;
    let bits = self.bsg.generate(index)?;
    let mut output = Zip::from(&input).and(&bits).map_collect(|&x, &w| x & w);
    Zip::from(index).and(&input).for_each(|c, &x| *c = (*c + usize::from(x)) % period);

    if let Some(index_inv) = &mut self.index_inv {
      let index_inv = index_inv.fit(&shape)?;
      let bits_inv = self.bsg.generate(index_inv)?;
      Zip::from(&mut output).and(&input).and(&bits_inv).for_each(|o, &x, &w| {
        *o |= (1 - x) & (1 - w);
      });
      Zip::from(index_inv).and(&input).for_each(|c, &x| *c = (*c + usize::from(1 - x)) % period);
    }
    Ok(output)
  }
}
