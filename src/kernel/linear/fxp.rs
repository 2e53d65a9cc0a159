use super::*;

/// Bit budget of a [`FxpLinear`] layer, sign bits included.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FxpWidth {
  /// A single budget, split between input and weight according to [`KeepRes`] and [`MoreRes`].
  Total(u32),
  /// Explicit `(input, weight)` widths.
  Split(u32, u32),
}

impl Default for FxpWidth {
  fn default() -> Self {
    Self::Total(8)
  }
}

/// Configuration of a [`FxpLinear`] layer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FxpConfig {
  pub in_features: usize,
  pub out_features: usize,
  pub bias: bool,
  pub width: FxpWidth,
  pub keep_res: KeepRes,
  pub more_res: MoreRes,
  pub rounding: Rounding,
  pub seed: u64,
}

impl FxpConfig {
  pub fn new(in_features: usize, out_features: usize) -> Self {
    Self {
      in_features,
      out_features,
      bias: true,
      width: FxpWidth::default(),
      keep_res: KeepRes::Input,
      more_res: MoreRes::Input,
      rounding: Rounding::Round,
      seed: 0,
    }
  }

  /// Magnitude bits (width minus the sign) of the input and of the weight.
  ///
  /// With a [`FxpWidth::Total`] budget `n`, [`KeepRes::Input`] gives both operands `n` bits;
  /// [`KeepRes::Output`] splits `n` between them, the odd bit going to [`MoreRes`].
  ///
  /// # Example
  ///
  /// ```
  /// # use unary_arith::{FxpConfig, FxpWidth, KeepRes, MoreRes};
  /// let mut config = FxpConfig::new(4, 4);
  /// config.width = FxpWidth::Total(9);
  /// config.keep_res = KeepRes::Output;
  /// config.more_res = MoreRes::Weight;
  /// assert_eq!(config.magnitude_bits().unwrap(), (3, 4));
  /// ```
  pub fn magnitude_bits(&self) -> Result<(u32, u32)> {
    let (input, weight) = match (self.width, self.keep_res, self.more_res) {
      (FxpWidth::Split(input, weight), _, _) => (input, weight),
      (FxpWidth::Total(n), KeepRes::Input, _) => (n, n),
      (FxpWidth::Total(n), KeepRes::Output, _) if n % 2 == 0 => (n / 2, n / 2),
      (FxpWidth::Total(n), KeepRes::Output, MoreRes::Input) => ((n + 1) / 2, n / 2),
      (FxpWidth::Total(n), KeepRes::Output, MoreRes::Weight) => (n / 2, (n + 1) / 2),
    };
    match (input.checked_sub(1), weight.checked_sub(1)) {
      (Some(input), Some(weight)) if input <= 52 && weight <= 52 => Ok((input, weight)),
      _ => Err(Error::config(format!(
        "fixed-point widths ({input}, {weight}) leave no room for a sign bit, or exceed 53 bits"
      ))),
    }
  }

  pub fn validate(&self) -> Result<()> {
    self.magnitude_bits().map(|_| ())
  }
}

/// Fully-connected layer computing a plain fixed-point multiply-accumulate.
///
/// The input and the weight are scaled by power-of-two shifts so that their largest magnitudes
/// land near the top of their bit budgets, rounded to integers (ties to even) and saturated, then
/// multiplied exactly and scaled back. The shifts are chosen on the first forward pass and reused
/// afterwards.
#[derive(Clone, Debug)]
pub struct FxpLinear {
  config: FxpConfig,
  weight: Array2<f64>,
  bias: Option<Array1<f64>>,
  bits: (u32, u32),
  shifts: Option<Shifts>,
}

impl FxpLinear {
  pub fn new(config: FxpConfig, weight: Option<Array2<f64>>, bias: Option<Array1<f64>>) -> Result<Self> {
    let bits = config.magnitude_bits()?;
    let (weight, bias) = init_params(
      config.in_features,
      config.out_features,
      config.bias,
      config.seed,
      weight,
      bias,
    )?;
    log::debug!(
      "fxp linear {} → {}: {:?} magnitude bits (input, weight), {} rounding",
      config.in_features, config.out_features, bits, config.rounding,
    );
    Ok(Self { config, weight, bias, bits, shifts: None })
  }

  pub fn config(&self) -> &FxpConfig {
    &self.config
  }

  pub fn weight(&self) -> &Array2<f64> {
    &self.weight
  }

  pub fn bias(&self) -> Option<&Array1<f64>> {
    self.bias.as_ref()
  }

  /// Magnitude bits of the input and of the weight.
  pub fn bits(&self) -> (u32, u32) {
    self.bits
  }

  /// The latched shifts, once the first forward pass has run.
  pub fn shifts(&self) -> Option<Shifts> {
    self.shifts
  }

  /// The layer output for a real-valued `(batch, in_features)` input.
  pub fn forward(&mut self, input: &Array2<f64>) -> Result<Array2<f64>> {
    batch_of(input.shape(), self.config.in_features)?;
    let (input_bits, weight_bits) = self.bits;
    let shifts = match self.shifts {
      Some(shifts) => shifts,
      None => {
        let input_shift = max_exponent(input, self.config.rounding) - f64::from(input_bits);
        let weight_shift = max_exponent(&self.weight, self.config.rounding) - f64::from(weight_bits);
        let shifts = Shifts {
          input: input_shift,
          weight: weight_shift,
          output: -input_shift - weight_shift,
        };
        log::trace!("fxp shifts latched: {shifts:?}");
        self.shifts = Some(shifts);
        shifts
      }
    };
    let qx = input.mapv(|v| quantise(v, shifts.input, input_bits));
    let qw = self.weight.mapv(|v| quantise(v, shifts.weight, weight_bits));
    let output = qx.dot(&qw.t()) / shifts.output.exp2();
    Ok(add_bias(output, self.bias.as_ref()))
  }

  /// Straight-through gradients for `grad_output`, given the `input` of the forward pass.
  pub fn backward(&self, grad_output: &Array2<f64>, input: &Array2<f64>) -> Result<LinearGrad> {
    linear_grad(grad_output, input, &self.weight, self.bias.is_some())
  }
}

/// `v / 2^shift`, rounded to an integer (ties to even) and saturated to `bits` magnitude bits plus
/// sign.
fn quantise(v: f64, shift: f64, bits: u32) -> f64 {
  let max = f64::from(bits).exp2();
  (v / shift.exp2()).round_ties_even().clamp(-max, max - 1.)
}
