//! Enumerated configuration options shared by all components.
//!
//! Every option can be parsed from (and printed as) the short string tag used to describe
//! hardware configurations, so that a configuration can be driven from text. Unknown tags are a
//! [`Error::Config`].

use crate::{Error, Result};
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Helper macro for implementing [`FromStr`] and [`Display`](fmt::Display) on a fieldless enum,
/// from a list of `Variant => "tag" | "alias"..` arms. The first tag is the canonical one.
macro_rules! mk_tags {
  ($ty:ident, $what:literal, $($variant:ident => $tag:literal $(| $alias:literal)*),+ $(,)?) => {
    impl FromStr for $ty {
      type Err = Error;

      fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
          $($tag $(| $alias)* => Ok(Self::$variant),)+
          other => Err(Error::config(format!(
            concat!($what, " must be one of {:?}, got {:?}"),
            [$($tag),+],
            other,
          ))),
        }
      }
    }

    impl fmt::Display for $ty {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { $(Self::$variant => $tag,)+ })
      }
    }
  }
}

/// How a bitstream encodes a value.
///
///   - **Unipolar**: `P(bit = 1) = v`, for `v ∈ [0, 1]`.
///   - **Bipolar**: `P(bit = 1) = (v + 1) / 2`, for `v ∈ [-1, 1]`; zero sits at probability ½.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
  Unipolar,
  #[default]
  Bipolar,
}

mk_tags!(Mode, "mode", Unipolar => "unipolar", Bipolar => "bipolar");

/// Whether a stream carries its value in the density of 1s (rate) or in the position of a single
/// transition (temporal, thermometer-style).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Coding {
  #[default]
  Rate,
  Temporal,
}

mk_tags!(Coding, "encode", Rate => "rc" | "rate", Temporal => "tc" | "temporal");

/// Rounding applied to `log2` of a tensor's largest magnitude when choosing a fixed-point shift.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Rounding {
  #[default]
  Round,
  Floor,
  Ceil,
}

mk_tags!(Rounding, "rounding", Round => "round", Floor => "floor", Ceil => "ceil");

impl Rounding {
  /// Round `x` to an integer. `Round` breaks ties to even.
  pub fn apply(self, x: f64) -> f64 {
    match self {
      Self::Round => x.round_ties_even(),
      Self::Floor => x.floor(),
      Self::Ceil => x.ceil(),
    }
  }
}

/// For a single total bit budget in the fixed-point layer: whose resolution is kept.
///
///   - **Input**: both operands get the full budget.
///   - **Output**: the budget is split so that the *product* fits in it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KeepRes {
  #[default]
  Input,
  Output,
}

mk_tags!(KeepRes, "keep_res", Input => "input", Output => "output");

/// When an odd budget is split ([`KeepRes::Output`]), which operand gets the extra bit.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MoreRes {
  #[default]
  Input,
  Weight,
}

mk_tags!(MoreRes, "more_res", Input => "input", Weight => "weight");

/// How a Gaines-style linear layer adds up its per-neuron products.
///
///   - **Gaines**: gate-style; a comparison of the product count against an index sequence when
///     scaled, an OR (unipolar) or a saturating up/down counter (bipolar) when not.
///   - **Unary**: the counter-based accumulator of the unary adder.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LinearAdder {
  #[default]
  Gaines,
  Unary,
}

mk_tags!(LinearAdder, "adder", Gaines => "gadd" | "gaines", Unary => "uadd" | "unary");

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse() {
    assert_eq!("Bipolar".parse::<Mode>(), Ok(Mode::Bipolar));
    assert_eq!("TC".parse::<Coding>(), Ok(Coding::Temporal));
    assert_eq!("rate".parse::<Coding>(), Ok(Coding::Rate));
    assert_eq!("ceil".parse::<Rounding>(), Ok(Rounding::Ceil));
    assert_eq!("weight".parse::<MoreRes>(), Ok(MoreRes::Weight));
    assert!(matches!("bias".parse::<MoreRes>(), Err(Error::Config(_))));
    assert!(matches!("both".parse::<KeepRes>(), Err(Error::Config(_))));
    assert!(matches!("ternary".parse::<Mode>(), Err(Error::Config(_))));
    assert_eq!("uADD".parse::<LinearAdder>(), Ok(LinearAdder::Unary));
    assert_eq!(LinearAdder::Gaines.to_string(), "gadd");
  }

  #[test]
  fn display_roundtrips() {
    for mode in [Mode::Unipolar, Mode::Bipolar] {
      assert_eq!(mode.to_string().parse::<Mode>(), Ok(mode));
    }
    assert_eq!(Coding::Temporal.to_string(), "tc");
  }

  #[test]
  fn rounding() {
    assert_eq!(Rounding::Round.apply(2.5), 2.);
    assert_eq!(Rounding::Round.apply(3.5), 4.);
    assert_eq!(Rounding::Floor.apply(-0.5), -1.);
    assert_eq!(Rounding::Ceil.apply(0.1), 1.);
  }
}
