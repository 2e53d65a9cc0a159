//! Index sequences: the source of the per-cycle comparison values that turn a static level into
//! a bitstream.
//!
//! A [`Sequence`] of width `w` has period `P = 2^w` and yields integers in `0 .. P`. The kinds
//! built into this crate all yield a *permutation* of `0 .. P`, so that a level `l` compared
//! against one full period produces exactly `l` ones; this is what makes bitstreams converge.
//! Anything else honouring the `0 .. P` range contract can be plugged in through
//! [`Sequence::from_values`] or a custom [`SequenceSource`].

use crate::{Error, Result};
use core::fmt;
use core::str::FromStr;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Low-discrepancy (Sobol) sequences.
mod sobol;

/// Maximal-length linear feedback shift registers.
mod lfsr;

/// Widest supported sequence; the whole period is materialised in memory.
pub const MAX_BITWIDTH: u32 = 24;

/// Which generator produces a [`Sequence`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SequenceKind {
  /// Gray-code Sobol sequence. Dimension 1 is the bit-reversal (van der Corput) sequence.
  #[default]
  Sobol,
  /// Fibonacci LFSR over all non-zero states, preceded by `0`. The dimension picks the seed.
  Lfsr,
  /// The ramp `0, 1, .., P-1`. Streams compared against it are temporally (thermometer) coded.
  Race,
  /// A uniformly random permutation, seeded by the dimension.
  Random,
}

impl FromStr for SequenceKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "sobol" => Ok(Self::Sobol),
      "lfsr" => Ok(Self::Lfsr),
      "race" | "tc" => Ok(Self::Race),
      "random" => Ok(Self::Random),
      other => Err(Error::config(format!(
        "rng must be one of [\"sobol\", \"lfsr\", \"race\", \"random\"], got {other:?}"
      ))),
    }
  }
}

impl fmt::Display for SequenceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Sobol => "sobol",
      Self::Lfsr => "lfsr",
      Self::Race => "race",
      Self::Random => "random",
    })
  }
}

/// Anything that can produce index sequences on demand.
///
/// Implementations must be deterministic: two calls with the same arguments give identical
/// sequences, so that two components built from the same configuration produce identical
/// streams.
pub trait SequenceSource {
  /// The sequence of width `bitwidth` for dimension `dim` (dimensions start at 1).
  fn sequence(&self, bitwidth: u32, dim: usize) -> Result<Sequence>;

  /// `lanes` sequences, lane `i` drawing from dimension `dim + i`.
  fn lanes(&self, bitwidth: u32, lanes: usize, dim: usize) -> Result<Vec<Sequence>> {
    (0 .. lanes).map(|i| self.sequence(bitwidth, dim + i)).collect()
  }
}

impl SequenceSource for SequenceKind {
  fn sequence(&self, bitwidth: u32, dim: usize) -> Result<Sequence> {
    check_bitwidth(bitwidth)?;
    let values = match self {
      Self::Sobol => sobol::sequence(bitwidth, dim)?,
      Self::Lfsr => lfsr::sequence(bitwidth, dim),
      Self::Race => (0 .. 1u32 << bitwidth).collect(),
      Self::Random => {
        let mut values: Vec<u32> = (0 .. 1u32 << bitwidth).collect();
        values.shuffle(&mut StdRng::seed_from_u64(dim as u64));
        values
      }
    };
    Ok(Sequence { bitwidth, values })
  }
}

fn check_bitwidth(bitwidth: u32) -> Result<()> {
  if (1 ..= MAX_BITWIDTH).contains(&bitwidth) {
    Ok(())
  } else {
    Err(Error::config(format!("bitwidth must be in 1..={MAX_BITWIDTH}, got {bitwidth}")))
  }
}

/// One full period of an index sequence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sequence {
  bitwidth: u32,
  values: Vec<u32>,
}

impl Sequence {
  /// Build the sequence of `kind` with width `bitwidth`, for dimension `dim`.
  ///
  /// # Example
  ///
  /// ```
  /// # use unary_arith::{Sequence, SequenceKind};
  /// let seq = Sequence::new(SequenceKind::Sobol, 2, 1).unwrap();
  /// assert_eq!(seq.values(), &[0, 2, 3, 1]);
  /// ```
  pub fn new(kind: SequenceKind, bitwidth: u32, dim: usize) -> Result<Self> {
    kind.sequence(bitwidth, dim)
  }

  /// One sequence per lane, lane `i` using dimension `dim + i`.
  pub fn lanes(kind: SequenceKind, bitwidth: u32, lanes: usize, dim: usize) -> Result<Vec<Self>> {
    kind.lanes(bitwidth, lanes, dim)
  }

  /// Wrap an externally produced period. `values` must have exactly `2^bitwidth` entries, all
  /// in `0 .. 2^bitwidth`.
  pub fn from_values(bitwidth: u32, values: Vec<u32>) -> Result<Self> {
    check_bitwidth(bitwidth)?;
    let period = 1usize << bitwidth;
    if values.len() != period {
      return Err(Error::config(format!(
        "a {bitwidth}-bit sequence has period {period}, got {} values", values.len()
      )))
    }
    if let Some(bad) = values.iter().find(|&&v| v as usize >= period) {
      return Err(Error::config(format!("sequence value {bad} out of range 0..{period}")))
    }
    Ok(Self { bitwidth, values })
  }

  pub fn bitwidth(&self) -> u32 {
    self.bitwidth
  }

  /// The period `P = 2^bitwidth`.
  pub fn period(&self) -> usize {
    self.values.len()
  }

  pub fn values(&self) -> &[u32] {
    &self.values
  }

  /// The value at position `index`, wrapping around the period.
  #[inline]
  pub fn get(&self, index: usize) -> u32 {
    self.values[index % self.values.len()]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn is_permutation(seq: &Sequence) -> bool {
    let mut seen = vec![false; seq.period()];
    for &v in seq.values() {
      if core::mem::replace(&mut seen[v as usize], true) {
        return false
      }
    }
    seen.into_iter().all(|s| s)
  }

  #[test]
  fn all_kinds_are_permutations() {
    for kind in [SequenceKind::Sobol, SequenceKind::Lfsr, SequenceKind::Race, SequenceKind::Random] {
      for bitwidth in 1 ..= 10 {
        for dim in 1 ..= 4 {
          let seq = Sequence::new(kind, bitwidth, dim).unwrap();
          assert_eq!(seq.period(), 1 << bitwidth);
          assert!(is_permutation(&seq), "{kind} w={bitwidth} dim={dim}: {:?}", seq.values());
        }
      }
    }
  }

  #[test]
  fn deterministic() {
    for kind in [SequenceKind::Sobol, SequenceKind::Lfsr, SequenceKind::Random] {
      assert_eq!(Sequence::new(kind, 8, 3), Sequence::new(kind, 8, 3));
    }
    assert_ne!(
      Sequence::new(SequenceKind::Random, 8, 1),
      Sequence::new(SequenceKind::Random, 8, 2),
    );
  }

  #[test]
  fn race_is_ramp() {
    let seq = Sequence::new(SequenceKind::Race, 3, 1).unwrap();
    assert_eq!(seq.values(), &[0, 1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(seq.get(9), 1);
  }

  #[test]
  fn lanes() {
    let lanes = SequenceKind::Sobol.lanes(4, 3, 1).unwrap();
    assert_eq!(lanes.len(), 3);
    assert_eq!(lanes[1], Sequence::new(SequenceKind::Sobol, 4, 2).unwrap());
    assert_eq!(Sequence::lanes(SequenceKind::Sobol, 4, 3, 1).unwrap(), lanes);
  }

  #[test]
  fn bad_config() {
    assert!(Sequence::new(SequenceKind::Sobol, 0, 1).is_err());
    assert!(Sequence::new(SequenceKind::Sobol, MAX_BITWIDTH + 1, 1).is_err());
    assert!(Sequence::from_values(2, vec![0, 1, 2]).is_err());
    assert!(Sequence::from_values(2, vec![0, 1, 2, 4]).is_err());
    assert!(Sequence::from_values(2, vec![3, 3, 3, 3]).is_ok());
    assert!("halton".parse::<SequenceKind>().is_err());
    assert_eq!("TC".parse::<SequenceKind>(), Ok(SequenceKind::Race));
  }
}
