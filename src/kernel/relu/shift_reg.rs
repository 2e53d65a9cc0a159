use super::*;

/// A per-lane ring buffer holding the last `depth` bits pushed, with a running population count.
///
/// The count is maintained incrementally (add the incoming bit, subtract the evicted one), and
/// always equals the number of 1s currently held. A fresh register holds `depth` zeros.
#[derive(Clone, Debug)]
pub struct ShiftRegister {
  slots: Vec<Lanes<u8>>,
  count: Lanes<u32>,
  head: usize,
}

impl ShiftRegister {
  pub fn new(depth: usize) -> Result<Self> {
    if depth == 0 {
      return Err(Error::config("shift register depth must be at least 1"))
    }
    Ok(Self {
      slots: vec![Lanes::filled(&[], 0); depth],
      count: Lanes::filled(&[], 0),
      head: 0,
    })
  }

  pub fn depth(&self) -> usize {
    self.slots.len()
  }

  /// The number of 1s held, per lane.
  pub fn count(&self) -> &ArrayD<u32> {
    self.count.get()
  }

  pub(crate) fn check(&self, shape: &[usize]) -> Result<()> {
    self.count.check(shape)?;
    self.slots.iter().try_for_each(|slot| slot.check(shape))
  }

  /// Shift `bits` in, evicting the oldest bit of every lane, and return the new counts.
  pub fn push(&mut self, bits: &ArrayD<u8>) -> Result<&ArrayD<u32>> {
    let shape = bits.shape();
    self.check(shape)?;
    let oldest = self.slots[self.head].fit(shape)?;
    let count = self.count.fit(shape)?;
    Zip::from(&mut *count).and(&*oldest).and(bits).for_each(|c, &old, &new| {
      *c = *c + u32::from(new & 1) - u32::from(old);
    });
    Zip::from(oldest).and(bits).for_each(|old, &new| *old = new & 1);
    self.head = (self.head + 1) % self.slots.len();
    Ok(self.count.get())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::array;
  use proptest::prelude::*;

  #[test]
  fn evicts_after_depth() {
    let mut reg = ShiftRegister::new(3).unwrap();
    assert_eq!(reg.push(&array![1, 0].into_dyn()).unwrap(), &array![1, 0].into_dyn());
    assert_eq!(reg.push(&array![1, 1].into_dyn()).unwrap(), &array![2, 1].into_dyn());
    assert_eq!(reg.push(&array![0, 1].into_dyn()).unwrap(), &array![2, 2].into_dyn());
    // The first push falls out.
    assert_eq!(reg.push(&array![0, 0].into_dyn()).unwrap(), &array![1, 2].into_dyn());
  }

  #[test]
  fn zero_depth() {
    assert!(matches!(ShiftRegister::new(0), Err(Error::Config(_))));
  }

  proptest!{
    #![proptest_config(ProptestConfig::with_cases(crate::PROPTEST_CASES))]
    /// The count always equals the number of 1s among the last `depth` bits pushed.
    #[test]
    fn count_is_population(depth in 1 .. 10usize, history in crate::test::bit_history(1 .. 4, 1 .. 40)) {
      let mut reg = ShiftRegister::new(depth).unwrap();
      for (t, bits) in history.iter().enumerate() {
        let count = reg.push(bits).unwrap().clone();
        let window = &history[(t + 1).saturating_sub(depth) ..= t];
        for lane in 0 .. bits.len() {
          let ones: u32 = window.iter().map(|h| u32::from(h[[lane]])).sum();
          prop_assert_eq!(count[[lane]], ones);
        }
      }
    }
  }
}
