/// Feedback taps (1-based bit positions) of a maximal-length LFSR, for each width `1 ..= 24`.
const TAPS: [&[u32]; 24] = [
  &[1],
  &[2, 1],
  &[3, 2],
  &[4, 3],
  &[5, 3],
  &[6, 5],
  &[7, 6],
  &[8, 6, 5, 4],
  &[9, 5],
  &[10, 7],
  &[11, 9],
  &[12, 6, 4, 1],
  &[13, 4, 3, 1],
  &[14, 5, 3, 1],
  &[15, 14],
  &[16, 15, 13, 4],
  &[17, 14],
  &[18, 11],
  &[19, 6, 2, 1],
  &[20, 17],
  &[21, 19],
  &[22, 21],
  &[23, 18],
  &[24, 23, 22, 17],
];

/// `0`, followed by the `2^w - 1` non-zero states of the register in the order it visits them.
/// The register is seeded with state `dim mod (2^w - 1) + 1`.
///
/// `bitwidth` must already be validated to `1 ..= 24`.
pub(super) fn sequence(bitwidth: u32, dim: usize) -> Vec<u32> {
  let taps = TAPS[bitwidth as usize - 1];
  let mask = (1u32 << bitwidth) - 1;
  let states = mask as usize;
  let mut state = (dim % states) as u32 + 1;
  let mut values = Vec::with_capacity(states + 1);
  values.push(0);
  for _ in 0 .. states {
    values.push(state);
    let feedback = taps.iter().fold(0, |acc, &t| acc ^ (state >> (t - 1)) & 1);
    state = ((state << 1) | feedback) & mask;
  }
  values
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn maximal_length() {
    // Every width must cycle through all non-zero states before repeating.
    for bitwidth in 1 ..= 16 {
      let values = sequence(bitwidth, 1);
      let mut sorted = values.clone();
      sorted.sort_unstable();
      assert!(sorted.iter().copied().eq(0 .. 1 << bitwidth), "width {bitwidth}");
    }
  }

  #[test]
  fn seeded_by_dimension() {
    assert_eq!(sequence(4, 0)[1], 1);
    assert_eq!(sequence(4, 1)[1], 2);
    assert_eq!(sequence(4, 15)[1], 1);
  }
}
