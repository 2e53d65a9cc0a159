use super::*;

/// Primitive polynomial degree `s`, coefficients `a` and initial direction integers `m` for Sobol
/// dimensions 2, 3, .. (Joe & Kuo). Dimension 1 is special-cased.
const DIRECTIONS: [(u32, u32, &[u32]); 20] = [
  (1, 0, &[1]),
  (2, 1, &[1, 3]),
  (3, 1, &[1, 3, 1]),
  (3, 2, &[1, 1, 1]),
  (4, 1, &[1, 1, 3, 3]),
  (4, 4, &[1, 3, 5, 13]),
  (5, 2, &[1, 1, 5, 5, 17]),
  (5, 4, &[1, 1, 5, 5, 5]),
  (5, 7, &[1, 1, 7, 11, 19]),
  (5, 11, &[1, 1, 5, 1, 1]),
  (5, 13, &[1, 1, 1, 3, 11]),
  (5, 14, &[1, 3, 5, 5, 31]),
  (6, 1, &[1, 3, 3, 9, 7, 49]),
  (6, 13, &[1, 1, 1, 15, 21, 21]),
  (6, 16, &[1, 3, 1, 13, 27, 49]),
  (6, 19, &[1, 1, 1, 15, 7, 5]),
  (6, 22, &[1, 3, 1, 15, 13, 25]),
  (6, 25, &[1, 1, 5, 5, 19, 61]),
  (7, 1, &[1, 3, 7, 11, 23, 15, 103]),
  (7, 4, &[1, 3, 7, 13, 13, 15, 69]),
];

/// The highest Sobol dimension available.
pub const MAX_DIM: usize = DIRECTIONS.len() + 1;

/// Direction numbers `v[0..w]` for `dim`, aligned to `w` bits (i.e. `v[k-1] = m_k << (w - k)`).
fn directions(bitwidth: u32, dim: usize) -> Result<Vec<u32>> {
  let w = bitwidth as usize;
  if dim == 1 {
    return Ok((1 ..= w).map(|k| 1 << (w - k)).collect())
  }
  let Some(&(s, a, m)) = dim.checked_sub(2).and_then(|i| DIRECTIONS.get(i)) else {
    return Err(Error::config(format!("sobol dimension must be in 1..={MAX_DIM}, got {dim}")))
  };
  let s = s as usize;
  let mut v = Vec::with_capacity(w);
  for k in 1 ..= w {
    let vk = if k <= s {
      m[k - 1] << (w - k)
    } else {
      // v_k = v_{k-s} ^ (v_{k-s} >> s) ^ a_1 v_{k-1} ^ .. ^ a_{s-1} v_{k-s+1}
      let mut vk = v[k - s - 1] ^ (v[k - s - 1] >> s);
      for i in 1 .. s {
        if (a >> (s - 1 - i)) & 1 == 1 {
          vk ^= v[k - i - 1];
        }
      }
      vk
    };
    v.push(vk);
  }
  Ok(v)
}

/// One period of the Sobol sequence in Gray-code order, starting from 0.
pub(super) fn sequence(bitwidth: u32, dim: usize) -> Result<Vec<u32>> {
  let v = directions(bitwidth, dim)?;
  let period = 1usize << bitwidth;
  let mut values = Vec::with_capacity(period);
  let mut x = 0u32;
  values.push(x);
  for n in 1 .. period {
    // Flip the direction number indexed by the rightmost zero bit of n - 1.
    x ^= v[(n - 1).trailing_ones() as usize];
    values.push(x);
  }
  Ok(values)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn van_der_corput() {
    assert_eq!(sequence(3, 1).unwrap(), [0, 4, 6, 2, 3, 7, 5, 1]);
  }

  #[test]
  fn second_dimension() {
    // Reference points 0, 0.5, 0.25, 0.75, 0.375, 0.875, 0.125, 0.625 scaled to 3 bits.
    assert_eq!(sequence(3, 2).unwrap(), [0, 4, 2, 6, 3, 7, 1, 5]);
  }

  #[test]
  fn every_dimension_is_a_permutation() {
    for dim in 1 ..= MAX_DIM {
      let mut values = sequence(8, dim).unwrap();
      values.sort_unstable();
      assert!(values.iter().copied().eq(0 .. 256), "dim {dim}");
    }
  }

  #[test]
  fn dimension_out_of_range() {
    assert!(sequence(4, 0).is_err());
    assert!(sequence(4, MAX_DIM).is_ok());
    assert!(sequence(4, MAX_DIM + 1).is_err());
  }
}
