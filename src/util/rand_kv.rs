use bytes::Bytes;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Deterministic, zero-padded test key: `"caskdb-key-000001234"`.
pub fn get_test_key(i: usize) -> Bytes {
  Bytes::from(format!("caskdb-key-{i:09}"))
}

/// A value deterministically derived from `len` (same `len` always yields
/// the same bytes, so callers can put and later assert-equal against a
/// fresh call with the same argument).
pub fn get_test_value(len: usize) -> Bytes {
  let mut rng = StdRng::seed_from_u64(len as u64);
  let value: String = (0..len)
    .map(|_| rng.sample(rand::distr::Alphanumeric) as char)
    .collect();
  Bytes::from(format!("caskdb-value-{value}"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keys_are_deterministic() {
    assert_eq!(get_test_key(1), get_test_key(1));
    assert_ne!(get_test_key(1), get_test_key(2));
  }

  #[test]
  fn values_have_expected_prefix() {
    let v = get_test_value(10);
    assert!(v.starts_with(b"caskdb-value-"));
  }
}
