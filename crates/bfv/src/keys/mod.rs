//! Key-switching, relinearization, and Galois (rotation) keys.

mod evaluation_key;
mod galois_key;
mod key_switching;

pub use evaluation_key::{EvaluationKey, EvaluationKeyBuilder};
pub use galois_key::{GaloisKey, GaloisKeyBuilder};
pub(crate) use key_switching::{KeySwitchingKey, MAX_DBC};

/// A Galois automorphism `X -> X^k`, `k` odd, `k < 2N`. Rotations of the
/// batched SIMD slots and the row/column swap are both special cases.
pub type GaloisElement = u64;

/// `X -> X^{2N-1}`, the automorphism implementing `rotate_columns` (the
/// row swap) for a batched plaintext.
pub fn galois_element_for_column_rotation(degree: usize) -> GaloisElement {
	(2 * degree - 1) as u64
}

/// `X -> X^{3^k mod 2N}`, the automorphism implementing a `rotate_rows` by
/// `k` slots within a batched plaintext's row.
pub fn galois_element_for_row_rotation(degree: usize, steps: i64) -> GaloisElement {
	let m = 2 * degree as u64;
	let row_size = (degree / 2) as i64;
	let steps = steps.rem_euclid(row_size as i64);
	let mut g = 1u64;
	for _ in 0..steps {
		g = (g * 3) % m;
	}
	g
}
