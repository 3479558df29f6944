//! Parameter fingerprinting: every key, ciphertext and plaintext carries a
//! 256-bit digest of the parameter set it was built from, and every
//! multi-operand API rejects operands whose fingerprints disagree.

use sha2::{Digest, Sha256};

/// A `[u8; 32]` SHA-256 digest over the canonical little-endian encoding of
/// `(N, sorted qᵢ, t, σ as bits, σ_max as bits, rng-factory-id)`.
pub type Fingerprint = [u8; 32];

/// Computes the fingerprint of a parameter set from its canonical fields.
pub fn compute(
	degree: usize,
	ciphertext_moduli: &[u64],
	plaintext_modulus: u64,
	noise_std_dev: f64,
	noise_max_deviation: f64,
	rng_factory_id: u64,
) -> Fingerprint {
	let mut sorted_moduli = ciphertext_moduli.to_vec();
	sorted_moduli.sort_unstable();

	let mut hasher = Sha256::new();
	hasher.update((degree as u64).to_le_bytes());
	for q in &sorted_moduli {
		hasher.update(q.to_le_bytes());
	}
	hasher.update(plaintext_modulus.to_le_bytes());
	hasher.update(noise_std_dev.to_bits().to_le_bytes());
	hasher.update(noise_max_deviation.to_bits().to_le_bytes());
	hasher.update(rng_factory_id.to_le_bytes());

	let digest = hasher.finalize();
	let mut out = [0u8; 32];
	out.copy_from_slice(&digest);
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fingerprint_is_order_independent_in_moduli() {
		let a = compute(1024, &[1153, 4611686018326724609], 65537, 3.2, 6.0, 0);
		let b = compute(1024, &[4611686018326724609, 1153], 65537, 3.2, 6.0, 0);
		assert_eq!(a, b);
	}

	#[test]
	fn fingerprint_changes_with_degree() {
		let a = compute(1024, &[1153], 65537, 3.2, 6.0, 0);
		let b = compute(2048, &[1153], 65537, 3.2, 6.0, 0);
		assert_ne!(a, b);
	}
}
