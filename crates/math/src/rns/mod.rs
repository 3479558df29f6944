//! CRT reconstruction and Garner's formula over a set of coprime primes.

use crate::errors::{Error, Result};
use crate::zq::Modulus;
use num_bigint::BigUint;
use num_traits::One;

/// A CRT (Chinese Remainder Theorem) context over a fixed set of coprime
/// primes `{q_0, ..., q_{k-1}}`.
///
/// Caches the product `Q = prod(q_i)` and, for each `i`, the Garner
/// coefficient `garner[i] = (Q / q_i) * ((Q / q_i)^{-1} mod q_i)`, reduced
/// modulo `Q`. Reconstructing an integer from its residues is then
/// `sum_i garner[i] * x_i mod Q`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RnsContext {
	moduli_u64: Vec<u64>,
	moduli: Vec<Modulus>,
	product: BigUint,
	garner: Vec<BigUint>,
}

impl RnsContext {
	/// Builds an RNS context from a list of distinct primes.
	pub fn new(moduli: &[u64]) -> Result<Self> {
		if moduli.is_empty() {
			return Err(Error::OutOfRange("RNS basis must be non-empty".to_string()));
		}
		let moduli_typed = moduli
			.iter()
			.map(|&m| Modulus::new(m))
			.collect::<Result<Vec<_>>>()?;

		let product = moduli
			.iter()
			.fold(BigUint::one(), |acc, &m| acc * BigUint::from(m));

		let mut garner = Vec::with_capacity(moduli.len());
		for (i, &qi) in moduli.iter().enumerate() {
			let qi_big = BigUint::from(qi);
			let q_hat = &product / &qi_big;
			let q_hat_mod_qi = (&q_hat % &qi_big)
				.to_u64_digits()
				.first()
				.copied()
				.unwrap_or(0);
			let inv = moduli_typed[i]
				.inv(q_hat_mod_qi)
				.ok_or_else(|| Error::OutOfRange("RNS moduli must be pairwise coprime".to_string()))?;
			garner.push((q_hat * BigUint::from(inv)) % &product);
		}

		Ok(Self {
			moduli_u64: moduli.to_vec(),
			moduli: moduli_typed,
			product,
			garner,
		})
	}

	/// The primes this context was built from.
	pub fn moduli(&self) -> &[u64] {
		&self.moduli_u64
	}

	/// The product `Q = prod(q_i)`.
	pub fn modulus(&self) -> &BigUint {
		&self.product
	}

	/// The `i`-th Garner coefficient, `(Q/q_i) * ((Q/q_i)^{-1} mod q_i) mod Q`.
	pub fn garner(&self, i: usize) -> &BigUint {
		&self.garner[i]
	}

	/// Reconstructs the unique integer in `[0, Q)` congruent to `residues[i]`
	/// modulo `q_i` for every `i`.
	pub fn lift(&self, residues: &[u64]) -> BigUint {
		debug_assert_eq!(residues.len(), self.garner.len());
		let mut acc = BigUint::from(0u64);
		for (garner_i, &xi) in self.garner.iter().zip(residues.iter()) {
			acc += garner_i * xi;
		}
		acc % &self.product
	}

	/// Reduces a `BigUint` into its residues modulo every prime of this
	/// context.
	pub fn project(&self, value: &BigUint) -> Vec<u64> {
		self.moduli
			.iter()
			.map(|m| {
				let r = value % BigUint::from(m.modulus());
				r.to_u64_digits().first().copied().unwrap_or(0)
			})
			.collect()
	}
}
