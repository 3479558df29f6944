//! Shared digit-decomposition key-switching machinery underlying both
//! relinearization and Galois (rotation) keys.
//!
//! Grounded on the teacher's `SecretKey::key_switching_new`: one fresh
//! encryption of `w^i * from` per digit, `w = 2^dbc`. The teacher's version
//! picks one digit per RNS prime via a Garner coefficient; here the digit
//! base is the `dbc` bit count `spec.md` §4.7 calls for instead, so each
//! coefficient is lifted to `Z` (via [`fhe_math::rns::RnsContext::lift`]),
//! split into `ceil(bitlen(Q)/dbc)` base-`w` digits, and the corresponding
//! digit polynomial is projected back into the RNS basis — the same
//! exact-`BigInt` trade-off `Scaler` makes, for the same reason: this
//! arithmetic is not safe to get subtly wrong without a compiler to check
//! it against.

use crate::error::{Error, Result};
use crate::parameters::BfvParameters;
use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use num_bigint::BigUint;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::rc::Rc;
use zeroize::Zeroize;

/// Minimum and maximum decomposition base bit count, per `spec.md` §4.7.
pub const MIN_DBC: usize = 1;
pub const MAX_DBC: usize = 60;

/// A key-switching key: `ℓ` pairs `(b_i, a_i)`, each a fresh encryption
/// under the target secret of `w^i * from`, `w = 2^dbc`.
#[derive(Debug)]
pub struct KeySwitchingKey {
	par: Rc<BfvParameters>,
	dbc: usize,
	seed: Option<[u8; 32]>,
	c0: Vec<Poly>,
	c1: Vec<Poly>,
}

impl KeySwitchingKey {
	/// Builds a key-switching key from `s` to `from`, i.e. every digit of
	/// `from` becomes recoverable, under `s`, from a ciphertext term
	/// multiplied against this key's `(b_i, a_i)` pairs.
	///
	/// `from` must be in [`Representation::PowerBasis`].
	pub(crate) fn new(par: &Rc<BfvParameters>, s: &Poly, from: &Poly, dbc: usize) -> Result<Self> {
		if !(MIN_DBC..=MAX_DBC).contains(&dbc) {
			return Err(Error::OutOfRange(format!(
				"decomposition base bit count {dbc} out of range [{MIN_DBC}, {MAX_DBC}]"
			)));
		}
		let ctx = par.ctx();
		let q = ctx.rns().modulus().clone();
		let ell = (q.bits() as usize).div_ceil(dbc);
		let w = BigUint::from(1u64) << dbc;

		let from_big: Vec<BigUint> = Vec::from(from);

		let mut seed = <ChaCha8Rng as SeedableRng>::Seed::default();
		rand::thread_rng().fill_bytes(&mut seed);
		let mut rng = ChaCha8Rng::from_seed(seed);

		let mut c0 = Vec::with_capacity(ell);
		let mut c1 = Vec::with_capacity(ell);
		let mut w_pow = BigUint::from(1u64);
		for _ in 0..ell {
			let mut seed_i = <ChaCha8Rng as SeedableRng>::Seed::default();
			rng.fill_bytes(&mut seed_i);

			let mut a = Poly::random_from_seed(ctx, Representation::Ntt, seed_i);
			let mut a_s = &a * s;
			a_s.change_representation(Representation::PowerBasis);

			let mut b = Poly::small_gaussian(ctx, Representation::PowerBasis, par.noise_std_dev(), par.noise_max_deviation(), &mut rng);
			b -= &a_s;

			let digit: Vec<BigUint> = from_big.iter().map(|c| (c * &w_pow) % &q).collect();
			let mut digit_poly = Poly::try_convert_from(digit.as_slice(), ctx, false, Representation::PowerBasis)?;
			b += &digit_poly;
			digit_poly.zeroize();
			a_s.zeroize();

			// Safety: `a`, `b` no longer depend on secret timing once formed.
			unsafe {
				a.allow_variable_time_computations();
				b.allow_variable_time_computations();
			}
			a.change_representation(Representation::NttShoup);
			b.change_representation(Representation::NttShoup);

			c0.push(b);
			c1.push(a);
			w_pow *= &w;
		}

		Ok(Self {
			par: par.clone(),
			dbc,
			seed: Some(seed),
			c0,
			c1,
		})
	}

	/// Switches `c2` (a ciphertext term to be key-switched, in
	/// [`Representation::PowerBasis`]) into a `(b, a)` pair approximating
	/// `c2 * from` under the target secret.
	pub(crate) fn key_switch(&self, c2: &Poly) -> Result<(Poly, Poly)> {
		let ctx = self.par.ctx();
		let w = BigUint::from(1u64) << self.dbc;

		let mut remaining: Vec<BigUint> = Vec::from(c2);
		let mut out0 = Poly::zero(ctx, Representation::Ntt);
		let mut out1 = Poly::zero(ctx, Representation::Ntt);

		for (b_i, a_i) in self.c0.iter().zip(self.c1.iter()) {
			let digits: Vec<BigUint> = remaining.iter().map(|c| c % &w).collect();
			remaining = remaining.iter().map(|c| c / &w).collect();

			let digit_poly = Poly::try_convert_from(digits.as_slice(), ctx, false, Representation::Ntt)?;

			out0 += &(&digit_poly * b_i);
			out1 += &(&digit_poly * a_i);
		}

		Ok((out0, out1))
	}

	pub(crate) fn dbc(&self) -> usize {
		self.dbc
	}

	pub(crate) fn seed(&self) -> Option<[u8; 32]> {
		self.seed
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parameters::BfvParameters;
	use fhe_math::rq::Representation;

	fn params() -> Rc<BfvParameters> {
		BfvParameters::builder()
			.polynomial_degree(8usize)
			.plaintext_modulus(17u64)
			.ciphertext_moduli(vec![1153u64, 4611686018326724609u64])
			.build()
			.unwrap()
	}

	#[test]
	fn switches_a_random_term_without_error() {
		let par = params();
		let mut rng = rand::thread_rng();
		let mut s = Poly::small_ternary(par.ctx(), Representation::PowerBasis, &mut rng);
		s.change_representation(Representation::NttShoup);

		let from = Poly::random(par.ctx(), Representation::PowerBasis, &mut rng);
		let ksk = KeySwitchingKey::new(&par, &s, &from, 8).unwrap();

		let c2 = Poly::random(par.ctx(), Representation::PowerBasis, &mut rng);
		assert!(ksk.key_switch(&c2).is_ok());
	}
}
