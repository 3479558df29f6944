//! The relinearization key: a key-switching key per power `s^2, s^3, ...`
//! of the secret, letting a ciphertext of any size be folded back down to
//! any target size in `[2, size]` one power at a time.

use crate::error::{Error, Result};
use crate::keys::key_switching::{KeySwitchingKey, MAX_DBC};
use crate::secret_key::SecretKey;
use fhe_math::rq::{Poly, Representation};
use std::rc::Rc;

/// Holds one key-switching key per power of the secret beyond `s^1`:
/// `relin_keys[i]` switches `s^(i+2)` to `s`. Empty if relinearization was
/// never requested.
#[derive(Debug)]
pub struct EvaluationKey {
	relin_keys: Vec<KeySwitchingKey>,
}

impl EvaluationKey {
	pub(crate) fn supports_relinearization(&self) -> bool {
		!self.relin_keys.is_empty()
	}

	/// The largest ciphertext size this key can relinearize down to `2`,
	/// i.e. the highest power of `s` it holds a key-switching key for, plus
	/// one.
	pub fn max_relinearizable_size(&self) -> usize {
		self.relin_keys.len() + 2
	}

	fn key_for_power(&self, power: usize) -> Result<&KeySwitchingKey> {
		self.relin_keys
			.get(power.wrapping_sub(2))
			.ok_or_else(|| Error::InvalidParameters(format!("evaluation key holds no key-switching key for s^{power}")))
	}

	/// Folds the single highest term of a ciphertext, `c_top` (the
	/// coefficient of `s^power`, in [`Representation::PowerBasis`]), into
	/// `(c0, c1)`, which are mutated in place and left in
	/// [`Representation::Ntt`].
	pub(crate) fn fold_one_level(&self, c0: &mut Poly, c1: &mut Poly, c_top: &Poly, power: usize) -> Result<()> {
		let relin_key = self.key_for_power(power)?;
		let (mut delta0, mut delta1) = relin_key.key_switch(c_top)?;
		delta0.change_representation(Representation::Ntt);
		delta1.change_representation(Representation::Ntt);
		*c0 += &delta0;
		*c1 += &delta1;
		Ok(())
	}

	/// Folds the quadratic term `c2` (in [`Representation::PowerBasis`])
	/// into `(c0, c1)`, which are mutated in place and left in
	/// [`Representation::Ntt`]. Equivalent to `fold_one_level(.., 2)`, kept
	/// as the fast path `multiply`/`square` use on their fresh size-3
	/// product.
	pub(crate) fn relinearizes(&self, c0: &mut Poly, c1: &mut Poly, c2: &Poly) -> Result<()> {
		self.fold_one_level(c0, c1, c2, 2)
	}
}

/// Builds an [`EvaluationKey`] for a secret key.
pub struct EvaluationKeyBuilder<'a> {
	sk: &'a SecretKey,
	max_degree: usize,
	dbc: usize,
}

impl<'a> EvaluationKeyBuilder<'a> {
	pub fn new(sk: &'a SecretKey) -> Self {
		Self { sk, max_degree: 0, dbc: MAX_DBC }
	}

	/// Requests a key-switching key from `s^2` to `s`, enough to
	/// relinearize the size-3 product `multiply`/`square` produce.
	pub fn enable_relinearization(self) -> Self {
		self.enable_relinearization_to_degree(2)
	}

	/// Requests key-switching keys from `s^2, s^3, ..., s^max_degree` to
	/// `s`, enough to relinearize a ciphertext of size up to
	/// `max_degree + 1` down to any target size in `[2, max_degree + 1]`.
	pub fn enable_relinearization_to_degree(mut self, max_degree: usize) -> Self {
		self.max_degree = self.max_degree.max(max_degree);
		self
	}

	/// Sets the decomposition base bit count the relinearization keys are
	/// generated with (default: [`MAX_DBC`], the coarsest/smallest key).
	pub fn decomposition_bit_count(mut self, dbc: usize) -> Self {
		self.dbc = dbc;
		self
	}

	pub fn build(self) -> Result<EvaluationKey> {
		let mut relin_keys = Vec::with_capacity(self.max_degree.saturating_sub(1));
		if self.max_degree >= 2 {
			let mut s_power = self.sk.secret_poly().clone();
			s_power.change_representation(Representation::Ntt);
			let mut s_power = &s_power * self.sk.secret_poly();
			s_power.change_representation(Representation::PowerBasis);
			relin_keys.push(self.sk.key_switching_new(&s_power, self.dbc)?);
			for _ in 3..=self.max_degree {
				s_power.change_representation(Representation::Ntt);
				s_power = &s_power * self.sk.secret_poly();
				s_power.change_representation(Representation::PowerBasis);
				relin_keys.push(self.sk.key_switching_new(&s_power, self.dbc)?);
			}
		}
		Ok(EvaluationKey { relin_keys })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parameters::BfvParameters;

	fn params() -> Rc<BfvParameters> {
		BfvParameters::builder()
			.polynomial_degree(8usize)
			.plaintext_modulus(17u64)
			.ciphertext_moduli(vec![1153u64, 4611686018326724609u64])
			.build()
			.unwrap()
	}

	#[test]
	fn builder_without_relinearization_yields_no_key() {
		let par = params();
		let sk = SecretKey::random(&par);
		let ek = EvaluationKeyBuilder::new(&sk).build().unwrap();
		assert!(!ek.supports_relinearization());
	}

	#[test]
	fn builder_with_relinearization_yields_a_key() {
		let par = params();
		let sk = SecretKey::random(&par);
		let ek = EvaluationKeyBuilder::new(&sk).enable_relinearization().build().unwrap();
		assert!(ek.supports_relinearization());
	}
}
