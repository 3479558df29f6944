//! Secret keys for the BFV encryption scheme.

use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::keys::KeySwitchingKey;
use crate::parameters::BfvParameters;
use crate::plaintext::Plaintext;
use crate::traits::{Decryptor, Encryptor};
use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use num_bigint::BigUint;
use rand::{thread_rng, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::rc::Rc;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A BFV secret key: a ternary polynomial `s`, kept in
/// [`fhe_math::rq::Representation::NttShoup`] since every use of `s`
/// (encryption, decryption, key-switch generation) multiplies by it.
#[derive(Debug)]
pub struct SecretKey {
	par: Rc<BfvParameters>,
	pub(crate) s: Poly,
}

impl Zeroize for SecretKey {
	fn zeroize(&mut self) {
		self.s.zeroize();
	}
}
impl ZeroizeOnDrop for SecretKey {}

impl PartialEq for SecretKey {
	fn eq(&self, other: &Self) -> bool {
		self.par.fingerprint() == other.par.fingerprint() && self.s == other.s
	}
}

impl SecretKey {
	/// Samples a fresh ternary secret key.
	pub fn random(par: &Rc<BfvParameters>) -> Self {
		let mut rng = thread_rng();
		let mut s = Poly::small_ternary(par.ctx(), Representation::PowerBasis, &mut rng);
		s.change_representation(Representation::NttShoup);
		Self { par: par.clone(), s }
	}

	pub(crate) fn par(&self) -> &Rc<BfvParameters> {
		&self.par
	}

	pub(crate) fn secret_poly(&self) -> &Poly {
		&self.s
	}

	/// Builds a [`KeySwitchingKey`] from this secret to `from`, decomposed
	/// at `dbc` bits per digit.
	pub(crate) fn key_switching_new(&self, from: &Poly, dbc: usize) -> Result<KeySwitchingKey> {
		KeySwitchingKey::new(&self.par, &self.s, from, dbc)
	}

	/// Measures the current noise magnitude of `ct`, in bits: the infinity
	/// norm of `c0 + c1*s + ... - Δm` (centered around `0`), reported as a
	/// bit length. Used by tests and diagnostics, never by the constant-time
	/// encrypt/decrypt path.
	///
	/// # Safety
	/// Runs in variable time depending on the noise value; must not be
	/// called on data whose timing should stay secret.
	pub unsafe fn measure_noise(&self, ct: &Ciphertext) -> Result<usize> {
		let pt = self.decrypt(ct)?;
		let mut m = Poly::try_convert_from(pt.value(), self.par.ctx(), false, Representation::PowerBasis)?;
		m.change_representation(Representation::Ntt);
		m = m.scalar_mul(self.par.delta());

		let mut acc = ct.c[0].clone();
		acc.disallow_variable_time_computations();
		let mut s_power = self.s.clone();
		s_power.change_representation(Representation::Ntt);
		for ci in &ct.c[1..] {
			let mut ci = ci.clone();
			ci.disallow_variable_time_computations();
			let term = &ci * &s_power;
			acc += &term;
			s_power = &s_power * &self.s;
		}
		acc -= &m;
		acc.change_representation(Representation::PowerBasis);

		let q = self.par.ctx().rns().modulus();
		let mut noise = 0usize;
		for coeff in Vec::<BigUint>::from(&acc) {
			let centered = std::cmp::min(coeff.bits(), (q - &coeff).bits());
			noise = std::cmp::max(noise, centered as usize);
		}
		Ok(noise)
	}
}

impl Encryptor for SecretKey {
	fn encrypt(&self, pt: &Plaintext) -> Result<Ciphertext> {
		if self.par.fingerprint() != pt.par().fingerprint() {
			return Err(Error::FingerprintMismatch);
		}
		let mut seed = <ChaCha8Rng as SeedableRng>::Seed::default();
		thread_rng().fill(&mut seed);
		let a = Poly::random_from_seed(self.par.ctx(), Representation::Ntt, seed);

		let mut b = Poly::small_gaussian(self.par.ctx(), Representation::PowerBasis, self.par.noise_std_dev(), self.par.noise_max_deviation(), &mut thread_rng());
		b.change_representation(Representation::Ntt);
		let mut a_s = &a * &self.s;
		a_s.change_representation(Representation::Ntt);
		b -= &a_s;

		let mut m = Poly::try_convert_from(pt.value(), self.par.ctx(), false, Representation::PowerBasis)?;
		m.change_representation(Representation::Ntt);
		m = m.scalar_mul(self.par.delta());
		b += &m;

		a_s.zeroize();
		m.zeroize();

		let mut a = a;
		let mut b = b;
		// Safety: `a`, `b` are now ciphertext material, public once emitted.
		unsafe {
			a.allow_variable_time_computations();
			b.allow_variable_time_computations();
		}

		Ok(Ciphertext {
			par: self.par.clone(),
			seed: Some(seed),
			c: vec![b, a],
		})
	}
}

impl Decryptor for SecretKey {
	fn decrypt(&self, ct: &Ciphertext) -> Result<Plaintext> {
		if self.par.fingerprint() != ct.par.fingerprint() {
			return Err(Error::FingerprintMismatch);
		}

		let mut acc = ct.c[0].clone();
		acc.disallow_variable_time_computations();
		let mut s_power = {
			let mut s = self.s.clone();
			s.disallow_variable_time_computations();
			s.change_representation(Representation::Ntt);
			s
		};
		for ci in &ct.c[1..] {
			let mut ci = ci.clone();
			ci.disallow_variable_time_computations();
			let term = &ci * &s_power;
			acc += &term;
			s_power = &s_power * &self.s;
		}
		acc.change_representation(Representation::PowerBasis);

		let mut scaled = self.par.decrypt_scaler().scale(&acc)?;
		let mut v: Vec<u64> = Vec::<BigUint>::from(&scaled)
			.into_iter()
			.map(|c| c.to_u64_digits().first().copied().unwrap_or(0))
			.collect();
		self.par.plaintext().reduce_vec(&mut v);

		acc.zeroize();
		scaled.zeroize();

		let value: Vec<i64> = v.into_iter().map(|x| x as i64).collect();
		Plaintext::try_encode(&value, crate::plaintext::Encoding::Poly, &self.par)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::plaintext::Encoding;
	use crate::traits::{Decryptor, Encryptor};

	fn params() -> Rc<BfvParameters> {
		BfvParameters::builder()
			.polynomial_degree(8usize)
			.plaintext_modulus(17u64)
			.ciphertext_moduli(vec![1153u64])
			.build()
			.unwrap()
	}

	#[test]
	fn keygen_samples_a_ternary_secret() {
		let par = params();
		let sk = SecretKey::random(&par);
		let mut s = sk.s.clone();
		s.change_representation(Representation::PowerBasis);
		let coeffs = Vec::<BigUint>::from(&s);
		let q = BigUint::from(1153u64);
		for c in coeffs {
			assert!(c <= BigUint::from(1u64) || c >= &q - BigUint::from(1u64));
		}
	}

	#[test]
	fn encrypt_then_decrypt_recovers_the_plaintext() {
		let par = params();
		let sk = SecretKey::random(&par);
		let pt = Plaintext::try_encode(&[1, 2, 3, 4, 5, 6, -7, 8], Encoding::Poly, &par).unwrap();
		let ct = sk.encrypt(&pt).unwrap();
		let pt2 = sk.decrypt(&ct).unwrap();
		assert_eq!(pt2.value(), pt.value());
	}
}
