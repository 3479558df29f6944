//! Public keys for asymmetric BFV encryption.

use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::parameters::BfvParameters;
use crate::plaintext::Plaintext;
use crate::secret_key::SecretKey;
use crate::traits::Encryptor;
use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use rand::thread_rng;
use std::rc::Rc;
use zeroize::Zeroize;

/// A BFV public key `(b, a)` with `b = e - a*s`, usable to encrypt
/// without the secret. Grounded on the same `(b, a)` shape `SecretKey`
/// emits from `encrypt`, but generated once from `s` and reused.
#[derive(Debug, Clone)]
pub struct PublicKey {
	par: Rc<BfvParameters>,
	c0: Poly,
	c1: Poly,
}

impl PublicKey {
	/// Derives a public key from a secret key, by running a fresh
	/// symmetric encryption of zero.
	pub fn new(sk: &SecretKey) -> Result<Self> {
		let zero = Plaintext::zero(crate::plaintext::Encoding::Poly, sk.par())?;
		let ct = sk.encrypt(&zero)?;
		let mut c = ct.c;
		let c1 = c.pop().unwrap();
		let c0 = c.pop().unwrap();
		Ok(Self { par: sk.par().clone(), c0, c1 })
	}

	pub fn par(&self) -> &Rc<BfvParameters> {
		&self.par
	}
}

impl Encryptor for PublicKey {
	/// Asymmetric encryption: samples a ternary `u` and two Gaussians
	/// `e1, e2`, and returns `(Δm + b*u + e1, a*u + e2)`.
	fn encrypt(&self, pt: &Plaintext) -> Result<Ciphertext> {
		if self.par.fingerprint() != pt.par().fingerprint() {
			return Err(Error::FingerprintMismatch);
		}
		let mut rng = thread_rng();
		let ctx = self.par.ctx();

		let mut u = Poly::small_ternary(ctx, Representation::PowerBasis, &mut rng);
		u.change_representation(Representation::Ntt);

		let mut e1 = Poly::small_gaussian(ctx, Representation::PowerBasis, self.par.noise_std_dev(), self.par.noise_max_deviation(), &mut rng);
		let mut e2 = Poly::small_gaussian(ctx, Representation::PowerBasis, self.par.noise_std_dev(), self.par.noise_max_deviation(), &mut rng);
		e1.change_representation(Representation::Ntt);
		e2.change_representation(Representation::Ntt);

		let mut c0 = &self.c0 * &u;
		c0 += &e1;
		let mut m = Poly::try_convert_from(pt.value(), ctx, false, Representation::PowerBasis)?;
		m.change_representation(Representation::Ntt);
		m = m.scalar_mul(self.par.delta());
		c0 += &m;

		let mut c1 = &self.c1 * &u;
		c1 += &e2;

		u.zeroize();
		e1.zeroize();
		e2.zeroize();
		m.zeroize();

		// Safety: `c0`, `c1` hold only ciphertext material from here on.
		unsafe {
			c0.allow_variable_time_computations();
			c1.allow_variable_time_computations();
		}

		Ok(Ciphertext {
			par: self.par.clone(),
			seed: None,
			c: vec![c0, c1],
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::plaintext::Encoding;
	use crate::traits::Decryptor;

	fn params() -> Rc<BfvParameters> {
		BfvParameters::builder()
			.polynomial_degree(8usize)
			.plaintext_modulus(17u64)
			.ciphertext_moduli(vec![1153u64])
			.build()
			.unwrap()
	}

	#[test]
	fn public_key_encrypt_then_secret_decrypt_round_trips() {
		let par = params();
		let sk = SecretKey::random(&par);
		let pk = PublicKey::new(&sk).unwrap();

		let pt = Plaintext::try_encode(&[1, 2, 3, 4, 5, 6, 7, 8], Encoding::Poly, &par).unwrap();
		let ct = pk.encrypt(&pt).unwrap();
		let pt2 = sk.decrypt(&ct).unwrap();
		assert_eq!(pt2.value(), pt.value());
	}
}
