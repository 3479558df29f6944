//! Ciphertext type in the BFV encryption scheme.

use crate::error::{Error, Result};
use crate::keys::EvaluationKey;
use crate::parameters::{BfvParameters, MultiplicationParameters};
use crate::plaintext::Plaintext;
use fhe_math::rq::{Poly, Representation};
use itertools::{izip, Itertools};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::rc::Rc;

/// A ciphertext: `size` RNS polynomials `(c_0, ..., c_{size-1})` such that
/// `c_0 + c_1*s + c_2*s^2 + ... ≈ Δm` under the secret `s`. Fresh
/// ciphertexts have size 2; `multiply` grows the size to 3, and
/// `relinearize` shrinks it back to 2.
#[derive(Debug, Clone)]
pub struct Ciphertext {
	pub(crate) par: Rc<BfvParameters>,
	/// The seed `c_1` (the last element) was sampled from, if this
	/// ciphertext is a fresh encryption whose second element has not been
	/// touched since.
	pub(crate) seed: Option<<ChaCha8Rng as SeedableRng>::Seed>,
	pub(crate) c: Vec<Poly>,
}

impl Ciphertext {
	/// The number of RNS polynomials (`2` for a fresh or relinearized
	/// ciphertext, `3` right after a `multiply`).
	pub fn size(&self) -> usize {
		self.c.len()
	}

	pub fn par(&self) -> &Rc<BfvParameters> {
		&self.par
	}

	fn check_compatible(&self, other: &Ciphertext) -> Result<()> {
		if self.par.fingerprint() != other.par.fingerprint() {
			return Err(Error::FingerprintMismatch);
		}
		if self.c.len() != other.c.len() {
			return Err(Error::ShapeMismatch(format!(
				"ciphertext sizes {} and {} differ",
				self.c.len(),
				other.c.len()
			)));
		}
		Ok(())
	}
}

impl PartialEq for Ciphertext {
	fn eq(&self, other: &Self) -> bool {
		self.par.fingerprint() == other.par.fingerprint() && self.c == other.c
	}
}

impl Add<&Ciphertext> for &Ciphertext {
	type Output = Ciphertext;
	fn add(self, rhs: &Ciphertext) -> Ciphertext {
		self.check_compatible(rhs).expect("incompatible ciphertexts");
		let c = izip!(&self.c, &rhs.c).map(|(a, b)| a + b).collect_vec();
		Ciphertext { par: self.par.clone(), seed: None, c }
	}
}

impl AddAssign<&Ciphertext> for Ciphertext {
	fn add_assign(&mut self, rhs: &Ciphertext) {
		self.check_compatible(rhs).expect("incompatible ciphertexts");
		izip!(&mut self.c, &rhs.c).for_each(|(a, b)| *a += b);
		self.seed = None;
	}
}

impl Sub<&Ciphertext> for &Ciphertext {
	type Output = Ciphertext;
	fn sub(self, rhs: &Ciphertext) -> Ciphertext {
		self.check_compatible(rhs).expect("incompatible ciphertexts");
		let c = izip!(&self.c, &rhs.c).map(|(a, b)| a - b).collect_vec();
		Ciphertext { par: self.par.clone(), seed: None, c }
	}
}

impl SubAssign<&Ciphertext> for Ciphertext {
	fn sub_assign(&mut self, rhs: &Ciphertext) {
		self.check_compatible(rhs).expect("incompatible ciphertexts");
		izip!(&mut self.c, &rhs.c).for_each(|(a, b)| *a -= b);
		self.seed = None;
	}
}

impl Neg for &Ciphertext {
	type Output = Ciphertext;
	fn neg(self) -> Ciphertext {
		let c = self.c.iter().map(|ci| -ci).collect_vec();
		Ciphertext { par: self.par.clone(), seed: None, c }
	}
}

impl Mul<&Plaintext> for &Ciphertext {
	type Output = Ciphertext;
	fn mul(self, rhs: &Plaintext) -> Ciphertext {
		assert_eq!(self.par.fingerprint(), rhs.par().fingerprint(), "incompatible parameters");
		let c = self.c.iter().map(|ci| ci * &rhs.poly_ntt).collect_vec();
		Ciphertext { par: self.par.clone(), seed: None, c }
	}
}

impl MulAssign<&Plaintext> for Ciphertext {
	fn mul_assign(&mut self, rhs: &Plaintext) {
		assert_eq!(self.par.fingerprint(), rhs.par().fingerprint(), "incompatible parameters");
		self.c.iter_mut().for_each(|ci| *ci *= &rhs.poly_ntt);
		self.seed = None;
	}
}

/// Adds a plaintext's value to a ciphertext's message, by scaling it to
/// `Δm` and adding it to `c_0`.
pub fn add_plain(ct: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
	if ct.par.fingerprint() != pt.par().fingerprint() {
		return Err(Error::FingerprintMismatch);
	}
	let mut delta_m = fhe_math::rq::traits::TryConvertFrom::try_convert_from(pt.value(), ct.par.ctx(), false, Representation::PowerBasis)?;
	delta_m_to_ntt(&mut delta_m, ct);
	let mut c = ct.c.clone();
	c[0] += &delta_m;
	Ok(Ciphertext { par: ct.par.clone(), seed: None, c })
}

/// Subtracts a plaintext's value from a ciphertext's message.
pub fn sub_plain(ct: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
	if ct.par.fingerprint() != pt.par().fingerprint() {
		return Err(Error::FingerprintMismatch);
	}
	let mut delta_m = fhe_math::rq::traits::TryConvertFrom::try_convert_from(pt.value(), ct.par.ctx(), false, Representation::PowerBasis)?;
	delta_m_to_ntt(&mut delta_m, ct);
	let mut c = ct.c.clone();
	c[0] -= &delta_m;
	Ok(Ciphertext { par: ct.par.clone(), seed: None, c })
}

fn delta_m_to_ntt(m: &mut Poly, ct: &Ciphertext) {
	m.change_representation(Representation::Ntt);
	*m = m.scalar_mul(ct.par.delta());
}

/// Moves every element of `ct` to [`Representation::Ntt`].
pub fn transform_to_ntt(ct: &mut Ciphertext) {
	ct.c.iter_mut().for_each(|ci| ci.change_representation(Representation::Ntt));
}

/// Moves every element of `ct` to [`Representation::PowerBasis`].
pub fn transform_from_ntt(ct: &mut Ciphertext) {
	ct.c.iter_mut().for_each(|ci| ci.change_representation(Representation::PowerBasis));
}

/// Multiplies two size-2 ciphertexts, growing the result to size 3, then
/// relinearizes it back to size 2 using `ek`. Grounded on the teacher's
/// `mul_internal`: extend to an auxiliary basis wide enough to hold the
/// full tensor product, multiply there, scale back down by `t/Q`, then
/// key-switch the quadratic term away.
pub fn multiply(ct0: &Ciphertext, ct1: &Ciphertext, ek: &EvaluationKey) -> Result<Ciphertext> {
	multiply_internal(ct0, ct1, ek, &ct0.par.mul_params)
}

/// Squares a ciphertext and relinearizes, slightly cheaper than
/// `multiply(ct, ct, ek)` since the cross term is computed once.
pub fn square(ct: &Ciphertext, ek: &EvaluationKey) -> Result<Ciphertext> {
	multiply_internal(ct, ct, ek, &ct.par.mul_params)
}

/// Folds `ct` down to `target_size`, one power of `s` at a time, using the
/// key-switching keys `ek` holds for `s^2, s^3, ...`. `target_size` must lie
/// in `[2, ct.size()]`; `target_size == ct.size()` is a no-op clone.
/// Grounded on `original_source/SEAL/seal/simulator.h`'s
/// `relinearize(simulation, destination_size)`, which treats the output
/// size as an independent, caller-chosen parameter rather than baking in
/// "always down to 2".
pub fn relinearize(ct: &Ciphertext, ek: &EvaluationKey, target_size: usize) -> Result<Ciphertext> {
	if target_size < 2 || target_size > ct.size() {
		log::error!("relinearize: target_size {target_size} out of range [2, {}]", ct.size());
		return Err(Error::OutOfRange(format!(
			"relinearize target_size must be in [2, {}], got {target_size}",
			ct.size()
		)));
	}
	let mut c = ct.c.clone();
	if target_size == c.len() {
		return Ok(Ciphertext { par: ct.par.clone(), seed: None, c });
	}
	c.iter_mut().take(2).for_each(|ci| ci.change_representation(Representation::Ntt));
	while c.len() > target_size {
		let power = c.len() - 1;
		let mut c_top = c.pop().unwrap();
		c_top.change_representation(Representation::PowerBasis);
		let (c0, rest) = c.split_at_mut(1);
		ek.fold_one_level(&mut c0[0], &mut rest[0], &c_top, power)?;
	}
	Ok(Ciphertext { par: ct.par.clone(), seed: None, c })
}

fn multiply_internal(ct0: &Ciphertext, ct1: &Ciphertext, ek: &EvaluationKey, mp: &MultiplicationParameters) -> Result<Ciphertext> {
	if !ek.supports_relinearization() {
		return Err(Error::InvalidParameters("evaluation key does not support relinearization".to_string()));
	}
	if ct0.par.fingerprint() != ct1.par.fingerprint() {
		log::error!("multiply: fingerprint mismatch between operands");
		return Err(Error::FingerprintMismatch);
	}
	if ct0.par.ciphertext_moduli().len() == 1 {
		return Err(Error::InvalidParameters("at least two ciphertext moduli are required for multiplication".to_string()));
	}
	if ct0.c.len() != 2 || ct1.c.len() != 2 {
		log::error!("multiply: expected two size-2 ciphertexts, got sizes {} and {}", ct0.c.len(), ct1.c.len());
		return Err(Error::ShapeMismatch("multiply requires two size-2 ciphertexts".to_string()));
	}

	log::trace!("multiply: extending operands into the {}-modulus tensor basis", mp.extended_ctx.moduli().len());
	let c00 = mp.extender.scale(&ct0.c[0])?;
	let c01 = mp.extender.scale(&ct0.c[1])?;
	let c10 = mp.extender.scale(&ct1.c[0])?;
	let c11 = mp.extender.scale(&ct1.c[1])?;

	log::trace!("multiply: computing the size-3 tensor product");
	let mut c0 = &c00 * &c10;
	let mut c1 = &c00 * &c11;
	c1 += &(&c01 * &c10);
	let mut c2 = &c01 * &c11;
	c0.change_representation(Representation::PowerBasis);
	c1.change_representation(Representation::PowerBasis);
	c2.change_representation(Representation::PowerBasis);

	log::trace!("multiply: scaling the tensor product down by t/Q");
	let mut c0 = mp.down_scaler.scale(&c0)?;
	let mut c1 = mp.down_scaler.scale(&c1)?;
	let c2 = mp.down_scaler.scale(&c2)?;

	log::trace!("multiply: relinearizing the quadratic term away");
	c0.change_representation(Representation::Ntt);
	c1.change_representation(Representation::Ntt);
	ek.relinearizes(&mut c0, &mut c1, &c2)?;

	Ok(Ciphertext {
		par: ct0.par.clone(),
		seed: None,
		c: vec![c0, c1],
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::keys::EvaluationKeyBuilder;
	use crate::plaintext::Encoding;
	use crate::secret_key::SecretKey;
	use crate::traits::{Decryptor, Encryptor};

	fn params() -> Rc<BfvParameters> {
		BfvParameters::builder()
			.polynomial_degree(8usize)
			.plaintext_modulus(17u64)
			.ciphertext_moduli(vec![1153u64, 4611686018326724609u64])
			.build()
			.unwrap()
	}

	#[test]
	fn add_then_decrypt_matches_plaintext_sum() {
		let par = params();
		let sk = SecretKey::random(&par);
		let a = Plaintext::try_encode(&[1, 2, 3, 4], Encoding::Poly, &par).unwrap();
		let b = Plaintext::try_encode(&[4, 3, 2, 1], Encoding::Poly, &par).unwrap();
		let ca = sk.encrypt(&a).unwrap();
		let cb = sk.encrypt(&b).unwrap();
		let cc = &ca + &cb;
		let dec = sk.decrypt(&cc).unwrap();
		assert_eq!(&dec.try_decode(Encoding::Poly).unwrap()[..4], &[5, 5, 5, 5]);
	}

	#[test]
	fn multiply_then_relinearize_recovers_product() {
		let par = params();
		let sk = SecretKey::random(&par);
		let ek = EvaluationKeyBuilder::new(&sk).enable_relinearization().build().unwrap();

		let a = Plaintext::try_encode(&[3, 0, 0, 0, 0, 0, 0, 0], Encoding::Poly, &par).unwrap();
		let b = Plaintext::try_encode(&[4, 0, 0, 0, 0, 0, 0, 0], Encoding::Poly, &par).unwrap();
		let ca = sk.encrypt(&a).unwrap();
		let cb = sk.encrypt(&b).unwrap();
		let cc = multiply(&ca, &cb, &ek).unwrap();
		assert_eq!(cc.size(), 2);
		let dec = sk.decrypt(&cc).unwrap();
		assert_eq!(dec.try_decode(Encoding::Poly).unwrap()[0], 12);
	}

	/// Reproduces the un-relinearized size-3 tensor product the same way
	/// `multiply_internal` does, stopping short of the final key-switch, so
	/// the size-3 and size-2 decryptions of the same product can be
	/// compared directly.
	#[test]
	fn relinearize_size_three_product_matches_unrelinearized_decryption() {
		let par = params();
		let sk = SecretKey::random(&par);
		let ek = EvaluationKeyBuilder::new(&sk).enable_relinearization().build().unwrap();

		let a = Plaintext::try_encode(&[3, 0, 0, 0, 0, 0, 0, 0], Encoding::Poly, &par).unwrap();
		let b = Plaintext::try_encode(&[4, 0, 0, 0, 0, 0, 0, 0], Encoding::Poly, &par).unwrap();
		let ca = sk.encrypt(&a).unwrap();
		let cb = sk.encrypt(&b).unwrap();

		let mp = &par.mul_params;
		let c00 = mp.extender.scale(&ca.c[0]).unwrap();
		let c01 = mp.extender.scale(&ca.c[1]).unwrap();
		let c10 = mp.extender.scale(&cb.c[0]).unwrap();
		let c11 = mp.extender.scale(&cb.c[1]).unwrap();

		let mut t0 = &c00 * &c10;
		let mut t1 = &c00 * &c11;
		t1 += &(&c01 * &c10);
		let mut t2 = &c01 * &c11;
		t0.change_representation(Representation::PowerBasis);
		t1.change_representation(Representation::PowerBasis);
		t2.change_representation(Representation::PowerBasis);

		let t0 = mp.down_scaler.scale(&t0).unwrap();
		let t1 = mp.down_scaler.scale(&t1).unwrap();
		let t2 = mp.down_scaler.scale(&t2).unwrap();

		let size_three = Ciphertext { par: par.clone(), seed: None, c: vec![t0, t1, t2] };
		let relinearized = multiply(&ca, &cb, &ek).unwrap();

		assert_eq!(size_three.size(), 3);
		assert_eq!(relinearized.size(), 2);
		let dec_unrelinearized = sk.decrypt(&size_three).unwrap();
		let dec_relinearized = sk.decrypt(&relinearized).unwrap();
		assert_eq!(dec_unrelinearized.value(), dec_relinearized.value());
	}

	/// Calls `relinearize` directly on a size-3 product, bypassing
	/// `multiply`, to exercise it as the independent operation it is.
	#[test]
	fn standalone_relinearize_folds_size_three_to_two() {
		let par = params();
		let sk = SecretKey::random(&par);
		let ek = EvaluationKeyBuilder::new(&sk).enable_relinearization().build().unwrap();

		let a = Plaintext::try_encode(&[3, 0, 0, 0, 0, 0, 0, 0], Encoding::Poly, &par).unwrap();
		let b = Plaintext::try_encode(&[4, 0, 0, 0, 0, 0, 0, 0], Encoding::Poly, &par).unwrap();
		let ca = sk.encrypt(&a).unwrap();
		let cb = sk.encrypt(&b).unwrap();

		let mp = &par.mul_params;
		let c00 = mp.extender.scale(&ca.c[0]).unwrap();
		let c01 = mp.extender.scale(&ca.c[1]).unwrap();
		let c10 = mp.extender.scale(&cb.c[0]).unwrap();
		let c11 = mp.extender.scale(&cb.c[1]).unwrap();

		let mut t0 = &c00 * &c10;
		let mut t1 = &c00 * &c11;
		t1 += &(&c01 * &c10);
		let mut t2 = &c01 * &c11;
		t0.change_representation(Representation::PowerBasis);
		t1.change_representation(Representation::PowerBasis);
		t2.change_representation(Representation::PowerBasis);

		let t0 = mp.down_scaler.scale(&t0).unwrap();
		let t1 = mp.down_scaler.scale(&t1).unwrap();
		let t2 = mp.down_scaler.scale(&t2).unwrap();

		let size_three = Ciphertext { par: par.clone(), seed: None, c: vec![t0, t1, t2] };
		let folded = relinearize(&size_three, &ek, 2).unwrap();
		assert_eq!(folded.size(), 2);

		let dec_unrelinearized = sk.decrypt(&size_three).unwrap();
		let dec_folded = sk.decrypt(&folded).unwrap();
		assert_eq!(dec_unrelinearized.value(), dec_folded.value());
	}

	#[test]
	fn relinearize_no_op_when_target_size_equals_current_size() {
		let par = params();
		let sk = SecretKey::random(&par);
		let ek = EvaluationKeyBuilder::new(&sk).enable_relinearization().build().unwrap();
		let pt = Plaintext::try_encode(&[1, 2, 3, 4], Encoding::Poly, &par).unwrap();
		let ct = sk.encrypt(&pt).unwrap();
		let same = relinearize(&ct, &ek, ct.size()).unwrap();
		assert_eq!(same.c, ct.c);
	}

	#[test]
	fn relinearize_rejects_target_size_out_of_range() {
		let par = params();
		let sk = SecretKey::random(&par);
		let ek = EvaluationKeyBuilder::new(&sk).enable_relinearization().build().unwrap();
		let pt = Plaintext::try_encode(&[1, 2, 3, 4], Encoding::Poly, &par).unwrap();
		let ct = sk.encrypt(&pt).unwrap();
		assert!(relinearize(&ct, &ek, 1).is_err());
		assert!(relinearize(&ct, &ek, 3).is_err());
	}
}
