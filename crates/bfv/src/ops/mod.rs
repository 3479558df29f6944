//! Homomorphic evaluator: the non-operator entry points `multiply`'s
//! `*` overload cannot carry a key through (`relinearize`, rotation,
//! `exponentiate`, tree reductions), grounded in `marcosfpr-sealy`'s
//! `Evaluator` shape while the common-path operator overloads
//! (`Add`/`Sub`/`Neg`/`Mul<&Plaintext>`) stay on [`crate::ciphertext::Ciphertext`]
//! itself.

use crate::ciphertext::{self, Ciphertext};
use crate::error::{Error, Result};
use crate::keys::{EvaluationKey, GaloisElement, GaloisKey};
use crate::plaintext::Plaintext;
use fhe_math::rq::Representation;
use std::collections::HashMap;

/// Holds the keys an evaluator needs beyond what a bare ciphertext
/// carries: the relinearization key and one Galois key per automorphism
/// the caller registered.
#[derive(Debug, Default)]
pub struct Evaluator {
	evk: Option<EvaluationKey>,
	gk: HashMap<GaloisElement, GaloisKey>,
}

impl Evaluator {
	pub fn new() -> Self {
		Self { evk: None, gk: HashMap::new() }
	}

	pub fn with_evaluation_key(mut self, evk: EvaluationKey) -> Self {
		self.evk = Some(evk);
		self
	}

	pub fn with_galois_key(mut self, gk: GaloisKey) -> Self {
		self.gk.insert(gk.element(), gk);
		self
	}

	fn evk(&self) -> Result<&EvaluationKey> {
		self.evk
			.as_ref()
			.ok_or_else(|| Error::InvalidParameters("evaluator has no evaluation key".to_string()))
	}

	/// Multiplies two size-2 ciphertexts and relinearizes the result.
	pub fn multiply_relin(&self, ct0: &Ciphertext, ct1: &Ciphertext) -> Result<Ciphertext> {
		ciphertext::multiply(ct0, ct1, self.evk()?)
	}

	/// Squares a ciphertext and relinearizes the result.
	pub fn square_relin(&self, ct: &Ciphertext) -> Result<Ciphertext> {
		ciphertext::square(ct, self.evk()?)
	}

	/// Folds `ct` down to `target_size`, independent of `multiply`/
	/// `square`. `target_size` must lie in `[2, ct.size()]`.
	pub fn relinearize(&self, ct: &Ciphertext, target_size: usize) -> Result<Ciphertext> {
		ciphertext::relinearize(ct, self.evk()?, target_size)
	}

	/// Multiplies a ciphertext by a plaintext, transforming `ct` to
	/// [`Representation::Ntt`] first if it is not already there.
	pub fn multiply_plain(&self, ct: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
		let mut ct = ct.clone();
		ciphertext::transform_to_ntt(&mut ct);
		Ok(&ct * pt)
	}

	/// Multiplies a ciphertext already in [`Representation::Ntt`] by a
	/// plaintext, failing rather than silently transforming it.
	pub fn multiply_plain_ntt(&self, ct: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
		if ct.c.iter().any(|ci| ci.representation() != Representation::Ntt) {
			return Err(Error::ShapeMismatch("ciphertext is not in Ntt form".to_string()));
		}
		Ok(ct * pt)
	}

	/// Raises `ct` to `exponent` via square-and-multiply, relinearizing
	/// after every multiplication. `exponent == 0` is rejected: there is
	/// no fresh-encryption-of-one to return to without a public key.
	pub fn exponentiate(&self, ct: &Ciphertext, exponent: u32) -> Result<Ciphertext> {
		if exponent == 0 {
			log::error!("exponentiate: exponent 0 has no fresh-encryption-of-one to fall back to");
			return Err(Error::OutOfRange("exponentiate requires exponent >= 1".to_string()));
		}
		let mut result: Option<Ciphertext> = None;
		let mut base = ct.clone();
		let mut e = exponent;
		while e > 0 {
			if e & 1 == 1 {
				result = Some(match result {
					Some(r) => self.multiply_relin(&r, &base)?,
					None => base.clone(),
				});
			}
			e >>= 1;
			if e > 0 {
				base = self.square_relin(&base)?;
			}
		}
		Ok(result.unwrap())
	}

	/// Sums a slice of ciphertexts pairwise.
	pub fn add_many(&self, cts: &[Ciphertext]) -> Result<Ciphertext> {
		let mut iter = cts.iter();
		let first = iter.next().ok_or_else(|| Error::ShapeMismatch("add_many requires at least one ciphertext".to_string()))?;
		let mut acc = first.clone();
		for ct in iter {
			acc += ct;
		}
		Ok(acc)
	}

	/// Multiplies a slice of ciphertexts via a balanced reduction tree,
	/// relinearizing after every multiplication.
	pub fn multiply_many(&self, cts: &[Ciphertext]) -> Result<Ciphertext> {
		if cts.is_empty() {
			return Err(Error::ShapeMismatch("multiply_many requires at least one ciphertext".to_string()));
		}
		let mut level: Vec<Ciphertext> = cts.to_vec();
		while level.len() > 1 {
			let mut next = Vec::with_capacity(level.len().div_ceil(2));
			let mut pairs = level.chunks(2);
			while let Some(chunk) = pairs.next() {
				if chunk.len() == 2 {
					next.push(self.multiply_relin(&chunk[0], &chunk[1])?);
				} else {
					next.push(chunk[0].clone());
				}
			}
			level = next;
		}
		Ok(level.into_iter().next().unwrap())
	}

	/// Applies a Galois automorphism registered under `element`.
	fn apply_galois(&self, ct: &Ciphertext, element: GaloisElement) -> Result<Ciphertext> {
		if ct.size() != 2 {
			log::error!("rotate: ciphertext has size {}, rotation requires size 2", ct.size());
			return Err(Error::ShapeMismatch("rotation requires a size-2 ciphertext".to_string()));
		}
		let gk = self.gk.get(&element).ok_or_else(|| {
			log::error!("rotate: no Galois key registered for element {element}");
			Error::InvalidParameters(format!("no Galois key registered for element {element}"))
		})?;
		let mut c0 = ct.c[0].clone();
		let mut c1 = ct.c[1].clone();
		gk.relinearize(&mut c0, &mut c1)?;
		Ok(Ciphertext { par: ct.par().clone(), seed: None, c: vec![c0, c1] })
	}

	/// Rotates a batched ciphertext's SIMD slots left by `steps` within
	/// each of its two rows.
	pub fn rotate_rows(&self, ct: &Ciphertext, steps: i64) -> Result<Ciphertext> {
		let element = crate::keys::galois_element_for_row_rotation(ct.par().degree(), steps);
		self.apply_galois(ct, element)
	}

	/// Swaps a batched ciphertext's two SIMD rows.
	pub fn rotate_columns(&self, ct: &Ciphertext) -> Result<Ciphertext> {
		let element = crate::keys::galois_element_for_column_rotation(ct.par().degree());
		self.apply_galois(ct, element)
	}
}
