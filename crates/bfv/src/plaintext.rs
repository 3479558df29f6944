//! Plaintext polynomials: `N` coefficients in `[0, t)`, optionally packed
//! into `N` independent SIMD slots via the plaintext CRT isomorphism.

use crate::error::{Error, Result};
use crate::parameters::BfvParameters;
use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use std::rc::Rc;

/// How a [`Plaintext`]'s slots map onto its `N` ring coefficients.
///
/// `Poly` stores the integers directly as polynomial coefficients in
/// ascending-degree order. `Simd` packs `N` independent plaintext integers
/// into one polynomial via the plaintext-side NTT (only available when
/// [`BfvParameters::supports_batching`]), following SEAL's `BatchEncoder`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
	Poly,
	Simd,
}

/// A plaintext polynomial: the un-scaled message an [`crate::Encryptor`]
/// multiplies by `Δ` and a fresh error before packing it into a ciphertext.
#[derive(Clone, Debug)]
pub struct Plaintext {
	par: Rc<BfvParameters>,
	pub(crate) encoding: Option<Encoding>,
	/// Coefficients in `[0, t)`, in ascending degree order (never in slot
	/// order, regardless of `encoding`).
	pub(crate) value: Vec<u64>,
	/// `value` reduced into the ciphertext ring and moved to
	/// [`Representation::NttShoup`], ready to scalar-multiply a ciphertext
	/// for `multiply_plain`.
	pub(crate) poly_ntt: Poly,
	/// Set by [`Plaintext::from_external`]: this plaintext's coefficient
	/// count was fixed by a caller-owned buffer at construction time and
	/// must not change size afterwards.
	aliased: bool,
}

impl Plaintext {
	/// Encodes `values` (interpreted modulo `t`, any excess is reduced) as a
	/// plaintext under `encoding`.
	pub fn try_encode(values: &[i64], encoding: Encoding, par: &Rc<BfvParameters>) -> Result<Self> {
		let degree = par.degree();
		if values.len() > degree {
			return Err(Error::OutOfRange(format!(
				"{} values do not fit in {degree} slots",
				values.len()
			)));
		}
		let t = par.plaintext_modulus();

		let mut value = vec![0u64; degree];
		match encoding {
			Encoding::Poly => {
				for (v, &x) in value.iter_mut().zip(values.iter()) {
					*v = reduce_signed(x, t);
				}
			}
			Encoding::Simd => {
				if !par.supports_batching() {
					return Err(Error::InvalidParameters(
						"plaintext modulus does not support batching".to_string(),
					));
				}
				let map = par.matrix_reps_index_map();
				let mut slots = vec![0u64; degree];
				for (i, &x) in values.iter().enumerate() {
					slots[i] = reduce_signed(x, t);
				}
				let mut permuted = vec![0u64; degree];
				for (slot, &coeff_index) in map.iter().enumerate() {
					permuted[coeff_index] = slots[slot];
				}
				let op = par.plaintext_op().expect("supports_batching implies an NTT operator");
				let mut coeffs = permuted;
				// `op.backward` maps the slot-ordered NTT evaluation back to the
				// natural-order polynomial the plaintext coefficients encode.
				// Safety: these are public plaintext slot values, not secret data.
				unsafe { op.backward_vt(&mut coeffs) };
				value = coeffs;
			}
		}

		let poly_ntt = Self::build_poly_ntt(&value, par)?;
		Ok(Self {
			par: par.clone(),
			encoding: Some(encoding),
			value,
			poly_ntt,
			aliased: false,
		})
	}

	/// A plaintext encoding the all-zero message.
	pub fn zero(encoding: Encoding, par: &Rc<BfvParameters>) -> Result<Self> {
		Self::try_encode(&[], encoding, par)
	}

	/// Wraps a caller-owned buffer of `[0, t)` coefficients (already in
	/// ascending-degree, non-slot order) as a `Poly`-encoded plaintext.
	/// Unlike [`Plaintext::try_encode`], the resulting plaintext is
	/// *aliased*: [`Plaintext::try_resize`] on it always fails with
	/// [`Error::AliasViolation`], matching `spec.md` §3's "may be aliased
	/// over external storage (no resize permitted in alias mode)".
	pub fn from_external(coefficients: &[u64], par: &Rc<BfvParameters>) -> Result<Self> {
		let degree = par.degree();
		if coefficients.len() != degree {
			return Err(Error::OutOfRange(format!(
				"external buffer has {} coefficients, expected {degree}",
				coefficients.len()
			)));
		}
		let value = coefficients.to_vec();
		let poly_ntt = Self::build_poly_ntt(&value, par)?;
		Ok(Self {
			par: par.clone(),
			encoding: Some(Encoding::Poly),
			value,
			poly_ntt,
			aliased: true,
		})
	}

	/// Whether this plaintext's coefficient count is pinned to an external
	/// buffer's size.
	pub fn is_aliased(&self) -> bool {
		self.aliased
	}

	/// Truncates or zero-pads this plaintext's coefficients to `new_len`.
	/// Fails with [`Error::AliasViolation`] if this plaintext was built by
	/// [`Plaintext::from_external`].
	pub fn try_resize(&mut self, new_len: usize) -> Result<()> {
		if self.aliased {
			return Err(Error::AliasViolation);
		}
		self.value.resize(new_len, 0);
		self.poly_ntt = Self::build_poly_ntt(&self.value, &self.par)?;
		Ok(())
	}

	fn build_poly_ntt(value: &[u64], par: &Rc<BfvParameters>) -> Result<Poly> {
		let mut poly = Poly::try_convert_from(value, par.ctx(), false, Representation::Ntt)?;
		poly.change_representation(Representation::NttShoup);
		Ok(poly)
	}

	/// Recovers the `N` (or fewer) integers this plaintext encodes, per
	/// `encoding`, as balanced residues in `(-t/2, t/2]`.
	pub fn try_decode(&self, encoding: Encoding) -> Result<Vec<i64>> {
		let t = self.par.plaintext_modulus();
		match encoding {
			Encoding::Poly => Ok(self.value.iter().map(|&v| to_balanced(v, t)).collect()),
			Encoding::Simd => {
				if !self.par.supports_batching() {
					return Err(Error::InvalidParameters(
						"plaintext modulus does not support batching".to_string(),
					));
				}
				let op = self
					.par
					.plaintext_op()
					.expect("supports_batching implies an NTT operator");
				let mut coeffs = self.value.clone();
				// Safety: these are public plaintext slot values, not secret data.
				unsafe { op.forward_vt(&mut coeffs) };
				let map = self.par.matrix_reps_index_map();
				let mut slots = vec![0u64; coeffs.len()];
				for (slot, &coeff_index) in map.iter().enumerate() {
					slots[slot] = coeffs[coeff_index];
				}
				Ok(slots.into_iter().map(|v| to_balanced(v, t)).collect())
			}
		}
	}

	/// The coefficient count (`N`).
	pub fn len(&self) -> usize {
		self.value.len()
	}

	pub fn is_empty(&self) -> bool {
		self.value.is_empty()
	}

	/// The raw `[0, t)` coefficients, in ascending degree order.
	pub fn value(&self) -> &[u64] {
		&self.value
	}

	pub(crate) fn par(&self) -> &Rc<BfvParameters> {
		&self.par
	}
}

impl PartialEq for Plaintext {
	fn eq(&self, other: &Self) -> bool {
		self.par.fingerprint() == other.par.fingerprint() && self.value == other.value
	}
}

fn reduce_signed(x: i64, t: u64) -> u64 {
	let t = t as i64;
	(((x % t) + t) % t) as u64
}

fn to_balanced(v: u64, t: u64) -> i64 {
	if v > t / 2 {
		v as i64 - t as i64
	} else {
		v as i64
	}
}
