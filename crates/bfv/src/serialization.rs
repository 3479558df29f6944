//! Hand-rolled byte layouts for ciphertexts and plaintexts. Fixed, fully
//! specified formats; not worth pulling in a wire-format crate for.

use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::parameters::BfvParameters;
use crate::plaintext::{Encoding, Plaintext};
use fhe_math::rq::{Poly, Representation};
use ndarray::Array2;
use std::rc::Rc;

impl Ciphertext {
	/// `[fingerprint(32)] [size(4, LE)] [is_ntt(1)] [size * k * N uint64 LE]`.
	pub fn to_bytes(&self) -> Vec<u8> {
		let k = self.par.ctx().size();
		let n = self.par.degree();
		let is_ntt = self.c.first().map(|p| p.representation() != Representation::PowerBasis).unwrap_or(true);

		let mut out = Vec::with_capacity(32 + 4 + 1 + self.c.len() * k * n * 8);
		out.extend_from_slice(&self.par.fingerprint());
		out.extend_from_slice(&(self.c.len() as u32).to_le_bytes());
		out.push(is_ntt as u8);
		for poly in &self.c {
			for &v in poly.coefficients().iter() {
				out.extend_from_slice(&v.to_le_bytes());
			}
		}
		out
	}

	/// Inverse of [`Self::to_bytes`]; `par` must match the embedded
	/// fingerprint.
	pub fn from_bytes(bytes: &[u8], par: &Rc<BfvParameters>) -> Result<Self> {
		if bytes.len() < 37 {
			return Err(Error::ShapeMismatch("ciphertext buffer too short".to_string()));
		}
		let mut fingerprint = [0u8; 32];
		fingerprint.copy_from_slice(&bytes[0..32]);
		if fingerprint != par.fingerprint() {
			return Err(Error::FingerprintMismatch);
		}
		let size = u32::from_le_bytes(bytes[32..36].try_into().unwrap()) as usize;
		let is_ntt = bytes[36] != 0;
		let representation = if is_ntt { Representation::Ntt } else { Representation::PowerBasis };

		let k = par.ctx().size();
		let n = par.degree();
		let expected = 37 + size * k * n * 8;
		if bytes.len() != expected {
			return Err(Error::ShapeMismatch(format!("expected {expected} bytes, got {}", bytes.len())));
		}

		let mut c = Vec::with_capacity(size);
		let mut offset = 37;
		for _ in 0..size {
			let mut values = Vec::with_capacity(k * n);
			for _ in 0..(k * n) {
				let v = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
				values.push(v);
				offset += 8;
			}
			let array = Array2::from_shape_vec((k, n), values).map_err(|e| Error::ShapeMismatch(e.to_string()))?;
			c.push(Poly::from_raw_residues(par.ctx(), representation, array)?);
		}

		Ok(Ciphertext { par: par.clone(), seed: None, c })
	}
}

impl Plaintext {
	/// `[coeff_count(4)] [coeff_count uint64]`.
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(4 + self.value().len() * 8);
		out.extend_from_slice(&(self.value().len() as u32).to_le_bytes());
		for &v in self.value() {
			out.extend_from_slice(&v.to_le_bytes());
		}
		out
	}

	/// Inverse of [`Self::to_bytes`]; `encoding` must match how the
	/// original plaintext was encoded, since the wire format stores
	/// un-permuted polynomial coefficients.
	pub fn from_bytes(bytes: &[u8], encoding: Encoding, par: &Rc<BfvParameters>) -> Result<Self> {
		if bytes.len() < 4 {
			return Err(Error::ShapeMismatch("plaintext buffer too short".to_string()));
		}
		let coeff_count = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
		let expected = 4 + coeff_count * 8;
		if bytes.len() != expected {
			return Err(Error::ShapeMismatch(format!("expected {expected} bytes, got {}", bytes.len())));
		}
		let mut values = Vec::with_capacity(coeff_count);
		let mut offset = 4;
		for _ in 0..coeff_count {
			let v = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
			values.push(v as i64);
			offset += 8;
		}
		Plaintext::try_encode(&values, encoding, par)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
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
	fn ciphertext_round_trips_through_bytes() {
		let par = params();
		let sk = SecretKey::random(&par);
		let pt = Plaintext::try_encode(&[1, 2, 3, 4, 5, 6, 7, 8], Encoding::Poly, &par).unwrap();
		let ct = sk.encrypt(&pt).unwrap();
		let bytes = ct.to_bytes();
		let ct2 = Ciphertext::from_bytes(&bytes, &par).unwrap();
		let dec = sk.decrypt(&ct2).unwrap();
		assert_eq!(dec.value(), pt.value());
	}

	#[test]
	fn plaintext_round_trips_through_bytes() {
		let par = params();
		let pt = Plaintext::try_encode(&[1, 2, 3, -4], Encoding::Poly, &par).unwrap();
		let bytes = pt.to_bytes();
		let pt2 = Plaintext::from_bytes(&bytes, Encoding::Poly, &par).unwrap();
		assert_eq!(pt, pt2);
	}
}
