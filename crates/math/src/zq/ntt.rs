//! Forward and inverse negacyclic NTT modulo a single prime.
//!
//! The transform follows the classic in-place Cooley-Tukey / Gentleman-Sande
//! pair that avoids an explicit bit-reversal pass by storing the twiddle
//! factors themselves in bit-reversed order: the forward transform takes a
//! polynomial in natural (coefficient) order and leaves it in bit-reversed
//! order; the inverse transform reverses that exactly. This is the ordering
//! convention `fhe_math::rq` relies on: `Representation::Ntt` polynomials are
//! always bit-reversed, `Representation::PowerBasis` always natural.

use super::{primes::primitive_root, Modulus};

/// Precomputed tables for the forward/inverse NTT of a fixed size `n` modulo
/// a fixed prime `p`.
///
/// Constructing an [`NttOperator`] fails (`None`) when `p` does not admit a
/// primitive `2n`-th root of unity, i.e. `p % (2n) != 1`; callers use this to
/// detect "this modulus cannot support a fast transform at this degree"
/// (for instance, a plaintext modulus that was not chosen to enable
/// batching).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NttOperator {
	p: Modulus,
	n: usize,
	log_n: u32,
	psi_bitrev: Vec<u64>,
	psi_bitrev_shoup: Vec<u64>,
	psi_inv_bitrev: Vec<u64>,
	psi_inv_bitrev_shoup: Vec<u64>,
	ninv: u64,
	ninv_shoup: u64,
}

fn bit_reverse(mut x: u32, bits: u32) -> u32 {
	let mut r = 0u32;
	for _ in 0..bits {
		r = (r << 1) | (x & 1);
		x >>= 1;
	}
	r
}

impl NttOperator {
	/// Builds the NTT tables for a ring of degree `n` modulo `p`.
	pub fn new(p: &Modulus, n: usize) -> Option<Self> {
		if n == 0 || !n.is_power_of_two() {
			return None;
		}
		let log_n = n.trailing_zeros();
		let root = primitive_root(2 * n as u64, p)?;
		let root_inv = p.inv(root)?;

		let mut psi_bitrev = vec![0u64; n];
		let mut psi_inv_bitrev = vec![0u64; n];
		for (i, (fwd, inv)) in psi_bitrev.iter_mut().zip(psi_inv_bitrev.iter_mut()).enumerate() {
			let e = bit_reverse(i as u32, log_n) as u64;
			*fwd = p.pow(root, e);
			*inv = p.pow(root_inv, e);
		}
		let psi_bitrev_shoup = p.shoup_vec(&psi_bitrev);
		let psi_inv_bitrev_shoup = p.shoup_vec(&psi_inv_bitrev);

		let ninv = p.inv(n as u64 % p.modulus())?;
		let ninv_shoup = p.shoup(ninv);

		Some(Self {
			p: *p,
			n,
			log_n,
			psi_bitrev,
			psi_bitrev_shoup,
			psi_inv_bitrev,
			psi_inv_bitrev_shoup,
			ninv,
			ninv_shoup,
		})
	}

	/// The ring degree this operator transforms.
	pub const fn size(&self) -> usize {
		self.n
	}

	/// The modulus this operator transforms over.
	pub const fn modulus(&self) -> &Modulus {
		&self.p
	}

	/// Forward NTT: `a` must be in natural (coefficient) order and length
	/// `n`; on return it holds the bit-reversed NTT-domain evaluation.
	pub fn forward(&self, a: &mut [u64]) {
		debug_assert_eq!(a.len(), self.n);
		self.forward_inner(a)
	}

	/// Variable-time forward NTT. Identical data path to [`Self::forward`];
	/// the distinct entry point documents call sites that operate on
	/// already-public data (ciphertext coefficients) rather than on
	/// coefficients derived from a secret.
	///
	/// # Safety
	/// The caller vouches that `a` does not need to be processed in
	/// constant time.
	pub unsafe fn forward_vt(&self, a: &mut [u64]) {
		self.forward_inner(a)
	}

	fn forward_inner(&self, a: &mut [u64]) {
		let n = self.n;
		let mut t = n;
		let mut m = 1usize;
		while m < n {
			t >>= 1;
			for i in 0..m {
				let j1 = 2 * i * t;
				let j2 = j1 + t;
				let idx = m + i;
				let s = self.psi_bitrev[idx];
				let s_shoup = self.psi_bitrev_shoup[idx];
				for j in j1..j2 {
					let u = a[j];
					let v = self.p.mul_shoup(a[j + t], s, s_shoup);
					a[j] = self.p.add(u, v);
					a[j + t] = self.p.sub(u, v);
				}
			}
			m <<= 1;
		}
	}

	/// Inverse NTT: `a` must be in bit-reversed NTT-domain order and length
	/// `n`; on return it holds the natural-order polynomial.
	pub fn backward(&self, a: &mut [u64]) {
		debug_assert_eq!(a.len(), self.n);
		self.backward_inner(a)
	}

	/// # Safety
	/// See [`Self::forward_vt`].
	pub unsafe fn backward_vt(&self, a: &mut [u64]) {
		self.backward_inner(a)
	}

	fn backward_inner(&self, a: &mut [u64]) {
		let n = self.n;
		let mut t = 1usize;
		let mut m = n;
		while m > 1 {
			let h = m >> 1;
			let mut j1 = 0usize;
			for i in 0..h {
				let j2 = j1 + t;
				let s = self.psi_inv_bitrev[h + i];
				let s_shoup = self.psi_inv_bitrev_shoup[h + i];
				for j in j1..j2 {
					let u = a[j];
					let v = a[j + t];
					a[j] = self.p.add(u, v);
					a[j + t] = self.p.mul_shoup(self.p.sub(u, v), s, s_shoup);
				}
				j1 += 2 * t;
			}
			t <<= 1;
			m >>= 1;
		}
		a.iter_mut()
			.for_each(|x| *x = self.p.mul_shoup(*x, self.ninv, self.ninv_shoup));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::zq::Modulus;

	#[test]
	fn forward_backward_is_identity() {
		let p = Modulus::new(4611686018326724609).unwrap();
		let n = 8;
		let ntt = NttOperator::new(&p, n).unwrap();
		let mut rng = rand::thread_rng();
		for _ in 0..20 {
			let original = p.random_vec(n, &mut rng);
			let mut a = original.clone();
			ntt.forward(&mut a);
			assert_ne!(a, original, "NTT should not be the identity in general");
			ntt.backward(&mut a);
			assert_eq!(a, original);
		}
	}

	#[test]
	fn pointwise_multiply_matches_schoolbook_negacyclic() {
		let p = Modulus::new(1153).unwrap();
		let n = 8;
		let ntt = NttOperator::new(&p, n).unwrap();

		let mut rng = rand::thread_rng();
		let a = p.random_vec(n, &mut rng);
		let b = p.random_vec(n, &mut rng);

		// Schoolbook negacyclic convolution mod X^n+1.
		let mut expected = vec![0u64; n];
		for i in 0..n {
			for j in 0..n {
				let prod = p.mul(a[i], b[j]);
				if i + j < n {
					expected[i + j] = p.add(expected[i + j], prod);
				} else {
					expected[(i + j) % n] = p.sub(expected[(i + j) % n], prod);
				}
			}
		}

		let mut a_ntt = a.clone();
		let mut b_ntt = b.clone();
		ntt.forward(&mut a_ntt);
		ntt.forward(&mut b_ntt);
		let mut c_ntt = vec![0u64; n];
		for i in 0..n {
			c_ntt[i] = p.mul(a_ntt[i], b_ntt[i]);
		}
		ntt.backward(&mut c_ntt);

		assert_eq!(c_ntt, expected);
	}

	#[test]
	fn rejects_non_ntt_friendly_modulus() {
		let p = Modulus::new(5).unwrap(); // 5 % 16 != 1
		assert!(NttOperator::new(&p, 8).is_none());
	}
}
