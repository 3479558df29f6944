//! Single-word modular arithmetic modulo a prime that fits in 62 bits.
//!
//! [`Modulus`] precomputes a 128-bit Barrett reduction constant once at
//! construction time and reuses it for every `mul`. Every modulus that backs
//! a ciphertext or NTT-domain plaintext must be at most 62 bits so that the
//! full product of two residues fits in a single `u128` multiply.

pub mod ntt;
pub mod primes;

use crate::errors::{Error, Result};
use itertools::{izip, Itertools};
use rand::{seq::SliceRandom, CryptoRng, RngCore};
use std::fmt::Debug;

/// The maximum number of bits a ciphertext modulus may occupy.
pub const MAX_MODULUS_BITS: u32 = 62;

/// A prime modulus `p < 2^62`, together with precomputed Barrett reduction
/// constants for fast `add`/`sub`/`mul`/`neg`.
///
/// Cloning a `Modulus` is cheap (all fields are `Copy`); it is designed to be
/// shared by value across polynomial coefficients rather than referenced.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Modulus {
	p: u64,
	/// High 64 bits of `floor(2^128 / p)`.
	barrett_hi: u64,
	/// Low 64 bits of `floor(2^128 / p)`.
	barrett_lo: u64,
	/// `2 * p`, cached for the two-subtraction Barrett correction.
	p_twice: u64,
	leading_zeros: u32,
}

impl Debug for Modulus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Modulus").field("p", &self.p).finish()
	}
}

/// Computes the high 128 bits of the full 256-bit product `x * y`.
fn mulhi128(x: u128, y: u128) -> u128 {
	let x0 = x & u64::MAX as u128;
	let x1 = x >> 64;
	let y0 = y & u64::MAX as u128;
	let y1 = y >> 64;

	let ll = x0 * y0;
	let lh = x0 * y1;
	let hl = x1 * y0;
	let hh = x1 * y1;

	let ll_hi = ll >> 64;
	let (mid, carry1) = lh.overflowing_add(hl);
	let (mid, carry2) = mid.overflowing_add(ll_hi);
	let carry = (carry1 as u128) + (carry2 as u128);

	hh + (mid >> 64) + (carry << 64)
}

impl Modulus {
	/// Creates a [`Modulus`] from a prime `p` with `2 <= p < 2^62`.
	///
	/// The caller is responsible for `p` being prime; a non-prime modulus
	/// will silently produce a ring with zero divisors rather than an error
	/// (as in the reference C++ implementation this crate is modeled on).
	pub fn new(p: u64) -> Result<Self> {
		if p < 2 || (p.leading_zeros()) < (64 - MAX_MODULUS_BITS) {
			return Err(Error::InvalidModulus);
		}
		let barrett = barrett_constant(p);
		Ok(Self {
			p,
			barrett_hi: (barrett >> 64) as u64,
			barrett_lo: barrett as u64,
			p_twice: p << 1,
			leading_zeros: p.leading_zeros(),
		})
	}

	/// Returns the prime `p`.
	pub const fn modulus(&self) -> u64 {
		self.p
	}

	fn barrett(&self) -> u128 {
		((self.barrett_hi as u128) << 64) | self.barrett_lo as u128
	}

	/// Reduces `a` into `[0, p)`, assuming `a < p^2`.
	pub fn reduce(&self, a: u64) -> u64 {
		self.reduce_u128(a as u128)
	}

	fn reduce_u128(&self, a: u128) -> u64 {
		debug_assert!(a < 1u128 << 124);
		let q = mulhi128(a, self.barrett());
		let mut r = (a.wrapping_sub(q * self.p as u128)) as u64;
		// The Barrett approximation can be off by up to 2, so at most two
		// conditional subtractions are needed; both are expressed as a
		// branchless mask so they do not leak `r`'s magnitude through a
		// data-dependent branch.
		let mask = 0u64.wrapping_sub((r >= self.p) as u64);
		r -= mask & self.p;
		let mask = 0u64.wrapping_sub((r >= self.p) as u64);
		r -= mask & self.p;
		r
	}

	/// Returns `(a + b) mod p`. Requires `a, b < p`.
	pub fn add(&self, a: u64, b: u64) -> u64 {
		debug_assert!(a < self.p && b < self.p);
		let s = a + b;
		let mask = 0u64.wrapping_sub((s >= self.p) as u64);
		s - (mask & self.p)
	}

	/// Returns `(a - b) mod p`. Requires `a, b < p`.
	pub fn sub(&self, a: u64, b: u64) -> u64 {
		debug_assert!(a < self.p && b < self.p);
		let d = a.wrapping_sub(b);
		let mask = 0u64.wrapping_sub((a < b) as u64);
		d.wrapping_add(mask & self.p)
	}

	/// Returns `(a * b) mod p`. Requires `a, b < p`.
	pub fn mul(&self, a: u64, b: u64) -> u64 {
		debug_assert!(a < self.p && b < self.p);
		self.reduce_u128(a as u128 * b as u128)
	}

	/// Returns `-a mod p`. Requires `a < p`.
	pub fn neg(&self, a: u64) -> u64 {
		debug_assert!(a < self.p);
		let mask = 0u64.wrapping_sub((a != 0) as u64);
		(self.p - a) & mask
	}

	/// Returns `a^e mod p` by square-and-multiply.
	pub fn pow(&self, a: u64, mut e: u64) -> u64 {
		debug_assert!(a < self.p);
		let mut base = a;
		let mut acc = 1u64 % self.p;
		while e > 0 {
			if e & 1 == 1 {
				acc = self.mul(acc, base);
			}
			base = self.mul(base, base);
			e >>= 1;
		}
		acc
	}

	/// Returns the modular inverse of `a`, or `None` if `gcd(a, p) != 1`.
	pub fn inv(&self, a: u64) -> Option<u64> {
		if a == 0 {
			return None;
		}
		let (g, x, _) = extended_gcd(a as i128, self.p as i128);
		if g != 1 {
			return None;
		}
		Some(x.rem_euclid(self.p as i128) as u64)
	}

	/// Number of bits needed to represent `p`.
	pub fn bitlen(&self) -> usize {
		(64 - self.leading_zeros) as usize
	}

	// ---- Shoup (pre-conditioned) multiplication ----

	/// Precomputes the Shoup multiplier `floor(b * 2^64 / p)` for a fixed
	/// `b < p`, enabling a branch-light single-pass multiply-and-reduce used
	/// by the NTT butterflies and by plaintext-NTT scalar multiplies.
	pub fn shoup(&self, b: u64) -> u64 {
		debug_assert!(b < self.p);
		(((b as u128) << 64) / self.p as u128) as u64
	}

	/// Multiplies `a` by `b` using its precomputed Shoup multiplier
	/// `b_shoup = shoup(b)`. Requires `a < p`.
	pub fn mul_shoup(&self, a: u64, b: u64, b_shoup: u64) -> u64 {
		let q = (((a as u128) * (b_shoup as u128)) >> 64) as u64;
		let r = (a.wrapping_mul(b)).wrapping_sub(q.wrapping_mul(self.p));
		let mask = 0u64.wrapping_sub((r >= self.p) as u64);
		r - (mask & self.p)
	}

	// ---- vectorized operations ----

	/// `a[i] = (a[i] + b[i]) mod p` for all `i`.
	pub fn add_vec(&self, a: &mut [u64], b: &[u64]) {
		izip!(a, b).for_each(|(x, y)| *x = self.add(*x, *y));
	}

	/// Variable-time variant of [`Self::add_vec`]; only safe over non-secret
	/// (already-public) data such as ciphertext coefficients.
	///
	/// # Safety
	/// The caller must ensure neither operand leaks secret information
	/// through timing side channels, e.g. because both are already public.
	pub unsafe fn add_vec_vt(&self, a: &mut [u64], b: &[u64]) {
		izip!(a, b).for_each(|(x, y)| {
			*x += *y;
			if *x >= self.p {
				*x -= self.p
			}
		});
	}

	/// `a[i] = (a[i] - b[i]) mod p` for all `i`.
	pub fn sub_vec(&self, a: &mut [u64], b: &[u64]) {
		izip!(a, b).for_each(|(x, y)| *x = self.sub(*x, *y));
	}

	/// `a[i] = -a[i] mod p` for all `i`.
	pub fn neg_vec(&self, a: &mut [u64]) {
		a.iter_mut().for_each(|x| *x = self.neg(*x));
	}

	/// `a[i] = (a[i] * b[i]) mod p` for all `i`.
	pub fn mul_vec(&self, a: &mut [u64], b: &[u64]) {
		izip!(a, b).for_each(|(x, y)| *x = self.mul(*x, *y));
	}

	/// # Safety
	/// See [`Self::add_vec_vt`].
	pub unsafe fn mul_vec_vt(&self, a: &mut [u64], b: &[u64]) {
		izip!(a, b).for_each(|(x, y)| *x = self.reduce_u128(*x as u128 * *y as u128));
	}

	/// `a[i] = (a[i] * scalar) mod p` for all `i`.
	pub fn scalar_mul_vec(&self, a: &mut [u64], scalar: u64) {
		let scalar = scalar % self.p;
		a.iter_mut().for_each(|x| *x = self.mul(*x, scalar));
	}

	/// Precomputes the Shoup multiplier for every element of `b`.
	pub fn shoup_vec(&self, b: &[u64]) -> Vec<u64> {
		b.iter().map(|&bi| self.shoup(bi)).collect_vec()
	}

	/// `a[i] = mul_shoup(a[i], b[i], b_shoup[i])` for all `i`.
	pub fn mul_shoup_vec(&self, a: &mut [u64], b: &[u64], b_shoup: &[u64]) {
		izip!(a, b, b_shoup).for_each(|(x, y, ys)| *x = self.mul_shoup(*x, *y, *ys));
	}

	/// Reduces every element of `a` modulo `p` in place, from an
	/// unconstrained `u64` input.
	pub fn reduce_vec(&self, a: &mut [u64]) {
		a.iter_mut().for_each(|x| *x %= self.p);
	}

	/// Returns a uniformly random vector of `size` residues in `[0, p)`.
	pub fn random_vec<R: RngCore + CryptoRng>(&self, size: usize, rng: &mut R) -> Vec<u64> {
		// Rejection sampling against the next power of two above p keeps the
		// distribution exactly uniform without a modulo-bias.
		let mask = (1u64 << (64 - self.leading_zeros)) - 1;
		(0..size)
			.map(|_| loop {
				let candidate = rng.next_u64() & mask;
				if candidate < self.p {
					return candidate;
				}
			})
			.collect_vec()
	}

	/// Samples `size` coefficients from a centered binomial-like ternary
	/// distribution in `{-1, 0, 1}` represented as residues in `[0, p)`,
	/// used for secret keys and for the small-error terms of a fresh
	/// encryption when no Gaussian sampler is desired.
	pub fn random_ternary_vec<R: RngCore + CryptoRng>(&self, size: usize, rng: &mut R) -> Vec<u64> {
		let choices = [self.p - 1, 0, 1];
		(0..size)
			.map(|_| *choices.choose(rng).unwrap())
			.collect_vec()
	}
}

/// Computes `(g, x, y)` such that `a*x + b*y = g = gcd(a, b)`, for `a, b >= 0`.
fn extended_gcd(a: i128, b: i128) -> (i128, i128, i128) {
	if b == 0 {
		(a, 1, 0)
	} else {
		let (g, x1, y1) = extended_gcd(b, a % b);
		(g, y1, x1 - (a / b) * y1)
	}
}

fn barrett_constant(p: u64) -> u128 {
	// floor(2^128 / p), computed without a native 256-bit division:
	// 2^128 = (q1 * p + r1) * 2^64 where q1 = floor(2^64/p), r1 = 2^64 mod p,
	// so floor(2^128/p) = q1*2^64 + floor(r1*2^64/p).
	let p = p as u128;
	let pow64 = 1u128 << 64;
	let q1 = pow64 / p;
	let r1 = pow64 % p;
	q1 * pow64 + (r1 << 64) / p
}
