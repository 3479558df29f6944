//! [`Poly`]: an RNS-represented element of `R_Q = Z_Q[X]/(X^N+1)`.

use super::{traits::TryConvertFrom, Context, Representation};
use crate::errors::{Error, Result};
use itertools::izip;
use ndarray::{Array2, Axis};
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::rc::Rc;

/// A polynomial in `R_Q` stored as one row of residues per modulus in the
/// owning [`Context`]'s RNS basis.
///
/// Row `i` holds the degree-`N` coefficient vector reduced modulo `q_i`, in
/// whatever order [`Representation`] says: natural (`PowerBasis`) or
/// bit-reversed NTT-domain (`Ntt`/`NttShoup`).
#[derive(Clone, Debug)]
pub struct Poly {
	ctx: Rc<Context>,
	representation: Representation,
	allow_variable_time: bool,
	coefficients: Array2<u64>,
	coefficients_shoup: Option<Array2<u64>>,
}

impl PartialEq for Poly {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.ctx, &other.ctx) && self.representation == other.representation && self.coefficients == other.coefficients
	}
}
impl Eq for Poly {}

impl Poly {
	/// The context this polynomial was built from.
	pub fn ctx(&self) -> &Rc<Context> {
		&self.ctx
	}

	/// The current storage representation.
	pub const fn representation(&self) -> Representation {
		self.representation
	}

	/// Raw access to the residue rows, shape `(moduli.len(), degree)`.
	pub fn coefficients(&self) -> &Array2<u64> {
		&self.coefficients
	}

	/// Rebuilds a polynomial from raw residues already reduced modulo the
	/// context's primes, tagged with `representation`. Used by
	/// deserialization, where the wire format stores exactly these residue
	/// rows rather than a value to reduce.
	pub fn from_raw_residues(ctx: &Rc<Context>, representation: Representation, coefficients: Array2<u64>) -> Result<Self> {
		if coefficients.shape() != [ctx.size(), ctx.degree()] {
			return Err(Error::ConversionFailed(format!(
				"expected a ({}, {}) residue array, got {:?}",
				ctx.size(),
				ctx.degree(),
				coefficients.shape()
			)));
		}
		let stored_representation = if representation == Representation::NttShoup { Representation::Ntt } else { representation };
		let mut poly = Self {
			ctx: ctx.clone(),
			representation: stored_representation,
			allow_variable_time: false,
			coefficients,
			coefficients_shoup: None,
		};
		if representation == Representation::NttShoup {
			poly.change_representation(Representation::NttShoup);
		}
		Ok(poly)
	}

	/// Allows subsequent operations on this polynomial to run in variable
	/// time, i.e. to skip the constant-time masking in [`crate::zq::Modulus`].
	/// Safe only when this polynomial carries no secret information.
	///
	/// # Safety
	/// The caller vouches this polynomial (and anything derived from it
	/// while the flag is set) is safe to process in variable time.
	pub unsafe fn allow_variable_time_computations(&mut self) {
		self.allow_variable_time = true;
	}

	/// Forces constant-time arithmetic on this polynomial. Always safe:
	/// the reverse of [`Self::allow_variable_time_computations`].
	pub fn disallow_variable_time_computations(&mut self) {
		self.allow_variable_time = false;
	}

	/// Applies the Galois automorphism `X -> X^element` (`element` odd,
	/// `element < 2N`), the building block Galois (rotation) keys use to
	/// permute a ciphertext's underlying SIMD slots. Requires
	/// [`Representation::PowerBasis`].
	pub fn substitute(&self, element: u64) -> Result<Self> {
		if self.representation != Representation::PowerBasis {
			return Err(Error::IncompatibleRepresentation);
		}
		let degree = self.ctx.degree();
		let m = 2 * degree as u64;
		if element % 2 == 0 || element >= m {
			return Err(Error::OutOfRange(format!("{element} is not a valid Galois element mod {m}")));
		}

		let mut out = Self::zero_array(&self.ctx);
		for (mut out_row, in_row, q) in izip!(out.axis_iter_mut(Axis(0)), self.coefficients.axis_iter(Axis(0)), self.ctx.moduli_sized()) {
			for i in 0..degree {
				let dest = (i as u64 * element) % m;
				let (j, negate) = if dest < degree as u64 { (dest as usize, false) } else { (dest as usize - degree, true) };
				let v = in_row[i];
				out_row[j] = if negate { q.sub(out_row[j], v) } else { q.add(out_row[j], v) };
			}
		}

		Ok(Self {
			ctx: self.ctx.clone(),
			representation: self.representation,
			allow_variable_time: self.allow_variable_time,
			coefficients: out,
			coefficients_shoup: None,
		})
	}

	fn zero_array(ctx: &Context) -> Array2<u64> {
		Array2::zeros((ctx.size(), ctx.degree()))
	}

	/// Multiplies every coefficient by a fixed scalar, one residue per
	/// modulus in `scalars` (`scalars[i]` is applied to row `i`). Used to
	/// scale a plaintext polynomial by `Δ = ⌊q/t⌋` at encryption time.
	pub fn scalar_mul(&self, scalars: &[u64]) -> Self {
		debug_assert_eq!(scalars.len(), self.ctx.size());
		let mut out = self.coefficients.clone();
		for (mut row, q, &s) in izip!(out.axis_iter_mut(Axis(0)), self.ctx.moduli_sized(), scalars) {
			q.scalar_mul_vec(row.as_slice_mut().unwrap(), s);
		}
		Self {
			ctx: self.ctx.clone(),
			representation: self.representation,
			allow_variable_time: self.allow_variable_time,
			coefficients: out,
			coefficients_shoup: None,
		}
	}

	/// The zero polynomial.
	pub fn zero(ctx: &Rc<Context>, representation: Representation) -> Self {
		Self {
			ctx: ctx.clone(),
			representation,
			allow_variable_time: false,
			coefficients: Self::zero_array(ctx),
			coefficients_shoup: None,
		}
	}

	/// A uniformly random polynomial, sampled independently per residue.
	pub fn random<R: RngCore + CryptoRng>(ctx: &Rc<Context>, representation: Representation, rng: &mut R) -> Self {
		let mut coefficients = Self::zero_array(ctx);
		for (mut row, q) in coefficients.axis_iter_mut(Axis(0)).zip(ctx.moduli_sized()) {
			let sampled = q.random_vec(ctx.degree(), rng);
			row.iter_mut().zip(sampled).for_each(|(dst, v)| *dst = v);
		}
		let mut poly = Self {
			ctx: ctx.clone(),
			representation,
			allow_variable_time: false,
			coefficients,
			coefficients_shoup: None,
		};
		if representation == Representation::NttShoup {
			poly.compute_shoup();
		}
		poly
	}

	/// A uniformly random polynomial, deterministically derived from a
	/// 32-byte seed, used by fresh ciphertexts so the "`a`" component need
	/// not be serialized alongside its seed.
	pub fn random_from_seed(ctx: &Rc<Context>, representation: Representation, seed: [u8; 32]) -> Self {
		let mut rng = ChaCha8Rng::from_seed(seed);
		Self::random(ctx, representation, &mut rng)
	}

	/// A polynomial with ternary (`{-1, 0, 1}`) coefficients, the same
	/// signed value shared across every residue of the RNS basis. Used for
	/// secret keys and for the `u` term of asymmetric encryption.
	pub fn small_ternary<R: RngCore + CryptoRng>(ctx: &Rc<Context>, representation: Representation, rng: &mut R) -> Self {
		let signed: Vec<i64> = (0..ctx.degree())
			.map(|_| match rng.next_u32() % 3 {
				0 => -1,
				1 => 0,
				_ => 1,
			})
			.collect();
		Self::from_signed(ctx, representation, &signed)
	}

	/// A polynomial whose coefficients are drawn from a discrete Gaussian of
	/// standard deviation `std_dev`, clipped at `max_deviation` standard
	/// deviations as SEAL's noise sampler does, shared across the RNS basis.
	pub fn small_gaussian<R: RngCore + CryptoRng>(
		ctx: &Rc<Context>,
		representation: Representation,
		std_dev: f64,
		max_deviation: f64,
		rng: &mut R,
	) -> Self {
		let normal = Normal::new(0.0, std_dev).unwrap();
		let bound = std_dev * max_deviation;
		let signed: Vec<i64> = (0..ctx.degree())
			.map(|_| {
				let mut sample = normal.sample(rng);
				sample = sample.clamp(-bound, bound);
				sample.round() as i64
			})
			.collect();
		Self::from_signed(ctx, representation, &signed)
	}

	fn from_signed(ctx: &Rc<Context>, representation: Representation, signed: &[i64]) -> Self {
		let mut coefficients = Self::zero_array(ctx);
		for (mut row, q) in coefficients.axis_iter_mut(Axis(0)).zip(ctx.moduli_sized()) {
			for (dst, &v) in row.iter_mut().zip(signed) {
				*dst = if v < 0 {
					q.modulus() - ((-v) as u64 % q.modulus())
				} else {
					v as u64 % q.modulus()
				};
			}
		}
		let mut poly = Self {
			ctx: ctx.clone(),
			representation,
			allow_variable_time: false,
			coefficients,
			coefficients_shoup: None,
		};
		if representation == Representation::NttShoup {
			poly.compute_shoup();
		}
		poly
	}

	fn compute_shoup(&mut self) {
		let mut shoup = Self::zero_array(&self.ctx);
		for (mut dst, src, q) in izip!(shoup.axis_iter_mut(Axis(0)), self.coefficients.axis_iter(Axis(0)), self.ctx.moduli_sized()) {
			let computed = q.shoup_vec(src.as_slice().unwrap());
			dst.iter_mut().zip(computed).for_each(|(d, v)| *d = v);
		}
		self.coefficients_shoup = Some(shoup);
	}

	/// Moves this polynomial into `to`, running the forward or inverse NTT
	/// per residue as needed.
	pub fn change_representation(&mut self, to: Representation) {
		if self.representation == to {
			return;
		}
		match (self.representation, to) {
			(Representation::PowerBasis, Representation::Ntt) | (Representation::PowerBasis, Representation::NttShoup) => {
				for (mut row, ntt) in self.coefficients.axis_iter_mut(Axis(0)).zip(self.ctx.ntt_ops()) {
					let slice = row.as_slice_mut().unwrap();
					if self.allow_variable_time {
						unsafe { ntt.forward_vt(slice) }
					} else {
						ntt.forward(slice)
					}
				}
				self.representation = Representation::Ntt;
				if to == Representation::NttShoup {
					self.compute_shoup();
					self.representation = Representation::NttShoup;
				}
			}
			(Representation::Ntt, Representation::PowerBasis) => {
				for (mut row, ntt) in self.coefficients.axis_iter_mut(Axis(0)).zip(self.ctx.ntt_ops()) {
					let slice = row.as_slice_mut().unwrap();
					if self.allow_variable_time {
						unsafe { ntt.backward_vt(slice) }
					} else {
						ntt.backward(slice)
					}
				}
				self.representation = Representation::PowerBasis;
			}
			(Representation::Ntt, Representation::NttShoup) => {
				self.compute_shoup();
				self.representation = Representation::NttShoup;
			}
			(Representation::NttShoup, Representation::Ntt) => {
				self.coefficients_shoup = None;
				self.representation = Representation::Ntt;
			}
			(Representation::NttShoup, Representation::PowerBasis) => {
				self.coefficients_shoup = None;
				self.representation = Representation::Ntt;
				self.change_representation(Representation::PowerBasis);
			}
			_ => unreachable!(),
		}
	}

	/// Drops the last prime of the RNS basis, rounding the remaining
	/// residues so the represented integer is `round(x / q_last)`. `to`
	/// must be a context built from this polynomial's moduli minus the last
	/// one. Requires [`Representation::PowerBasis`].
	pub fn mod_switch_down_next(&self, to: &Rc<Context>) -> Result<Self> {
		if self.representation != Representation::PowerBasis {
			return Err(Error::IncompatibleRepresentation);
		}
		if to.size() + 1 != self.ctx.size() || to.degree() != self.ctx.degree() {
			return Err(Error::IncompatibleContexts);
		}
		let from_moduli = self.ctx.moduli_sized();
		let q_last = from_moduli[from_moduli.len() - 1];
		let q_last_half = q_last.modulus() / 2;

		let last_row = self.coefficients.index_axis(Axis(0), self.coefficients.nrows() - 1);
		let mut out = Array2::zeros((to.size(), to.degree()));
		for (mut dst_row, src_row, qi) in izip!(out.axis_iter_mut(Axis(0)), self.coefficients.axis_iter(Axis(0)), to.moduli_sized()) {
			let q_last_mod_qi = q_last.modulus() % qi.modulus();
			let inv = qi.inv(q_last_mod_qi).ok_or(Error::IncompatibleContexts)?;
			for (dst, &ci, &c_last) in izip!(dst_row.iter_mut(), src_row.iter(), last_row.iter()) {
				let c_last_mod_qi = if c_last > q_last_half {
					qi.sub(0, (q_last.modulus() - c_last) % qi.modulus())
				} else {
					c_last % qi.modulus()
				};
				*dst = qi.mul(qi.sub(ci % qi.modulus(), c_last_mod_qi), inv);
			}
		}
		Ok(Self {
			ctx: to.clone(),
			representation: Representation::PowerBasis,
			allow_variable_time: self.allow_variable_time,
			coefficients: out,
			coefficients_shoup: None,
		})
	}

	/// Repeatedly drops primes until reaching `to`'s basis size.
	pub fn mod_switch_down_to(&self, to: &Rc<Context>) -> Result<Self> {
		if to.size() > self.ctx.size() {
			return Err(Error::IncompatibleContexts);
		}
		if to.size() == self.ctx.size() {
			if !Rc::ptr_eq(&self.ctx, to) {
				return Err(Error::IncompatibleContexts);
			}
			return Ok(self.clone());
		}
		// Building the chain of intermediate contexts is the caller's job in
		// the teacher's design (contexts form a precomputed level chain);
		// here we only support a direct one-step drop for simplicity, which
		// is what every call site in this crate needs.
		self.mod_switch_down_next(to)
	}
}

impl TryConvertFrom<&[i64]> for Poly {
	fn try_convert_from(value: &[i64], ctx: &Rc<Context>, variable_time: bool, representation: Representation) -> Result<Self> {
		if value.len() != ctx.degree() {
			return Err(Error::ConversionFailed(format!(
				"expected {} coefficients, got {}",
				ctx.degree(),
				value.len()
			)));
		}
		let mut poly = Self::from_signed(ctx, Representation::PowerBasis, value);
		poly.allow_variable_time = variable_time;
		if representation != Representation::PowerBasis {
			poly.change_representation(representation);
		}
		Ok(poly)
	}
}

impl TryConvertFrom<&[u64]> for Poly {
	fn try_convert_from(value: &[u64], ctx: &Rc<Context>, variable_time: bool, representation: Representation) -> Result<Self> {
		if value.len() != ctx.degree() {
			return Err(Error::ConversionFailed(format!(
				"expected {} coefficients, got {}",
				ctx.degree(),
				value.len()
			)));
		}
		let mut coefficients = Self::zero_array(ctx);
		for (mut row, q) in coefficients.axis_iter_mut(Axis(0)).zip(ctx.moduli_sized()) {
			for (dst, &v) in row.iter_mut().zip(value) {
				*dst = v % q.modulus();
			}
		}
		let mut poly = Self {
			ctx: ctx.clone(),
			representation: Representation::PowerBasis,
			allow_variable_time: variable_time,
			coefficients,
			coefficients_shoup: None,
		};
		if representation != Representation::PowerBasis {
			poly.change_representation(representation);
		}
		Ok(poly)
	}
}

impl TryConvertFrom<&[BigUint]> for Poly {
	fn try_convert_from(value: &[BigUint], ctx: &Rc<Context>, variable_time: bool, representation: Representation) -> Result<Self> {
		if value.len() != ctx.degree() {
			return Err(Error::ConversionFailed(format!(
				"expected {} coefficients, got {}",
				ctx.degree(),
				value.len()
			)));
		}
		let mut coefficients = Self::zero_array(ctx);
		for (mut row, q) in coefficients.axis_iter_mut(Axis(0)).zip(ctx.moduli_sized()) {
			for (dst, v) in row.iter_mut().zip(value) {
				let r = v % BigUint::from(q.modulus());
				*dst = r.to_u64_digits().first().copied().unwrap_or(0);
			}
		}
		let mut poly = Self {
			ctx: ctx.clone(),
			representation: Representation::PowerBasis,
			allow_variable_time: variable_time,
			coefficients,
			coefficients_shoup: None,
		};
		if representation != Representation::PowerBasis {
			poly.change_representation(representation);
		}
		Ok(poly)
	}
}

impl From<&Poly> for Vec<BigUint> {
	/// Reconstructs every coefficient as a `BigUint` in `[0, Q)` via CRT.
	fn from(poly: &Poly) -> Self {
		debug_assert_eq!(poly.representation, Representation::PowerBasis);
		let rns = poly.ctx.rns();
		(0..poly.ctx.degree())
			.map(|j| {
				let residues: Vec<u64> = poly.coefficients.column(j).to_vec();
				rns.lift(&residues)
			})
			.collect()
	}
}

macro_rules! binop_poly {
	($trait:ident, $method:ident, $modop:ident) => {
		impl $trait<&Poly> for &Poly {
			type Output = Poly;
			fn $method(self, rhs: &Poly) -> Poly {
				assert!(Rc::ptr_eq(&self.ctx, &rhs.ctx), "incompatible contexts");
				assert_eq!(self.representation, rhs.representation, "incompatible representations");
				let mut out = self.coefficients.clone();
				for (mut row, other, q) in izip!(out.axis_iter_mut(Axis(0)), rhs.coefficients.axis_iter(Axis(0)), self.ctx.moduli_sized()) {
					q.$modop(row.as_slice_mut().unwrap(), other.as_slice().unwrap());
				}
				Poly {
					ctx: self.ctx.clone(),
					representation: self.representation,
					allow_variable_time: self.allow_variable_time && rhs.allow_variable_time,
					coefficients: out,
					coefficients_shoup: None,
				}
			}
		}
	};
}

binop_poly!(Add, add, add_vec);
binop_poly!(Sub, sub, sub_vec);

impl Neg for &Poly {
	type Output = Poly;
	fn neg(self) -> Poly {
		let mut out = self.coefficients.clone();
		for (mut row, q) in out.axis_iter_mut(Axis(0)).zip(self.ctx.moduli_sized()) {
			q.neg_vec(row.as_slice_mut().unwrap());
		}
		Poly {
			ctx: self.ctx.clone(),
			representation: self.representation,
			allow_variable_time: self.allow_variable_time,
			coefficients: out,
			coefficients_shoup: None,
		}
	}
}

impl Mul<&Poly> for &Poly {
	type Output = Poly;
	/// Pointwise multiplication in NTT domain. At least one operand must be
	/// `NttShoup` (which carries the precomputed Shoup tables); the other
	/// must be `Ntt`.
	fn mul(self, rhs: &Poly) -> Poly {
		assert!(Rc::ptr_eq(&self.ctx, &rhs.ctx), "incompatible contexts");
		let (shoup_operand, plain_operand) = match (self.representation, rhs.representation) {
			(Representation::NttShoup, Representation::Ntt) => (self, rhs),
			(Representation::Ntt, Representation::NttShoup) => (rhs, self),
			(Representation::Ntt, Representation::Ntt) => {
				let mut out = self.coefficients.clone();
				for (mut row, other, q) in izip!(out.axis_iter_mut(Axis(0)), rhs.coefficients.axis_iter(Axis(0)), self.ctx.moduli_sized())
				{
					q.mul_vec(row.as_slice_mut().unwrap(), other.as_slice().unwrap());
				}
				return Poly {
					ctx: self.ctx.clone(),
					representation: Representation::Ntt,
					allow_variable_time: self.allow_variable_time && rhs.allow_variable_time,
					coefficients: out,
					coefficients_shoup: None,
				};
			}
			_ => panic!("multiplication requires both operands in NTT domain"),
		};
		let shoup_table = shoup_operand.coefficients_shoup.as_ref().expect("NttShoup poly missing shoup table");
		let mut out = plain_operand.coefficients.clone();
		for (mut row, base, shoup, q) in izip!(
			out.axis_iter_mut(Axis(0)),
			shoup_operand.coefficients.axis_iter(Axis(0)),
			shoup_table.axis_iter(Axis(0)),
			self.ctx.moduli_sized()
		) {
			q.mul_shoup_vec(row.as_slice_mut().unwrap(), base.as_slice().unwrap(), shoup.as_slice().unwrap());
		}
		Poly {
			ctx: self.ctx.clone(),
			representation: Representation::Ntt,
			allow_variable_time: self.allow_variable_time && rhs.allow_variable_time,
			coefficients: out,
			coefficients_shoup: None,
		}
	}
}

impl AddAssign<&Poly> for Poly {
	fn add_assign(&mut self, rhs: &Poly) {
		*self = &*self + rhs;
	}
}
impl SubAssign<&Poly> for Poly {
	fn sub_assign(&mut self, rhs: &Poly) {
		*self = &*self - rhs;
	}
}
impl MulAssign<&Poly> for Poly {
	fn mul_assign(&mut self, rhs: &Poly) {
		*self = &*self * rhs;
	}
}

impl zeroize::Zeroize for Poly {
	fn zeroize(&mut self) {
		self.coefficients.iter_mut().for_each(|x| *x = 0);
		if let Some(shoup) = self.coefficients_shoup.as_mut() {
			shoup.iter_mut().for_each(|x| *x = 0);
		}
	}
}
