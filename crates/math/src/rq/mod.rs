//! RNS-represented polynomials in `R_Q = Z_Q[X]/(X^N+1)`, `Q = prod(q_i)`.

pub mod poly;
pub mod scaler;
pub mod traits;

pub use poly::Poly;
pub use scaler::{Scaler, ScalingFactor};

use crate::errors::{Error, Result};
use crate::rns::RnsContext;
use crate::zq::{ntt::NttOperator, Modulus};

/// The domain a [`Poly`] is currently stored in.
///
/// `PowerBasis` holds coefficients in natural order; `Ntt` holds the
/// bit-reversed NTT-domain evaluation of each residue; `NttShoup`
/// additionally carries a precomputed Shoup multiplier for every
/// coefficient, used when this polynomial is the fixed multiplicand of many
/// plaintext-scalar multiplications (e.g. a Galois or relinearization key
/// component).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Representation {
	PowerBasis,
	Ntt,
	NttShoup,
}

/// The immutable parameters shared by every [`Poly`] built from it: the
/// ring degree, the RNS basis `{q_0, ..., q_{k-1}}`, and one [`NttOperator`]
/// per modulus.
///
/// Contexts are cheap to share (wrapped in `Rc` by callers) and compare
/// equal only by pointer identity at the [`Poly`] level — two structurally
/// identical contexts built separately are deliberately treated as
/// incompatible, matching the "same parameters, same context" convention
/// the BFV layer relies on to catch accidental cross-parameter operations.
#[derive(Debug)]
pub struct Context {
	degree: usize,
	moduli: Vec<Modulus>,
	moduli_u64: Vec<u64>,
	ntt_ops: Vec<Option<NttOperator>>,
	rns: RnsContext,
}

impl PartialEq for Context {
	fn eq(&self, other: &Self) -> bool {
		std::ptr::eq(self, other)
	}
}
impl Eq for Context {}

impl Context {
	/// Builds a context for a ring of the given `degree` over the RNS basis
	/// `moduli`. Every modulus must be prime, fit in 62 bits, and admit a
	/// primitive `2*degree`-th root of unity.
	pub fn new(moduli: &[u64], degree: usize) -> Result<Self> {
		if !degree.is_power_of_two() || degree < 8 {
			log::error!("Context::new: degree {degree} is not a power of two >= 8");
			return Err(Error::InvalidDegree);
		}
		let moduli_typed = moduli
			.iter()
			.map(|&m| Modulus::new(m))
			.collect::<Result<Vec<_>>>()?;
		let ntt_ops = moduli_typed
			.iter()
			.map(|m| {
				NttOperator::new(m, degree).ok_or_else(|| {
					log::error!("Context::new: modulus {} admits no primitive {}-th root of unity", m.modulus(), 2 * degree);
					Error::NoNttOperator
				})
			})
			.collect::<Result<Vec<_>>>()?;
		let rns = RnsContext::new(moduli)?;
		log::debug!("Context::new: built a {}-limb context at degree {degree}", moduli.len());
		Ok(Self {
			degree,
			moduli: moduli_typed,
			moduli_u64: moduli.to_vec(),
			ntt_ops,
			rns,
		})
	}

	/// The ring degree `N`.
	pub const fn degree(&self) -> usize {
		self.degree
	}

	/// The RNS basis this context was built with.
	pub fn moduli(&self) -> &[u64] {
		&self.moduli_u64
	}

	pub(crate) fn moduli_sized(&self) -> &[Modulus] {
		&self.moduli
	}

	pub(crate) fn ntt_ops(&self) -> &[NttOperator] {
		&self.ntt_ops
	}

	/// The CRT context over this basis, used to reconstruct a polynomial's
	/// coefficients as `BigUint`s.
	pub fn rns(&self) -> &RnsContext {
		&self.rns
	}

	/// Number of RNS limbs (`len(moduli)`).
	pub fn size(&self) -> usize {
		self.moduli.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_non_power_of_two_degree() {
		assert!(Context::new(&[1153], 6).is_err());
	}

	#[test]
	fn builds_with_ntt_friendly_moduli() {
		let ctx = Context::new(&[1153], 8).unwrap();
		assert_eq!(ctx.degree(), 8);
		assert_eq!(ctx.size(), 1);
	}

	#[test]
	fn rejects_non_ntt_friendly_moduli() {
		assert!(Context::new(&[5], 8).is_err());
	}
}
