//! Error type for the `fhe-math` crate.

/// Errors that can occur when constructing or operating on moduli, NTT
/// operators, RNS contexts, and ring-polynomial contexts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// A modulus was out of the supported range (must fit in 62 bits and be
	/// at least 2).
	#[error("modulus should be between 2 and 2^62-1")]
	InvalidModulus,

	/// No primitive `2N`-th root of unity exists modulo `p`, so no NTT
	/// operator can be built for this `(p, N)` pair.
	#[error("Impossible to construct a Ntt operator")]
	NoNttOperator,

	/// The requested ring degree is not a power of two, or is too small.
	#[error("the polynomial degree must be a power of two")]
	InvalidDegree,

	/// Two polynomials (or a polynomial and a context) were combined while
	/// carrying incompatible moduli or degree.
	#[error("incompatible contexts")]
	IncompatibleContexts,

	/// An operation required a specific [`crate::rq::Representation`] and
	/// the operand was in a different one.
	#[error("invalid representation for this operation")]
	IncompatibleRepresentation,

	/// A resize (or other mutation that would reallocate) was attempted on
	/// a polynomial or modulus-vector that wraps externally-owned storage.
	#[error("cannot resize an aliased buffer")]
	AliasViolation,

	/// A value supplied to a constructor or accessor fell outside its
	/// documented valid range.
	#[error("{0}")]
	OutOfRange(String),

	/// A `BigUint`/coefficient conversion failed because the value did not
	/// fit in the destination ring or slice.
	#[error("conversion failed: {0}")]
	ConversionFailed(String),
}

/// Convenience alias for `fhe-math` results.
pub type Result<T> = std::result::Result<T, Error>;
