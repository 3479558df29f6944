//! Error type for the `fhe-bfv` crate, per the error taxonomy every
//! evaluator operation is specified to raise on a precondition violation.

/// Errors the BFV scheme's public API can return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// `N` was not a power of two, a ciphertext prime was not `≡ 1 mod 2N`,
	/// the plaintext modulus was too large, or `σ ≤ 0`.
	#[error("invalid parameters: {0}")]
	InvalidParameters(String),

	/// Two or more operands did not share a parameter fingerprint.
	#[error("fingerprint mismatch between operands")]
	FingerprintMismatch,

	/// Ciphertext sizes or NTT-form flags disagreed with an operation's
	/// preconditions.
	#[error("shape mismatch: {0}")]
	ShapeMismatch(String),

	/// A required resize would have mutated externally-owned storage.
	#[error("cannot resize an aliased buffer")]
	AliasViolation,

	/// An index, bit count, exponent, or decomposition base fell outside
	/// its permitted interval.
	#[error("value out of range: {0}")]
	OutOfRange(String),

	/// Memory pool allocation failed.
	#[error("memory pool exhausted")]
	PoolExhausted,

	/// Decoding would have produced a value beyond the requested integer
	/// width. Off by default (see [`crate::encoding`]) to avoid a timing
	/// side channel that could leak key bits.
	#[error("decoded value overflows the requested width")]
	DecoderOverflow,

	/// A lower-level `fhe-math` failure (degenerate modulus, no NTT root,
	/// incompatible contexts) propagated without a scheme-level wrapper.
	#[error(transparent)]
	Math(#[from] fhe_math::Error),
}

/// Convenience alias for `fhe-bfv` results.
pub type Result<T> = std::result::Result<T, Error>;
