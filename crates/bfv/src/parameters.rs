//! Parameters for the BFV encryption scheme: the ring degree, the RNS
//! ciphertext basis, the plaintext modulus, and the noise distribution fresh
//! ciphertexts are sampled with.

use crate::error::{Error, Result};
use crate::fingerprint::{self, Fingerprint};
use derive_builder::Builder;
use fhe_math::{
	rq::{Context, Scaler, ScalingFactor},
	zq::{ntt::NttOperator, primes::generate_prime, Modulus},
};
use num_bigint::BigUint;
use std::rc::Rc;

/// The extended-basis machinery BFV multiplication needs to compute a
/// degree-doubled tensor product without overflowing `Q`, then scale the
/// result back down by `t/Q` into the original ciphertext basis.
///
/// Grounded on `fhe.rs`'s `MultiplicationParameters`: the same basis
/// extension is reused for both multiplicands (the extension changes only
/// the polynomial's representation, not the value it encodes), so a single
/// [`Scaler`] suffices where the historical implementation kept two
/// structurally-identical ones.
#[derive(Debug)]
pub(crate) struct MultiplicationParameters {
	pub(crate) extended_ctx: Rc<Context>,
	pub(crate) extender: Scaler,
	pub(crate) down_scaler: Scaler,
}

impl MultiplicationParameters {
	fn new(ctx: &Rc<Context>, plaintext_modulus: u64, degree: usize) -> Result<Self> {
		let q = ctx.rns().modulus().clone();
		let extra_bits = 2 * q.bits() + (degree as u64).bits() + 1;
		let n_extra = ((extra_bits as usize) + 61) / 62;

		let mut extra_moduli: Vec<u64> = Vec::with_capacity(n_extra);
		let mut upper_bound = 1u64 << 62;
		for _ in 0..n_extra {
			loop {
				let candidate = generate_prime(62, 2 * degree as u64, upper_bound)
					.ok_or_else(|| Error::InvalidParameters("exhausted extension primes".to_string()))?;
				upper_bound = candidate;
				if !ctx.moduli().contains(&candidate) && !extra_moduli.contains(&candidate) {
					extra_moduli.push(candidate);
					break;
				}
			}
		}

		let mut combined = ctx.moduli().to_vec();
		combined.extend_from_slice(&extra_moduli);
		let extended_ctx = Rc::new(Context::new(&combined, degree)?);

		let extender = Scaler::new(ctx, &extended_ctx, ScalingFactor::one())?;
		let down_scaler = Scaler::new(
			&extended_ctx,
			ctx,
			ScalingFactor::new(BigUint::from(plaintext_modulus), q),
		)?;

		Ok(Self {
			extended_ctx,
			extender,
			down_scaler,
		})
	}
}

/// The subset of [`BfvParameters`] exposed to callers for construction. The
/// derived fields (the RNS context, `Δ`, the multiplication and decryption
/// scalers, the batching index map, the fingerprint...) are computed once,
/// eagerly, by [`BfvParametersBuilder::build`] rather than lazily, since
/// every one of them is needed by the time a key or ciphertext is created.
#[derive(Clone, Debug, Builder)]
#[builder(build_fn(private, name = "fallible_build"), setter(into))]
struct BfvParametersSpec {
	polynomial_degree: usize,
	plaintext_modulus: u64,
	#[builder(default)]
	ciphertext_moduli: Vec<u64>,
	#[builder(default)]
	ciphertext_moduli_sizes: Vec<usize>,
	/// Discrete-Gaussian standard deviation for fresh noise.
	#[builder(default = "3.2")]
	noise_std_dev: f64,
	/// Clip bound on the discrete Gaussian, in multiples of `noise_std_dev`.
	#[builder(default = "6.0")]
	noise_max_deviation: f64,
}

/// Builds a [`BfvParameters`] from a [`BfvParametersSpec`]: validates the
/// spec, generates any requested ciphertext moduli, and derives every
/// precomputed field a running scheme needs.
pub type BfvParametersBuilder = BfvParametersSpecBuilder;

impl BfvParametersSpecBuilder {
	pub fn build(&self) -> Result<Rc<BfvParameters>> {
		let spec = self
			.fallible_build()
			.map_err(|e| Error::InvalidParameters(e.to_string()))?;
		BfvParameters::from_spec(spec)
	}
}

/// A complete, immutable set of BFV parameters.
///
/// Every key, plaintext and ciphertext built from a `BfvParameters` carries
/// its [`Fingerprint`]; operations across two parameter sets with different
/// fingerprints are rejected rather than silently operating on incompatible
/// rings.
#[derive(Debug)]
pub struct BfvParameters {
	polynomial_degree: usize,
	plaintext_modulus: u64,
	ciphertext_moduli: Vec<u64>,
	noise_std_dev: f64,
	noise_max_deviation: f64,

	ctx: Rc<Context>,
	plaintext: Modulus,
	plaintext_op: Option<NttOperator>,
	delta: Vec<u64>,
	q_mod_t: u64,
	decrypt_ctx: Rc<Context>,
	decrypt_scaler: Scaler,
	pub(crate) mul_params: MultiplicationParameters,
	matrix_reps_index_map: Vec<usize>,
	fingerprint: Fingerprint,
}

impl BfvParameters {
	/// Starts a [`BfvParametersBuilder`].
	pub fn builder() -> BfvParametersBuilder {
		BfvParametersBuilder::default()
	}

	fn from_spec(spec: BfvParametersSpec) -> Result<Rc<Self>> {
		let degree = spec.polynomial_degree;
		if !degree.is_power_of_two() || degree < 8 {
			return Err(Error::InvalidParameters(format!(
				"polynomial degree {degree} is not a power of two >= 8"
			)));
		}
		if spec.noise_std_dev <= 0.0 {
			return Err(Error::InvalidParameters("noise standard deviation must be positive".to_string()));
		}
		if spec.plaintext_modulus < 2 {
			return Err(Error::InvalidParameters("plaintext modulus must be >= 2".to_string()));
		}

		let have_moduli = !spec.ciphertext_moduli.is_empty();
		let have_sizes = !spec.ciphertext_moduli_sizes.is_empty();
		if have_moduli == have_sizes {
			return Err(Error::InvalidParameters(
				"specify exactly one of ciphertext_moduli or ciphertext_moduli_sizes".to_string(),
			));
		}

		let ciphertext_moduli = if have_moduli {
			spec.ciphertext_moduli
		} else {
			generate_moduli(&spec.ciphertext_moduli_sizes, degree)?
		};

		let ctx = Rc::new(Context::new(&ciphertext_moduli, degree)?);
		let plaintext = Modulus::new(spec.plaintext_modulus)?;
		let plaintext_op = NttOperator::new(&plaintext, degree);

		let q = ctx.rns().modulus().clone();
		let t_big = BigUint::from(spec.plaintext_modulus);
		let delta_big = &q / &t_big;
		let delta = ctx.rns().project(&delta_big);
		let q_mod_t = (&q % &t_big).to_u64_digits().first().copied().unwrap_or(0);

		let decrypt_ctx = Rc::new(Context::new(&ciphertext_moduli[..1], degree)?);
		let decrypt_scaler = Scaler::new(&ctx, &decrypt_ctx, ScalingFactor::new(t_big, q))?;

		let mul_params = MultiplicationParameters::new(&ctx, spec.plaintext_modulus, degree)?;

		let matrix_reps_index_map = build_matrix_reps_index_map(degree, plaintext_op.is_some());

		let fingerprint = fingerprint::compute(
			degree,
			&ciphertext_moduli,
			spec.plaintext_modulus,
			spec.noise_std_dev,
			spec.noise_max_deviation,
			0,
		);

		Ok(Rc::new(Self {
			polynomial_degree: degree,
			plaintext_modulus: spec.plaintext_modulus,
			ciphertext_moduli,
			noise_std_dev: spec.noise_std_dev,
			noise_max_deviation: spec.noise_max_deviation,
			ctx,
			plaintext,
			plaintext_op,
			delta,
			q_mod_t,
			decrypt_ctx,
			decrypt_scaler,
			mul_params,
			matrix_reps_index_map,
			fingerprint,
		}))
	}

	/// The ring degree `N`.
	pub fn degree(&self) -> usize {
		self.polynomial_degree
	}

	/// The plaintext modulus `t`.
	pub fn plaintext_modulus(&self) -> u64 {
		self.plaintext_modulus
	}

	/// The ciphertext RNS basis `{q_0, ..., q_{k-1}}`.
	pub fn ciphertext_moduli(&self) -> &[u64] {
		&self.ciphertext_moduli
	}

	pub fn noise_std_dev(&self) -> f64 {
		self.noise_std_dev
	}

	pub fn noise_max_deviation(&self) -> f64 {
		self.noise_max_deviation
	}

	/// The ring context every ciphertext and key polynomial is built over.
	pub fn ctx(&self) -> &Rc<Context> {
		&self.ctx
	}

	pub(crate) fn plaintext(&self) -> &Modulus {
		&self.plaintext
	}

	pub(crate) fn plaintext_op(&self) -> Option<&NttOperator> {
		self.plaintext_op.as_ref()
	}

	/// Whether this parameter set supports SIMD batching (`t ≡ 1 mod 2N`).
	pub fn supports_batching(&self) -> bool {
		self.plaintext_op.is_some()
	}

	pub(crate) fn delta(&self) -> &[u64] {
		&self.delta
	}

	pub(crate) fn q_mod_t(&self) -> u64 {
		self.q_mod_t
	}

	pub(crate) fn decrypt_ctx(&self) -> &Rc<Context> {
		&self.decrypt_ctx
	}

	pub(crate) fn decrypt_scaler(&self) -> &Scaler {
		&self.decrypt_scaler
	}

	pub(crate) fn matrix_reps_index_map(&self) -> &[usize] {
		&self.matrix_reps_index_map
	}

	/// The SHA-256 fingerprint identifying this exact parameter set.
	pub fn fingerprint(&self) -> Fingerprint {
		self.fingerprint
	}
}

impl PartialEq for BfvParameters {
	fn eq(&self, other: &Self) -> bool {
		self.fingerprint == other.fingerprint
	}
}
impl Eq for BfvParameters {}

fn generate_moduli(sizes: &[usize], degree: usize) -> Result<Vec<u64>> {
	let mut moduli = Vec::with_capacity(sizes.len());
	let mut upper_bound = 1u64 << 62;
	for &size in sizes {
		loop {
			let candidate = generate_prime(size, 2 * degree as u64, upper_bound)
				.ok_or_else(|| Error::InvalidParameters(format!("no {size}-bit NTT-friendly prime available")))?;
			upper_bound = candidate;
			if !moduli.contains(&candidate) {
				moduli.push(candidate);
				break;
			}
		}
	}
	Ok(moduli)
}

/// Builds the bit-reversed row/column permutation SIMD batching uses to map
/// a plaintext's `2 x (N/2)` matrix of slots onto polynomial coefficients,
/// following SEAL's `BatchEncoder` construction. Unused (and left empty)
/// when the parameter set has no plaintext NTT operator.
fn build_matrix_reps_index_map(degree: usize, supports_batching: bool) -> Vec<usize> {
	if !supports_batching {
		return Vec::new();
	}
	let row_size = degree / 2;
	let m = 2 * degree;
	let gen = 3u64;
	let mut pos = 1u64;
	let mut map = vec![0usize; degree];
	for i in 0..row_size {
		let index1 = (pos - 1) / 2;
		let index2 = (m - pos - 1) / 2;
		map[i] = bit_reverse(index1 as usize, degree.trailing_zeros());
		map[row_size + i] = bit_reverse(index2 as usize, degree.trailing_zeros());
		pos = (pos * gen) % m;
	}
	map
}

fn bit_reverse(value: usize, bits: u32) -> usize {
	let mut out = 0usize;
	let mut v = value;
	for _ in 0..bits {
		out = (out << 1) | (v & 1);
		v >>= 1;
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn default_params() -> Rc<BfvParameters> {
		BfvParameters::builder()
			.polynomial_degree(8usize)
			.plaintext_modulus(17u64)
			.ciphertext_moduli(vec![1153u64])
			.build()
			.unwrap()
	}

	#[test]
	fn builds_with_explicit_moduli() {
		let par = default_params();
		assert_eq!(par.degree(), 8);
		assert_eq!(par.ciphertext_moduli(), &[1153]);
	}

	#[test]
	fn rejects_non_power_of_two_degree() {
		let err = BfvParameters::builder()
			.polynomial_degree(6usize)
			.plaintext_modulus(17u64)
			.ciphertext_moduli(vec![1153u64])
			.build();
		assert!(err.is_err());
	}

	#[test]
	fn rejects_ambiguous_moduli_specification() {
		let err = BfvParameters::builder()
			.polynomial_degree(8usize)
			.plaintext_modulus(17u64)
			.build();
		assert!(err.is_err());

		let err = BfvParameters::builder()
			.polynomial_degree(8usize)
			.plaintext_modulus(17u64)
			.ciphertext_moduli(vec![1153u64])
			.ciphertext_moduli_sizes(vec![20usize])
			.build();
		assert!(err.is_err());
	}

	#[test]
	fn generates_moduli_from_sizes() {
		let par = BfvParameters::builder()
			.polynomial_degree(8usize)
			.plaintext_modulus(17u64)
			.ciphertext_moduli_sizes(vec![20usize, 20usize])
			.build()
			.unwrap();
		assert_eq!(par.ciphertext_moduli().len(), 2);
		for &q in par.ciphertext_moduli() {
			assert_eq!(q % 16, 1);
		}
	}

	#[test]
	fn delta_divides_q_by_t_with_small_remainder() {
		let par = default_params();
		let q = BigUint::from(1153u64);
		let t = BigUint::from(17u64);
		let expected = &q / &t;
		assert_eq!(par.delta()[0], expected.to_u64_digits().first().copied().unwrap_or(0));
	}

	#[test]
	fn fingerprint_is_deterministic() {
		let a = default_params();
		let b = default_params();
		assert_eq!(a.fingerprint(), b.fingerprint());
		assert_eq!(a, b);
	}
}
