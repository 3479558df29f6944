//! Galois (rotation) keys: one key-switching key per automorphism the
//! evaluator is asked to support, letting `rotate_rows`/`rotate_columns`
//! apply `X -> X^k` to a ciphertext and switch the result back under the
//! original secret.

use crate::error::Result;
use crate::keys::key_switching::{KeySwitchingKey, MAX_DBC};
use crate::keys::GaloisElement;
use crate::secret_key::SecretKey;
use fhe_math::rq::{Poly, Representation};
use std::rc::Rc;

/// A key-switching key specialized to a single Galois automorphism.
#[derive(Debug)]
pub struct GaloisKey {
	element: GaloisElement,
	ksk: KeySwitchingKey,
}

impl GaloisKey {
	pub fn element(&self) -> GaloisElement {
		self.element
	}

	/// Applies this key's automorphism to `ct`'s terms, then key-switches
	/// the permuted `c1` term back under the original secret. `c0`/`c1` are
	/// mutated in place and left in [`Representation::Ntt`].
	pub(crate) fn relinearize(&self, c0: &mut Poly, c1: &mut Poly) -> Result<()> {
		let mut c0_pb = c0.clone();
		c0_pb.change_representation(Representation::PowerBasis);
		let mut c1_pb = c1.clone();
		c1_pb.change_representation(Representation::PowerBasis);

		let mut c0_sub = c0_pb.substitute(self.element)?;
		let c1_sub = c1_pb.substitute(self.element)?;

		let (delta0, delta1) = self.ksk.key_switch(&c1_sub)?;
		let mut delta0 = delta0;
		let mut delta1 = delta1;
		delta0.change_representation(Representation::Ntt);
		delta1.change_representation(Representation::Ntt);
		c0_sub.change_representation(Representation::Ntt);
		c0_sub += &delta0;

		*c0 = c0_sub;
		*c1 = delta1;
		Ok(())
	}
}

/// Builds a [`GaloisKey`] for a single automorphism.
pub struct GaloisKeyBuilder<'a> {
	sk: &'a SecretKey,
	element: GaloisElement,
	dbc: usize,
}

impl<'a> GaloisKeyBuilder<'a> {
	pub fn new(sk: &'a SecretKey, element: GaloisElement) -> Self {
		Self { sk, element, dbc: MAX_DBC }
	}

	pub fn decomposition_bit_count(mut self, dbc: usize) -> Self {
		self.dbc = dbc;
		self
	}

	pub fn build(self) -> Result<GaloisKey> {
		let mut s_sub = self.sk.secret_poly().clone();
		s_sub.change_representation(Representation::PowerBasis);
		let s_sub = s_sub.substitute(self.element)?;
		let ksk = self.sk.key_switching_new(&s_sub, self.dbc)?;
		Ok(GaloisKey { element: self.element, ksk })
	}
}
