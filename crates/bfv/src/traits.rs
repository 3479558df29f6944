//! Capability traits implemented by the scheme's key types.

use crate::ciphertext::Ciphertext;
use crate::error::Result;
use crate::plaintext::Plaintext;

/// Encrypts a plaintext into a fresh, size-2 ciphertext.
pub trait Encryptor {
	fn encrypt(&self, pt: &Plaintext) -> Result<Ciphertext>;
}

/// Recovers the plaintext a ciphertext encrypts.
pub trait Decryptor {
	fn decrypt(&self, ct: &Ciphertext) -> Result<Plaintext>;
}
