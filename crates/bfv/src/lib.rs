//! The BFV fully-homomorphic encryption scheme over RNS polynomial rings.
//!
//! Layers, bottom to top: [`parameters`] (the ring, RNS basis and noise
//! distribution), [`plaintext`]/[`ciphertext`] (the data types), [`secret_key`]/
//! [`public_key`]/[`keys`] (key generation and key-switching), [`ops`] (the
//! homomorphic evaluator), and [`simulator`] (noise budget prediction).

pub mod ciphertext;
pub mod error;
mod fingerprint;
pub mod keys;
pub mod ops;
pub mod parameters;
pub mod plaintext;
pub mod pool;
pub mod public_key;
pub mod secret_key;
mod serialization;
pub mod simulator;
pub mod traits;

pub use ciphertext::Ciphertext;
pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use keys::{EvaluationKey, EvaluationKeyBuilder, GaloisElement, GaloisKey, GaloisKeyBuilder};
pub use ops::Evaluator;
pub use parameters::{BfvParameters, BfvParametersBuilder};
pub use plaintext::{Encoding, Plaintext};
pub use pool::MemoryPool;
pub use public_key::PublicKey;
pub use secret_key::SecretKey;
pub use traits::{Decryptor, Encryptor};
