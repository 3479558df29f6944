//! Modular arithmetic, NTT and RNS polynomial rings backing the BFV scheme.
//!
//! Three layers, bottom to top:
//! - [`zq`]: single-word modular arithmetic and the negacyclic NTT.
//! - [`rns`]: CRT reconstruction over a fixed set of coprime moduli.
//! - [`rq`]: RNS-represented ring polynomials built on top of both, with
//!   base conversion and scale-and-round for BFV multiplication.

pub mod errors;
pub mod rns;
pub mod rq;
pub mod zq;

pub use errors::{Error, Result};
