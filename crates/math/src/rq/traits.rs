//! Fallible conversions into [`super::Poly`].

use super::{Context, Poly, Representation};
use crate::errors::Result;
use std::rc::Rc;

/// Fallible conversion from an external coefficient representation (signed
/// `i64`s, big integers, or raw RNS residues) into a [`Poly`] over a given
/// [`Context`] and [`Representation`].
pub trait TryConvertFrom<T>
where
	Self: Sized,
{
	fn try_convert_from(value: T, ctx: &Rc<Context>, variable_time: bool, representation: Representation) -> Result<Self>;
}
