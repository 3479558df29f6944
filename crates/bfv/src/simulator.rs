//! Noise simulator: predicts, without ever decrypting, whether a
//! computation on a chosen parameter set will still decrypt correctly.
//!
//! Grounded on `original_source/SEAL/seal/simulator.h`'s
//! `SimulationEvaluator`: a tagged computation graph is folded
//! post-order into a running noise estimate, scaled by `q` and tracked
//! as a [`BigUint`] rather than a fixed-width integer so the tool that
//! exists to catch overflow cannot itself silently overflow.

use crate::keys::MAX_DBC;
use crate::parameters::BfvParameters;
use num_bigint::BigUint;
use num_traits::Zero;
use std::rc::Rc;

/// A node in a computation graph the simulator can evaluate. Mirrors the
/// evaluator operations of [`crate::ops`] one-for-one; `Box` children make
/// this a tree rather than requiring a DAG-of-refs.
#[derive(Clone, Debug)]
pub enum SimulationNode {
	/// A fresh ciphertext encrypting a message bounded by `(n_m, a_m)`:
	/// `n_m` coefficients, each of magnitude at most `a_m`.
	Fresh { n_m: u64, a_m: u64 },
	Add(Box<SimulationNode>, Box<SimulationNode>),
	Sub(Box<SimulationNode>, Box<SimulationNode>),
	Negate(Box<SimulationNode>),
	AddPlain(Box<SimulationNode>, u64, u64),
	SubPlain(Box<SimulationNode>, u64, u64),
	Mul(Box<SimulationNode>, Box<SimulationNode>),
	MulPlain(Box<SimulationNode>, u64, u64),
	Relin(Box<SimulationNode>),
	Exp(Box<SimulationNode>, u32),
	MulMany(Vec<SimulationNode>),
	AddMany(Vec<SimulationNode>),
}

/// The result of folding a [`SimulationNode`] tree: the predicted noise
/// (scaled by `q`, so `0` is noiseless and growing towards `q` is fatal),
/// and the ciphertext size the graph leaves the result at.
#[derive(Clone, Debug)]
pub struct Simulation {
	noise: BigUint,
	size: usize,
	par: Rc<BfvParameters>,
}

impl Simulation {
	/// `max(0, bitlen(q) - bitlen(noise) - 1)`, the number of noise bits of
	/// headroom remaining before decryption fails.
	pub fn invariant_noise_budget(&self) -> usize {
		let q_bits = self.par.ctx().rns().modulus().bits() as usize;
		let noise_bits = self.noise.bits() as usize;
		q_bits.saturating_sub(noise_bits).saturating_sub(1)
	}

	/// Whether this simulation still decrypts correctly, with at least
	/// `budget_gap` bits of noise budget remaining.
	pub fn decrypts(&self, budget_gap: usize) -> bool {
		self.invariant_noise_budget() > budget_gap
	}

	pub fn size(&self) -> usize {
		self.size
	}

	pub fn noise(&self) -> &BigUint {
		&self.noise
	}
}

/// Evaluates `node` under `par`, returning the resulting [`Simulation`].
pub fn simulate(node: &SimulationNode, par: &Rc<BfvParameters>) -> Simulation {
	let n = par.degree() as u64;
	let t = par.plaintext_modulus();
	match node {
		SimulationNode::Fresh { n_m, a_m } => {
			let sigma = par.noise_max_deviation() * par.noise_std_dev();
			let gaussian_bound = (4.0 * sigma * (2.0 * std::f64::consts::PI).sqrt()).ceil() as u64;
			let noise = BigUint::from(n) * BigUint::from(t) * BigUint::from(gaussian_bound + n_m * a_m);
			Simulation { noise, size: 2, par: par.clone() }
		}
		SimulationNode::Add(a, b) => {
			let sa = simulate(a, par);
			let sb = simulate(b, par);
			Simulation { noise: sa.noise + sb.noise, size: sa.size.max(sb.size), par: par.clone() }
		}
		SimulationNode::Sub(a, b) => {
			let sa = simulate(a, par);
			let sb = simulate(b, par);
			Simulation { noise: sa.noise + sb.noise, size: sa.size.max(sb.size), par: par.clone() }
		}
		SimulationNode::Negate(a) => simulate(a, par),
		SimulationNode::AddPlain(a, n_m, a_m) | SimulationNode::SubPlain(a, n_m, a_m) => {
			let sa = simulate(a, par);
			let shift = BigUint::from(n) * BigUint::from(*n_m) * BigUint::from(*a_m);
			Simulation { noise: sa.noise + shift, size: sa.size, par: par.clone() }
		}
		SimulationNode::Mul(a, b) => {
			let sa = simulate(a, par);
			let sb = simulate(b, par);
			let tensor_noise = mul_noise(&sa.noise, &sb.noise, n, t) + relin_overhead(par, MAX_DBC);
			Simulation { noise: tensor_noise, size: 2, par: par.clone() }
		}
		SimulationNode::MulPlain(a, n_m, a_m) => {
			let sa = simulate(a, par);
			let factor = BigUint::from(n) * BigUint::from(*n_m) * BigUint::from(*a_m);
			Simulation { noise: sa.noise * factor, size: sa.size, par: par.clone() }
		}
		SimulationNode::Relin(a) => {
			let sa = simulate(a, par);
			Simulation { noise: sa.noise + relin_overhead(par, MAX_DBC), size: 2, par: par.clone() }
		}
		SimulationNode::Exp(a, e) => simulate_exponentiate(a, *e, par),
		SimulationNode::MulMany(nodes) => {
			let mut iter = nodes.iter();
			let first = iter.next().expect("multiply_many requires at least one operand");
			let mut acc = simulate(first, par);
			for node in iter {
				let s = simulate(node, par);
				let noise = mul_noise(&acc.noise, &s.noise, n, t) + relin_overhead(par, MAX_DBC);
				acc = Simulation { noise, size: 2, par: par.clone() };
			}
			acc
		}
		SimulationNode::AddMany(nodes) => {
			let mut noise = BigUint::zero();
			let mut size = 2usize;
			for node in nodes {
				let s = simulate(node, par);
				noise += s.noise;
				size = size.max(s.size);
			}
			Simulation { noise, size, par: par.clone() }
		}
	}
}

fn mul_noise(n1: &BigUint, n2: &BigUint, n: u64, t: u64) -> BigUint {
	let t_big = BigUint::from(t);
	let n_big = BigUint::from(n);
	&n_big * &t_big * (n1 + n2) + &n_big * &t_big * &t_big * n1 * n2
}

fn relin_overhead(par: &Rc<BfvParameters>, dbc: usize) -> BigUint {
	let q = par.ctx().rns().modulus().clone();
	let ell = (q.bits() as usize).div_ceil(dbc);
	let w = BigUint::from(1u64) << dbc;
	let n = BigUint::from(par.degree() as u64);
	let sigma = (par.noise_max_deviation() * par.noise_std_dev()).ceil() as u64;
	BigUint::from(ell as u64) * n * BigUint::from(sigma) * w
}

fn simulate_exponentiate(base: &SimulationNode, exponent: u32, par: &Rc<BfvParameters>) -> Simulation {
	if exponent == 0 {
		return simulate(&SimulationNode::Fresh { n_m: 1, a_m: 1 }, par);
	}
	let n = par.degree() as u64;
	let t = par.plaintext_modulus();
	let mut acc = simulate(base, par);
	let mut remaining = exponent - 1;
	while remaining > 0 {
		let noise = mul_noise(&acc.noise, &acc.noise, n, t) + relin_overhead(par, MAX_DBC);
		acc = Simulation { noise, size: 2, par: par.clone() };
		remaining -= 1;
	}
	acc
}

/// Walks `candidates` in order, returning the first parameter set whose
/// simulation of `node` still decrypts with `gap` bits of budget to
/// spare.
pub fn select_parameters(candidates: &[Rc<BfvParameters>], node: &SimulationNode, gap: usize) -> Option<Rc<BfvParameters>> {
	candidates.iter().find(|par| simulate(node, par).decrypts(gap)).cloned()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn params() -> Rc<BfvParameters> {
		BfvParameters::builder()
			.polynomial_degree(1024usize)
			.plaintext_modulus(64u64)
			.ciphertext_moduli_sizes(vec![40usize, 40usize])
			.build()
			.unwrap()
	}

	#[test]
	fn fresh_ciphertext_has_budget() {
		let par = params();
		let node = SimulationNode::Fresh { n_m: 1, a_m: 32 };
		let sim = simulate(&node, &par);
		assert!(sim.decrypts(0));
	}

	#[test]
	fn four_multiplications_predict_successful_decryption() {
		let par = params();
		let mut node = SimulationNode::Fresh { n_m: 1, a_m: 32 };
		for _ in 0..4 {
			node = SimulationNode::Mul(Box::new(node.clone()), Box::new(SimulationNode::Fresh { n_m: 1, a_m: 32 }));
		}
		let sim = simulate(&node, &par);
		assert!(sim.decrypts(0));
	}

	#[test]
	fn select_parameters_returns_the_smallest_that_fits() {
		let small = BfvParameters::builder()
			.polynomial_degree(8usize)
			.plaintext_modulus(17u64)
			.ciphertext_moduli(vec![1153u64])
			.build()
			.unwrap();
		let large = params();
		let node = SimulationNode::Fresh { n_m: 1, a_m: 4 };
		let chosen = select_parameters(&[small.clone(), large.clone()], &node, 0);
		assert!(chosen.is_some());
	}
}
